// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Relay wire protocol.
//!
//! Messages are newline-delimited JSON. A client writes one request line and
//! reads one answer line, which is always a [`RelayResult`].

use std::fmt;
use std::str::FromStr;

use rankrelay_core::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChannelError, RelayError};

/// The only message type the relay handles.
pub const MESSAGE_TYPE: &str = "xhs-upload";

pub const PARAMETER_ERROR: &str = "parameter error";
pub const MALFORMED_MESSAGE: &str = "malformed message";
pub const SINK_UNREACHABLE: &str = "cannot reach local service, confirm it is running";

/// Where a synchronization lands on the sink side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Forward to the remote aggregation table.
    Upload,
    /// Persist in the sink's local database only.
    DbOnly,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Upload => "upload",
            Destination::DbOnly => "db_only",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" | "remote" => Ok(Destination::Upload),
            "db_only" | "db-only" | "db" | "local" => Ok(Destination::DbOnly),
            other => Err(RelayError::Config(format!("unknown destination: {other}"))),
        }
    }
}

/// One of the four sink paths, two per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub category: Category,
    pub destination: Destination,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::new(Category::Note, Destination::Upload),
        Endpoint::new(Category::Account, Destination::Upload),
        Endpoint::new(Category::Note, Destination::DbOnly),
        Endpoint::new(Category::Account, Destination::DbOnly),
    ];

    pub const fn new(category: Category, destination: Destination) -> Self {
        Self {
            category,
            destination,
        }
    }

    /// Path below the sink base URL.
    pub fn path(&self) -> &'static str {
        match (self.destination, self.category) {
            (Destination::Upload, Category::Note) => "upload_note_rank",
            (Destination::Upload, Category::Account) => "upload_account_rank",
            (Destination::DbOnly, Category::Note) => "db_only_note_rank",
            (Destination::DbOnly, Category::Account) => "db_only_account_rank",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');
        Self::ALL.into_iter().find(|e| e.path() == path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A request line sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    pub rows: Vec<Value>,
    /// Correlation id, only used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RelayRequest {
    /// Upload request for `endpoint` with a fresh correlation id.
    pub fn upload(endpoint: Endpoint, rows: Vec<Value>) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            endpoint: endpoint.path().to_string(),
            rows,
            id: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Encode as one newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Outcome of a relay attempt: the sink's JSON object, kept as it arrived.
///
/// Only `ok: true` counts as success. The relay's own failures use the same
/// shape, `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayResult(Map<String, Value>);

impl RelayResult {
    pub fn failure(message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("ok".to_string(), Value::Bool(false));
        body.insert("error".to_string(), Value::String(message.into()));
        Self(body)
    }

    /// Wrap a sink body without reinterpreting any field.
    pub fn from_body(body: Map<String, Value>) -> Self {
        Self(body)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.0.get("ok"), Some(Value::Bool(true)))
    }

    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    /// Rows the remote table accepted, as the sink wrote the count.
    pub fn uploaded(&self) -> Option<&Value> {
        self.field("uploaded")
    }

    /// Rows the local database inserted, as the sink wrote the count.
    pub fn inserted(&self) -> Option<&Value> {
        self.field("inserted")
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.0
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Encode as one newline-terminated line.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self)
            .unwrap_or_else(|_| format!(r#"{{"ok":false,"error":"{MALFORMED_MESSAGE}"}}"#));
        line.push('\n');
        line
    }

    /// Decode an answer line read by a client.
    pub fn from_line(line: &str) -> Result<Self, ChannelError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(ChannelError::Closed);
        }
        serde_json::from_str(trimmed).map_err(|e| ChannelError::Malformed(e.to_string()))
    }
}

fn unsupported(kind: &str) -> RelayResult {
    RelayResult::failure(format!("unsupported message type: {kind}"))
}

/// Endpoint paths are plain relative segments; anything that could steer the
/// request to another host is refused.
fn valid_endpoint(endpoint: &str) -> bool {
    let trimmed = endpoint.trim();
    !trimmed.is_empty()
        && !trimmed.starts_with("//")
        && !trimmed.split('/').any(|seg| seg == "..")
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/' | '.'))
}

/// Check a request that did not come through [`decode_request`].
pub fn validate_request(request: &RelayRequest) -> Result<(), RelayResult> {
    if request.kind != MESSAGE_TYPE {
        return Err(unsupported(&request.kind));
    }
    if !valid_endpoint(&request.endpoint) {
        return Err(RelayResult::failure(PARAMETER_ERROR));
    }
    Ok(())
}

/// Parse and validate a request line.
///
/// The error side is the answer to send back without touching the network.
pub fn decode_request(line: &str) -> Result<RelayRequest, RelayResult> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|_| RelayResult::failure(MALFORMED_MESSAGE))?;
    let Value::Object(mut map) = value else {
        return Err(RelayResult::failure(MALFORMED_MESSAGE));
    };

    match map.get("type") {
        Some(Value::String(kind)) if kind == MESSAGE_TYPE => {}
        Some(Value::String(kind)) => return Err(unsupported(kind)),
        _ => return Err(RelayResult::failure(MALFORMED_MESSAGE)),
    }

    let id = map.get("id").and_then(Value::as_str).map(str::to_string);

    let endpoint = match map.get("endpoint") {
        Some(Value::String(endpoint)) if valid_endpoint(endpoint) => endpoint.trim().to_string(),
        _ => return Err(RelayResult::failure(PARAMETER_ERROR)),
    };

    let rows = match map.remove("rows") {
        Some(Value::Array(rows)) => rows,
        _ => return Err(RelayResult::failure(PARAMETER_ERROR)),
    };

    Ok(RelayRequest {
        kind: MESSAGE_TYPE.to_string(),
        endpoint,
        rows,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_paths() {
        let paths: Vec<&str> = Endpoint::ALL.iter().map(Endpoint::path).collect();
        assert_eq!(
            paths,
            [
                "upload_note_rank",
                "upload_account_rank",
                "db_only_note_rank",
                "db_only_account_rank"
            ]
        );
        assert_eq!(
            Endpoint::from_path("/db_only_account_rank"),
            Some(Endpoint::new(Category::Account, Destination::DbOnly))
        );
        assert_eq!(Endpoint::from_path("upload"), None);
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!("upload".parse::<Destination>().unwrap(), Destination::Upload);
        assert_eq!("db-only".parse::<Destination>().unwrap(), Destination::DbOnly);
        assert!("ftp".parse::<Destination>().is_err());
    }

    #[test]
    fn test_request_line_shape() {
        let req = RelayRequest::upload(
            Endpoint::new(Category::Note, Destination::Upload),
            vec![json!({"title": "t"})],
        );
        let line = req.to_line().unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "xhs-upload");
        assert_eq!(value["endpoint"], "upload_note_rank");
        assert_eq!(value["rows"][0]["title"], "t");
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_decode_valid_request() {
        let req = decode_request(
            r#"{"type":"xhs-upload","endpoint":"db_only_note_rank","rows":[{"a":1}],"id":"r1"}"#,
        )
        .unwrap();
        assert_eq!(req.endpoint, "db_only_note_rank");
        assert_eq!(req.rows.len(), 1);
        assert_eq!(req.id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_decode_parameter_errors() {
        for line in [
            r#"{"type":"xhs-upload","rows":[]}"#,
            r#"{"type":"xhs-upload","endpoint":"","rows":[]}"#,
            r#"{"type":"xhs-upload","endpoint":7,"rows":[]}"#,
            r#"{"type":"xhs-upload","endpoint":"upload_note_rank"}"#,
            r#"{"type":"xhs-upload","endpoint":"upload_note_rank","rows":{"a":1}}"#,
            r#"{"type":"xhs-upload","endpoint":"//evil.example/x","rows":[]}"#,
            r#"{"type":"xhs-upload","endpoint":"http://evil.example/","rows":[]}"#,
            r#"{"type":"xhs-upload","endpoint":"../admin","rows":[]}"#,
        ] {
            let err = decode_request(line).unwrap_err();
            assert_eq!(err, RelayResult::failure(PARAMETER_ERROR), "line: {line}");
        }
    }

    #[test]
    fn test_decode_unsupported_and_malformed() {
        assert_eq!(
            decode_request(r#"{"type":"ping"}"#).unwrap_err().error(),
            Some("unsupported message type: ping")
        );
        for line in ["not json", "[1,2]", r#"{"endpoint":"x","rows":[]}"#] {
            assert_eq!(
                decode_request(line).unwrap_err().error(),
                Some(MALFORMED_MESSAGE)
            );
        }
    }

    #[test]
    fn test_result_keeps_body_verbatim() {
        let body = json!({"ok": true, "uploaded": 7.0, "table": "rank", "skipped": [1]});
        let Value::Object(map) = body.clone() else {
            unreachable!()
        };
        let result = RelayResult::from_body(map);
        assert!(result.is_success());
        assert_eq!(result.uploaded(), Some(&json!(7.0)));
        assert_eq!(result.inserted(), None);
        assert_eq!(serde_json::to_value(&result).unwrap(), body);
    }

    #[test]
    fn test_only_ok_true_is_success() {
        for body in [json!({"ok": 1}), json!({"ok": "true"}), json!({"uploaded": 3}), json!({})] {
            let Value::Object(map) = body else {
                unreachable!()
            };
            assert!(!RelayResult::from_body(map).is_success());
        }
        assert!(!RelayResult::failure("x").is_success());
        assert_eq!(RelayResult::failure("x").error(), Some("x"));
    }

    #[test]
    fn test_result_line_round_trip_and_failures() {
        let line = RelayResult::failure("boom").to_line();
        assert_eq!(line, "{\"error\":\"boom\",\"ok\":false}\n");
        assert_eq!(
            RelayResult::from_line(&line).unwrap(),
            RelayResult::failure("boom")
        );
        assert!(matches!(
            RelayResult::from_line(""),
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            RelayResult::from_line("{oops"),
            Err(ChannelError::Malformed(_))
        ));
        assert!(matches!(
            RelayResult::from_line("[1]"),
            Err(ChannelError::Malformed(_))
        ));
    }
}
