// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP sink: one POST per relay request, outcome folded into a [`RelayResult`].

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::RelayError;
use crate::protocol::{RelayResult, PARAMETER_ERROR, SINK_UNREACHABLE};

/// Default base address of the local sink.
pub const DEFAULT_SINK_URL: &str = "http://127.0.0.1:8000/";

/// Client for the local HTTP sink.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base: Url,
}

impl HttpSink {
    /// Build a sink client. Without `timeout` a hung sink blocks the request
    /// until the caller gives up.
    pub fn new(base: &str, timeout: Option<Duration>) -> Result<Self, RelayError> {
        let mut base = Url::parse(base).map_err(|source| RelayError::InvalidSinkUrl {
            url: base.to_string(),
            source,
        })?;
        // `join` replaces the last segment unless the base ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("rankrelay/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST `{rows}` to `endpoint` below the base address.
    ///
    /// Never fails: transport errors, bad statuses and unreadable bodies are
    /// all reported as `ok: false` results. A 2xx JSON object is returned as
    /// the sink wrote it.
    pub async fn post(&self, endpoint: &str, rows: Vec<Value>) -> RelayResult {
        let url = match self.base.join(endpoint.trim_start_matches('/')) {
            Ok(url) => url,
            Err(e) => {
                warn!("cannot build sink URL for {endpoint}: {e}");
                return RelayResult::failure(PARAMETER_ERROR);
            }
        };

        let count = rows.len();
        debug!(%url, rows = count, "posting to sink");

        let response = match self
            .client
            .post(url.clone())
            .json(&json!({ "rows": rows }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, "sink unreachable: {e}");
                return RelayResult::failure(SINK_UNREACHABLE);
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => parse_object(&bytes),
            Err(e) => {
                warn!(%url, "failed to read sink body: {e}");
                None
            }
        };

        let generic = || {
            RelayResult::failure(format!("local service returned HTTP {}", status.as_u16()))
        };

        match body {
            Some(body) if status.is_success() => RelayResult::from_body(body),
            Some(body) => match body.get("error").and_then(Value::as_str) {
                Some(message) if !message.is_empty() => RelayResult::failure(message),
                _ => generic(),
            },
            None => generic(),
        }
    }
}

fn parse_object(bytes: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
