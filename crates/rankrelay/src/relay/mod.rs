// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! The privileged relay: validates requests and forwards them to the sink.

pub mod server;
pub mod sink;

pub use server::RelayServer;
pub use sink::{HttpSink, DEFAULT_SINK_URL};

use tracing::{info, warn};

use crate::protocol::{decode_request, validate_request, RelayRequest, RelayResult};

/// Request handler shared by the socket server and in-process channels.
#[derive(Debug, Clone)]
pub struct Relay {
    sink: HttpSink,
}

impl Relay {
    pub fn new(sink: HttpSink) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &HttpSink {
        &self.sink
    }

    /// Answer one raw request line.
    pub async fn handle_line(&self, line: &str) -> RelayResult {
        match decode_request(line) {
            Ok(request) => self.dispatch(request).await,
            Err(answer) => {
                warn!("rejected request: {}", answer.error().unwrap_or(""));
                answer
            }
        }
    }

    /// Answer one decoded request.
    pub async fn handle(&self, request: RelayRequest) -> RelayResult {
        if let Err(answer) = validate_request(&request) {
            warn!("rejected request: {}", answer.error().unwrap_or(""));
            return answer;
        }
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: RelayRequest) -> RelayResult {
        let id = request.id.unwrap_or_else(|| "-".to_string());
        let rows = request.rows.len();
        info!(id = %id, endpoint = %request.endpoint, rows, "relaying");

        let result = self.sink.post(&request.endpoint, request.rows).await;

        if result.is_success() {
            info!(id = %id, "relay succeeded");
        } else {
            warn!(
                id = %id,
                error = result.error().unwrap_or(""),
                "relay failed"
            );
        }
        result
    }
}
