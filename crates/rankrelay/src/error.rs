// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the relay daemon and its clients.

use std::time::Duration;

use rankrelay_core::CoreError;

/// Errors raised while configuring or running the relay.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("Invalid sink URL {url}: {source}")]
    InvalidSinkUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport failures between a client and the relay.
///
/// These never carry an answer from the sink; an answer, even a failed one,
/// arrives as a [`crate::protocol::RelayResult`].
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("cannot connect to relay at {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay did not answer within {0:?}")]
    Timeout(Duration),

    #[error("relay closed the channel without answering")]
    Closed,

    #[error("relay sent a malformed answer: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
