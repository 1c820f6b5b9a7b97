// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rankrelay: panel actions over the core pipeline, and the relay that
//! forwards cached rows to the local HTTP sink.

pub mod actions;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;

pub use actions::{ActionReport, RankActions, SyncOutcome};
pub use client::{InProcessChannel, RelayChannel, SocketChannel};
pub use config::{ConfigOverrides, RelayConfig};
pub use error::{ChannelError, RelayError};
pub use protocol::{Destination, Endpoint, RelayRequest, RelayResult};
pub use relay::{HttpSink, Relay, RelayServer};
