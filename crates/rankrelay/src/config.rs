// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration loading and resolution.
//!
//! Every setting resolves CLI flag first, then environment variable, then a
//! default below `~/.rankrelay/`.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RelayError;
use crate::relay::DEFAULT_SINK_URL;

pub const ENV_DATA_DIR: &str = "RANKRELAY_DATA_DIR";
pub const ENV_SOCKET: &str = "RANKRELAY_SOCKET";
pub const ENV_SINK_URL: &str = "RANKRELAY_SINK_URL";
pub const ENV_TIMEOUT_SECS: &str = "RANKRELAY_TIMEOUT_SECS";

/// Client wait for a relay answer when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub socket: Option<PathBuf>,
    pub sink_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Root of all local state.
    pub data_dir: PathBuf,
    /// Accumulation store directory.
    pub store_dir: PathBuf,
    pub socket_path: PathBuf,
    pub pid_path: PathBuf,
    pub sink_url: String,
    /// How long a client waits for the relay.
    pub timeout: Duration,
}

impl RelayConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, RelayError> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RelayError> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| env(ENV_DATA_DIR).map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        let socket_path = overrides
            .socket
            .clone()
            .or_else(|| env(ENV_SOCKET).map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join("relay.sock"));

        let sink_url = overrides
            .sink_url
            .clone()
            .or_else(|| env(ENV_SINK_URL))
            .unwrap_or_else(|| DEFAULT_SINK_URL.to_string());

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match env(ENV_TIMEOUT_SECS) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    RelayError::Config(format!("{ENV_TIMEOUT_SECS} is not a number: {raw}"))
                })?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };
        if timeout_secs == 0 {
            return Err(RelayError::Config("timeout must be at least 1 second".into()));
        }

        Ok(Self {
            store_dir: data_dir.join("store"),
            pid_path: data_dir.join("relay.pid"),
            socket_path,
            sink_url,
            timeout: Duration::from_secs(timeout_secs),
            data_dir,
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".rankrelay")
}
