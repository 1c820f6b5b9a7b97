// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Start the relay daemon.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rankrelay::config::RelayConfig;
use rankrelay::relay::{HttpSink, Relay, RelayServer};
use tracing::info;

/// PID recorded in `pid_path`, if that process is still alive.
pub fn check_already_running(pid_path: &Path) -> Option<i32> {
    let pid_str = std::fs::read_to_string(pid_path).ok()?;
    let pid: i32 = pid_str.trim().parse().ok()?;

    if process_alive(pid) {
        return Some(pid);
    }

    // Stale PID file
    let _ = std::fs::remove_file(pid_path);
    None
}

pub fn process_alive(pid: i32) -> bool {
    #[cfg(unix)]
    {
        let output = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output();
        matches!(output, Ok(o) if o.status.success())
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Bind the socket, write the PID file and serve until interrupted.
pub async fn run(config: &RelayConfig) -> Result<()> {
    if let Some(pid) = check_already_running(&config.pid_path) {
        bail!(
            "relay is already running (PID {pid}), use 'rankrelay relay stop' first"
        );
    }

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;

    let sink = HttpSink::new(&config.sink_url, None).context("failed to set up the sink client")?;
    let server = RelayServer::new(&config.socket_path, Relay::new(sink));

    std::fs::write(&config.pid_path, std::process::id().to_string())
        .context("failed to write PID file")?;

    info!("starting rankrelay relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "Relay started (PID {}), listening on {}",
        std::process::id(),
        config.socket_path.display()
    );

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("received shutdown signal");
        shutdown.notify_one();
    });

    let result = server.start().await;

    let _ = std::fs::remove_file(&config.pid_path);
    let _ = std::fs::remove_file(&config.socket_path);
    eprintln!("Relay stopped.");

    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
