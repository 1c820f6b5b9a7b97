// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Show status of the relay daemon.

use anyhow::Result;
use rankrelay::config::RelayConfig;
use serde::Serialize;
use tokio::net::UnixStream;

use super::start::check_already_running;

#[derive(Debug, Serialize)]
struct RelayStatus {
    running: bool,
    pid: Option<i32>,
    socket: String,
    accepting: bool,
    sink_url: String,
}

/// Report PID liveness and whether the socket accepts connections.
pub async fn run(config: &RelayConfig, json: bool) -> Result<()> {
    let pid = check_already_running(&config.pid_path);
    let accepting = UnixStream::connect(&config.socket_path).await.is_ok();

    let status = RelayStatus {
        running: pid.is_some(),
        pid,
        socket: config.socket_path.display().to_string(),
        accepting,
        sink_url: config.sink_url.clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match status.pid {
        Some(pid) => println!("Relay running (PID {pid})"),
        None => println!("Relay not running"),
    }
    println!(
        "  Socket: {} ({})",
        status.socket,
        if status.accepting { "accepting" } else { "not accepting" }
    );
    println!("  Sink:   {}", status.sink_url);
    Ok(())
}
