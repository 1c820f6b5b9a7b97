// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Stop the running relay daemon.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rankrelay::config::RelayConfig;

use super::start::process_alive;

/// Send SIGTERM to the PID in the PID file and wait for it to exit.
pub async fn run(config: &RelayConfig) -> Result<()> {
    let pid_path = &config.pid_path;

    if !pid_path.exists() {
        bail!("relay is not running (no PID file at {})", pid_path.display());
    }

    let pid_str = std::fs::read_to_string(pid_path).context("failed to read PID file")?;
    let pid: i32 = pid_str.trim().parse().context("invalid PID in PID file")?;

    println!("Stopping relay (PID {pid})...");

    #[cfg(unix)]
    {
        let output = std::process::Command::new("kill")
            .arg(pid.to_string())
            .output()
            .context("failed to send SIGTERM")?;
        if !output.status.success() {
            let _ = std::fs::remove_file(pid_path);
            bail!("failed to send SIGTERM to PID {pid} (process may have already exited)");
        }
    }

    // Up to 5 seconds
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if !process_alive(pid) {
            let _ = std::fs::remove_file(pid_path);
            let _ = std::fs::remove_file(&config.socket_path);
            println!("Relay stopped.");
            return Ok(());
        }
    }

    let _ = std::fs::remove_file(pid_path);
    println!("Warning: relay may still be running. PID file removed.");
    Ok(())
}
