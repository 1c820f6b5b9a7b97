// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Unix domain socket server for the relay protocol.
//!
//! Each connection may carry any number of request lines; every line gets
//! exactly one answer line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::Relay;
use crate::protocol::RelayResult;

/// Idle connections are dropped after this long.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum request line size (16 MB).
const MAX_REQUEST_SIZE: usize = 16 * 1024 * 1024;

/// The relay socket server.
pub struct RelayServer {
    socket_path: PathBuf,
    relay: Arc<Relay>,
    shutdown: Arc<Notify>,
}

impl RelayServer {
    pub fn new(socket_path: &Path, relay: Relay) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
            relay: Arc::new(relay),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notifier that stops [`RelayServer::start`] when triggered.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket and serve until shutdown is signalled.
    pub async fn start(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("failed to remove stale socket file")?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).context("failed to bind Unix socket")?;

        info!(
            "relay listening on {} (sink {})",
            self.socket_path.display(),
            self.relay.sink().base()
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let relay = Arc::clone(&self.relay);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, relay).await {
                                    warn!("connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("accept error: {e}");
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        info!("relay stopped");
        Ok(())
    }
}

async fn handle_connection(stream: UnixStream, relay: Arc<Relay>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();

        let read = tokio::time::timeout(INACTIVITY_TIMEOUT, reader.read_line(&mut line)).await;

        let answer = match read {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {
                if line.len() > MAX_REQUEST_SIZE {
                    RelayResult::failure(format!(
                        "message exceeds maximum size of {}MB",
                        MAX_REQUEST_SIZE / (1024 * 1024)
                    ))
                } else if line.trim().is_empty() {
                    continue;
                } else {
                    relay.handle_line(&line).await
                }
            }
            Ok(Err(e)) => {
                warn!("read error: {e}");
                break;
            }
            Err(_) => {
                debug!("closing inactive connection");
                break;
            }
        };

        if writer.write_all(answer.to_line().as_bytes()).await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }

    Ok(())
}
