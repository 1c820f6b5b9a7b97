// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Relay client channels.
//!
//! A channel sends one [`RelayRequest`] and waits for its [`RelayResult`].
//! Every call carries a timeout; a relay that never answers surfaces as
//! [`ChannelError::Timeout`] instead of a hung action.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ChannelError;
use crate::protocol::{RelayRequest, RelayResult};
use crate::relay::Relay;

/// Request/response channel to a relay.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    /// Send `request` and wait at most `timeout` for the answer.
    async fn send(
        &self,
        request: RelayRequest,
        timeout: Duration,
    ) -> Result<RelayResult, ChannelError>;
}

/// Channel to a relay daemon over its Unix socket.
#[derive(Debug, Clone)]
pub struct SocketChannel {
    socket_path: PathBuf,
}

impl SocketChannel {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn round_trip(&self, request: &RelayRequest) -> Result<RelayResult, ChannelError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ChannelError::Connect {
                path: self.socket_path.display().to_string(),
                source,
            })?;
        let (reader, mut writer) = stream.into_split();

        let line = request
            .to_line()
            .map_err(|e| ChannelError::Malformed(e.to_string()))?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        let mut answer = String::new();
        let read = BufReader::new(reader).read_line(&mut answer).await?;
        if read == 0 {
            return Err(ChannelError::Closed);
        }
        RelayResult::from_line(&answer)
    }
}

#[async_trait]
impl RelayChannel for SocketChannel {
    async fn send(
        &self,
        request: RelayRequest,
        timeout: Duration,
    ) -> Result<RelayResult, ChannelError> {
        debug!(
            socket = %self.socket_path.display(),
            endpoint = %request.endpoint,
            rows = request.rows.len(),
            "sending relay request"
        );
        tokio::time::timeout(timeout, self.round_trip(&request))
            .await
            .map_err(|_| ChannelError::Timeout(timeout))?
    }
}

type Envelope = (RelayRequest, oneshot::Sender<RelayResult>);

/// Channel to a relay running as a task in this process.
#[derive(Debug, Clone)]
pub struct InProcessChannel {
    tx: mpsc::Sender<Envelope>,
}

impl InProcessChannel {
    /// Spawn a relay task and return a channel to it.
    ///
    /// The task ends once every clone of the channel is dropped.
    pub fn spawn(relay: Relay) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(32);
        let relay = Arc::new(relay);

        let handle = tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    let result = relay.handle(request).await;
                    // The caller may have timed out and gone away.
                    let _ = reply.send(result);
                });
            }
        });

        (Self { tx }, handle)
    }
}

#[async_trait]
impl RelayChannel for InProcessChannel {
    async fn send(
        &self,
        request: RelayRequest,
        timeout: Duration,
    ) -> Result<RelayResult, ChannelError> {
        let exchange = async {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.tx
                .send((request, reply_tx))
                .await
                .map_err(|_| ChannelError::Closed)?;
            reply_rx.await.map_err(|_| ChannelError::Closed)
        };
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ChannelError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PARAMETER_ERROR;
    use crate::relay::HttpSink;

    fn relay() -> Relay {
        Relay::new(HttpSink::new("http://127.0.0.1:1/", None).unwrap())
    }

    #[tokio::test]
    async fn test_socket_channel_connect_failure() {
        let dir = tempfile::tempdir().unwrap();
        let channel = SocketChannel::new(dir.path().join("missing.sock"));
        let request = RelayRequest::upload(
            crate::protocol::Endpoint::ALL[0],
            vec![serde_json::json!({})],
        );
        let err = channel
            .send(request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_in_process_channel_validates() {
        let (channel, _task) = InProcessChannel::spawn(relay());
        let mut request = RelayRequest::upload(crate::protocol::Endpoint::ALL[0], vec![]);
        request.endpoint = String::new();
        let result = channel
            .send(request, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result, RelayResult::failure(PARAMETER_ERROR));
    }

    #[tokio::test]
    async fn test_socket_channel_times_out_on_silent_peer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let _peer = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let channel = SocketChannel::new(&path);
        let request = RelayRequest::upload(crate::protocol::Endpoint::ALL[1], vec![]);
        let err = channel
            .send(request, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Timeout(_)));
    }
}
