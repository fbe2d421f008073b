//! TCP Bridge Transport
//!
//! Connects to a gateway bridge speaking newline-delimited JSON (see
//! [`JsonLinesCodec`]). After connecting it sends a `hello` line carrying the
//! client id; the bridge answers with the session handshake events.
//!
//! A reader task decodes inbound lines onto the event channel. The channel
//! closes when the socket hits EOF or an I/O error, which the connection
//! manager treats as session loss. Undecodable lines are logged and skipped.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;

use super::codec::JsonLinesCodec;
use crate::application::ports::{TransportError, VenueEvent, VenueRequest, VenueTransport};
use crate::domain::session::Endpoint;

/// Longest accepted inbound line.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Bridge transport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Event channel capacity.
    pub channel_capacity: usize,
    /// Time allowed for the TCP connect itself.
    pub socket_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 4096,
            socket_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct Reader {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Venue transport over a TCP bridge.
#[derive(Debug)]
pub struct TcpBridgeTransport {
    config: BridgeConfig,
    codec: JsonLinesCodec,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<Reader>>,
}

impl Default for TcpBridgeTransport {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl TcpBridgeTransport {
    /// Create a transport.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            codec: JsonLinesCodec::new(),
            writer: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    fn stop_reader(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.cancel.cancel();
            reader.task.abort();
        }
    }
}

async fn read_events(
    read_half: OwnedReadHalf,
    codec: JsonLinesCodec,
    tx: mpsc::Sender<VenueEvent>,
    cancel: CancellationToken,
) {
    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return,
            line = lines.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match codec.decode(&line) {
                    Ok(events) => {
                        for event in events {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping undecodable bridge line"),
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Bridge read failed");
                return;
            }
            None => {
                tracing::info!("Bridge closed the socket");
                return;
            }
        }
    }
}

#[async_trait]
impl VenueTransport for TcpBridgeTransport {
    async fn open(
        &self,
        endpoint: &Endpoint,
        client_id: i32,
    ) -> Result<mpsc::Receiver<VenueEvent>, TransportError> {
        self.close().await;

        let refused = |message: String| TransportError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            message,
        };
        let stream = tokio::time::timeout(
            self.config.socket_timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        .map_err(|_| refused("socket connect timed out".to_string()))?
        .map_err(|e| refused(e.to_string()))?;
        stream.set_nodelay(true)?;

        let (read_half, mut write_half) = stream.into_split();
        let hello = self.codec.encode_handshake(client_id)?;
        write_half.write_all(hello.as_bytes()).await?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_events(read_half, self.codec, tx, cancel.clone()));

        *self.writer.lock().await = Some(write_half);
        *self.reader.lock() = Some(Reader { cancel, task });

        tracing::debug!(endpoint = %endpoint, client_id, "Bridge socket open");
        Ok(rx)
    }

    async fn send(&self, request: VenueRequest) -> Result<(), TransportError> {
        let line = self.codec.encode_request(&request)?;
        let mut writer = self.writer.lock().await;
        let Some(write_half) = writer.as_mut() else {
            return Err(TransportError::Closed);
        };
        write_half.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn close(&self) {
        self.stop_reader();
        if let Some(mut write_half) = self.writer.lock().await.take()
            && let Err(e) = write_half.shutdown().await
        {
            tracing::debug!(error = %e, "Bridge socket shutdown failed");
        }
    }
}
