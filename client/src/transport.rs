//! Transport seam between the connection manager and the wire.
//!
//! The connection manager only knows how to open a [`Transport`] through a
//! [`Connector`] and push [`ClientMessage`]s through it. Retry and endpoint
//! selection live in [`crate::connection`]; framing lives here.

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::codec::{self, CodecError, HEADER_LEN};
use shared::{ClientMessage, ServerMessage};
use std::io::ErrorKind;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("connection closed")]
    Closed,
}

/// An open, bidirectional message connection to the game server.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, message: ClientMessage) -> Result<(), TransportError>;

    /// Next pushed message. `None` once the connection is closed cleanly.
    async fn recv(&mut self) -> Option<Result<ServerMessage, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports to named endpoints.
#[async_trait]
pub trait Connector: Send {
    type Transport: Transport;

    async fn connect(&mut self, endpoint: &str) -> Result<Self::Transport, TransportError>;
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = codec::encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame. `Ok(None)` on a clean end of stream
/// between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = codec::frame_len(header)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(codec::decode_body(&body)?))
}

/// Accepts `host:port`, optionally prefixed with `tcp://`.
fn socket_addr(endpoint: &str) -> Result<&str, TransportError> {
    let addr = endpoint.strip_prefix("tcp://").unwrap_or(endpoint).trim();
    if addr.is_empty() || !addr.contains(':') {
        return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(addr)
}

#[derive(Debug, Default, Clone)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&mut self, endpoint: &str) -> Result<TcpTransport, TransportError> {
        let stream = TcpStream::connect(socket_addr(endpoint)?).await?;
        stream.set_nodelay(true)?;
        debug!("TCP connection established to {}", endpoint);
        Ok(TcpTransport::new(stream))
    }
}

/// TCP transport. Frames are decoded by a background task into a channel so
/// that `recv` can be raced in `select!` without losing partial frames.
pub struct TcpTransport {
    writer: OwnedWriteHalf,
    incoming: mpsc::UnboundedReceiver<Result<ServerMessage, TransportError>>,
    reader: JoinHandle<()>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        let (mut read_half, writer) = stream.into_split();
        let (tx, incoming) = mpsc::unbounded_channel();

        let reader = tokio::spawn(async move {
            loop {
                match read_frame::<_, ServerMessage>(&mut read_half).await {
                    Ok(Some(message)) => {
                        if tx.send(Ok(message)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Dropping connection after bad frame: {}", e);
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        Self {
            writer,
            incoming,
            reader,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        write_frame(&mut self.writer, &message).await
    }

    async fn recv(&mut self) -> Option<Result<ServerMessage, TransportError>> {
        self.incoming.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.reader.abort();
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
