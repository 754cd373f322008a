use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::ClientError;

/// Inbound bytes pulled off the socket per refill.
const INBOUND_CHUNK: usize = 64;

/// Byte transport used by the client and the push channel.
///
/// `available`, `read_byte` and `read` are non-blocking polls over bytes the
/// transport has already received; they never wait for the network.
#[async_trait]
pub trait Connection: Send {
    /// Opens the connection. Returns `false` when the peer cannot be reached.
    async fn connect(&mut self, host: &str, port: u16) -> bool;

    async fn send(&mut self, data: &[u8]) -> Result<(), ClientError>;

    /// Number of bytes that can be read right now without waiting.
    fn available(&mut self) -> usize;

    fn read_byte(&mut self) -> Option<u8>;

    /// Reads up to `buf.len()` ready bytes, returning how many were copied.
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.read_byte() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn connected(&self) -> bool;

    /// Closes the connection. Safe to call on a closed connection.
    async fn close(&mut self);
}

/// Plaintext TCP transport backed by tokio.
///
/// Holds at most one small chunk of inbound data at a time. It does not speak
/// TLS; secure deployments supply their own [`Connection`].
#[derive(Debug, Default)]
pub struct TcpConnection {
    stream: Option<TcpStream>,
    inbound: BytesMut,
    peer_closed: bool,
}

impl TcpConnection {
    pub fn new() -> Self {
        Self {
            stream: None,
            inbound: BytesMut::with_capacity(INBOUND_CHUNK),
            peer_closed: false,
        }
    }

    fn fill(&mut self) {
        if !self.inbound.is_empty() || self.peer_closed {
            return;
        }
        let Some(stream) = &self.stream else {
            return;
        };

        self.inbound.reserve(INBOUND_CHUNK);
        match stream.try_read_buf(&mut self.inbound) {
            Ok(0) => {
                debug!("Peer closed the connection");
                self.peer_closed = true;
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                warn!("Read failed: {}", e);
                self.peer_closed = true;
            }
        }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn connect(&mut self, host: &str, port: u16) -> bool {
        self.close().await;
        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                self.stream = Some(stream);
                true
            }
            Err(e) => {
                warn!("Failed to connect to {}:{}: {}", host, port, e);
                false
            }
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        stream.write_all(data).await?;
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.fill();
        self.inbound.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.fill();
        if self.inbound.has_remaining() {
            Some(self.inbound.get_u8())
        } else {
            None
        }
    }

    fn connected(&self) -> bool {
        self.stream.is_some() && (!self.peer_closed || !self.inbound.is_empty())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown failed: {}", e);
            }
        }
        self.inbound.clear();
        self.peer_closed = false;
    }
}
