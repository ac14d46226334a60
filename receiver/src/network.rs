//! Datagram sources feeding the receive loop.
//!
//! The loop only needs "give me the next datagram"; [`DatagramSource`]
//! captures that so the loop runs the same against a real UDP socket
//! ([`UdpDatagramSource`]) or a queue of synthetic payloads
//! ([`MemorySource`]).

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Default UDP port the receiver listens on.
pub const DEFAULT_PORT: u16 = 30000;

/// Receive buffer size; longer datagrams are truncated by the socket.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Metadata for one datagram copied into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    // ---
    /// Number of bytes written to the buffer
    pub len: usize,

    /// Sender address, when the source has one
    pub from: Option<SocketAddr>,
}

/// Something that yields datagrams one at a time.
#[allow(async_fn_in_trait)]
pub trait DatagramSource {
    /// Waits for the next datagram and copies it into `buf`.
    ///
    /// Returns `Ok(None)` once the source is exhausted; a socket never is.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying transport fails. The receive loop
    /// stops on such errors.
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<Received>>;
}

/// UDP socket source.
///
/// Owns the bound socket; dropping the source closes it.
pub struct UdpDatagramSource {
    // ---
    socket: UdpSocket,
    datagrams_received: u64,
    bytes_received: u64,
}

impl UdpDatagramSource {
    // ---
    /// Binds a UDP socket on all interfaces (0.0.0.0) at `port`.
    ///
    /// Port 0 picks an ephemeral port (see [`Self::local_addr`]).
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn bind(port: u16) -> Result<Self> {
        // ---
        let addr = format!("0.0.0.0:{}", port);

        let socket = UdpSocket::bind(&addr)
            .await
            .with_context(|| format!("failed to bind UDP socket to {}", addr))?;

        info!("UDP socket bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            datagrams_received: 0,
            bytes_received: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        // ---
        self.socket
            .local_addr()
            .context("failed to read local socket address")
    }

    /// Returns (datagrams_received, bytes_received).
    pub fn stats(&self) -> (u64, u64) {
        // ---
        (self.datagrams_received, self.bytes_received)
    }
}

impl DatagramSource for UdpDatagramSource {
    // ---
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<Received>> {
        // ---
        let (len, src) = self
            .socket
            .recv_from(buf)
            .await
            .context("failed to receive UDP datagram")?;

        self.datagrams_received += 1;
        self.bytes_received += len as u64;

        debug!("Received {} bytes from {}", len, src);

        Ok(Some(Received {
            len,
            from: Some(src),
        }))
    }
}

/// In-memory source replaying queued payloads, then reporting exhaustion.
///
/// Payloads longer than the receive buffer are truncated the way a UDP
/// socket would truncate them.
#[derive(Debug, Default)]
pub struct MemorySource {
    // ---
    queue: VecDeque<Vec<u8>>,
}

impl MemorySource {
    // ---
    pub fn new<I>(payloads: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        // ---
        Self {
            queue: payloads.into_iter().collect(),
        }
    }

    pub fn push(&mut self, payload: Vec<u8>) {
        self.queue.push_back(payload);
    }

    /// Payloads not yet delivered.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl DatagramSource for MemorySource {
    // ---
    async fn recv(&mut self, buf: &mut [u8]) -> Result<Option<Received>> {
        // ---
        let Some(payload) = self.queue.pop_front() else {
            return Ok(None);
        };

        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);

        Ok(Some(Received { len, from: None }))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_udp_source_creation() {
        // ---
        let source = UdpDatagramSource::bind(0).await;
        assert!(source.is_ok());
    }

    #[tokio::test]
    async fn test_udp_source_receives_datagram() {
        // ---
        let mut source = UdpDatagramSource::bind(0)
            .await
            .expect("source creation failed");
        let port = source.local_addr().expect("local addr").port();

        let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
        client
            .send_to(&[1, 2, 3, 4, 5], ("127.0.0.1", port))
            .await
            .expect("send failed");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let received = source
            .recv(&mut buf)
            .await
            .expect("recv failed")
            .expect("socket never exhausts");

        assert_eq!(received.len, 5);
        assert_eq!(&buf[..received.len], &[1, 2, 3, 4, 5]);
        assert!(received.from.is_some());
        assert_eq!(source.stats(), (1, 5));
    }

    #[tokio::test]
    async fn test_memory_source_replays_then_ends() {
        // ---
        let mut source = MemorySource::new(vec![vec![1, 2], vec![]]);
        let mut buf = [0u8; 8];

        let first = source.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(first.len, 2);
        assert_eq!(&buf[..2], &[1, 2]);

        let second = source.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(second.len, 0);

        assert!(source.recv(&mut buf).await.unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn test_memory_source_truncates_to_buffer() {
        // ---
        let mut source = MemorySource::new(vec![vec![7u8; 10]]);
        let mut buf = [0u8; 4];

        let received = source.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(received.len, 4);
    }
}
