//! UDP transmission of raw PCM payloads.

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

/// Default destination: the receiver's listening port on loopback.
pub const DEFAULT_REMOTE: &str = "127.0.0.1:30000";

/// UDP sender for PCM datagrams.
///
/// Network errors on a single send are logged and counted, not returned,
/// so a stream keeps flowing while the receiver is down.
///
/// # Example
///
/// ```ignore
/// use sender::network::DatagramSender;
///
/// let mut sender = DatagramSender::new("127.0.0.1:30000").await?;
/// sender.send(&[0, 0, 0, 0]).await;
/// ```
pub struct DatagramSender {
    // ---
    socket: UdpSocket,
    remote_addr: String,
    datagrams_sent: u64,
    bytes_sent: u64,
    send_errors: u64,
}

impl DatagramSender {
    // ---
    /// Creates a sender bound to any available local port.
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub async fn new(remote_addr: impl Into<String>) -> Result<Self> {
        // ---
        let remote_addr = remote_addr.into();

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("failed to bind UDP socket")?;

        debug!("UDP socket bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            remote_addr,
            datagrams_sent: 0,
            bytes_sent: 0,
            send_errors: 0,
        })
    }

    /// Sends one payload as a single datagram.
    ///
    /// Returns whether the datagram was handed to the OS.
    pub async fn send(&mut self, payload: &[u8]) -> bool {
        // ---
        match self.socket.send_to(payload, &self.remote_addr).await {
            Ok(bytes) => {
                self.datagrams_sent += 1;
                self.bytes_sent += bytes as u64;

                if self.datagrams_sent.is_multiple_of(100) {
                    debug!(
                        "Sent {} datagrams ({} bytes) to {}",
                        self.datagrams_sent, self.bytes_sent, self.remote_addr
                    );
                }
                true
            }
            Err(e) => {
                self.send_errors += 1;
                error!("Failed to send datagram to {}: {}", self.remote_addr, e);
                warn!("Continuing despite network error");
                false
            }
        }
    }

    /// Returns (datagrams_sent, bytes_sent, send_errors).
    pub fn stats(&self) -> (u64, u64, u64) {
        // ---
        (self.datagrams_sent, self.bytes_sent, self.send_errors)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_sender_creation() {
        // ---
        let sender = DatagramSender::new(DEFAULT_REMOTE).await;
        assert!(sender.is_ok());
    }

    #[tokio::test]
    async fn test_sender_delivers_payload() {
        // ---
        let listener = UdpSocket::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("local addr");

        let mut sender = DatagramSender::new(addr.to_string())
            .await
            .expect("sender creation failed");
        assert!(sender.send(&[1, 2, 3]).await);

        let mut buf = [0u8; 16];
        let (len, _) = listener.recv_from(&mut buf).await.expect("recv failed");
        assert_eq!(&buf[..len], &[1, 2, 3]);
        assert_eq!(sender.stats(), (1, 3, 0));
    }

    #[tokio::test]
    async fn test_send_to_unresolvable_counts_error() {
        // ---
        let mut sender = DatagramSender::new("not-an-address")
            .await
            .expect("sender creation failed");

        assert!(!sender.send(&[0, 0]).await);
        assert_eq!(sender.stats(), (0, 0, 1));
    }
}
