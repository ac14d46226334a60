//! Report sinks.
//!
//! Analysis produces a [`PacketReport`] per datagram; where it ends up is
//! the sink's business. [`TracingSink`] logs through `tracing`.

use rtp_level_common::level::LevelReading;
use rtp_level_common::rtp::{HeaderFields, PacketError, RTP_HEADER_SIZE};
use std::net::SocketAddr;
use tracing::{debug, info, trace, warn};

/// Everything learned about one framed packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketReport<'a> {
    // ---
    /// Where the payload came from
    pub from: Option<SocketAddr>,

    /// Header fields decoded back from the packet bytes
    pub header: HeaderFields,

    /// The complete packet, header included
    pub packet: &'a [u8],

    /// Payload level, `None` when the payload holds no complete sample
    pub level: Option<LevelReading>,
}

impl<'a> PacketReport<'a> {
    // ---
    pub fn header_bytes(&self) -> &'a [u8] {
        &self.packet[..RTP_HEADER_SIZE]
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.packet[RTP_HEADER_SIZE..]
    }
}

/// Destination for per-packet analysis results.
pub trait ReportSink {
    /// Called once per successfully decoded packet.
    fn report(&mut self, report: &PacketReport<'_>);

    /// Called when a packet header cannot be decoded.
    fn malformed(&mut self, error: &PacketError);
}

/// Sink writing structured `tracing` events.
///
/// Header fields and level go out at `info`; raw header bytes at `debug`
/// and payload bytes at `trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    // ---
    fn report(&mut self, report: &PacketReport<'_>) {
        // ---
        let h = &report.header;

        if let Some(from) = report.from {
            debug!(%from, len = report.payload().len(), "Received packet");
        }
        debug!(header = ?report.header_bytes(), "RTP header");
        trace!(payload = ?report.payload(), "RTP payload");

        match report.level {
            Some(level) => info!(
                version = h.version,
                payload_type = h.payload_type,
                seq = h.sequence,
                timestamp = h.timestamp,
                ssrc = h.ssrc,
                samples = level.sample_count,
                rms = level.rms,
                "Level {:.2} dB",
                level.db
            ),
            None => info!(
                version = h.version,
                payload_type = h.payload_type,
                seq = h.sequence,
                timestamp = h.timestamp,
                ssrc = h.ssrc,
                "No valid audio samples in payload"
            ),
        }
    }

    fn malformed(&mut self, error: &PacketError) {
        // ---
        warn!("Dropped packet: {}", error);
    }
}
