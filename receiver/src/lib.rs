//! RTP Level Receiver Library
//!
//! Receives raw PCM payloads, frames each one as an RTP packet, decodes the
//! header back and measures the payload level. Sources and sinks are
//! injected, so the whole pipeline runs without a socket in tests.

pub mod network;
pub mod sink;
pub mod stats;

pub use network::{DatagramSource, MemorySource, Received, UdpDatagramSource};
pub use rtp_level_common::{LevelReading, PacketError, StreamEncoder};
pub use sink::{PacketReport, ReportSink, TracingSink};
pub use stats::LevelStats;

use anyhow::Result;
use rtp_level_common::level::compute_level;
use rtp_level_common::rtp::RtpPacket;
use rtp_level_common::MetricsContext;
use std::net::SocketAddr;
use std::time::Instant;

/// Decodes a framed packet and measures its payload.
///
/// Pure: no state is read or written besides the returned report.
///
/// # Errors
///
/// Returns `PacketError::MalformedPacket` if `packet` is shorter than the
/// RTP header.
pub fn analyze_packet(
    packet: &[u8],
    from: Option<SocketAddr>,
) -> Result<PacketReport<'_>, PacketError> {
    // ---
    let parsed = RtpPacket::parse(packet)?;

    Ok(PacketReport {
        from,
        header: parsed.header,
        packet,
        level: compute_level(parsed.payload),
    })
}

/// Runs the receive → encode → analyze → report loop.
///
/// Datagrams are handled strictly one at a time on the calling task: the
/// next `recv` is only awaited once the previous report has been handed to
/// the sink. A malformed packet is reported and skipped; it never ends the
/// loop.
///
/// # Arguments
///
/// * `source` - Where datagrams come from
/// * `encoder` - Stream state stamped into each packet
/// * `sink` - Where reports go
/// * `stats` - Running statistics, owned by the caller so they survive
///   cancellation
/// * `metrics` - Prometheus handles
///
/// # Errors
///
/// Returns error if the source fails. Returns `Ok(())` when the source is
/// exhausted.
pub async fn receive_loop<S, K>(
    source: &mut S,
    encoder: &mut StreamEncoder,
    sink: &mut K,
    stats: &mut LevelStats,
    metrics: &MetricsContext,
) -> Result<()>
where
    S: DatagramSource,
    K: ReportSink,
{
    // ---
    let mut buf = vec![0u8; network::MAX_DATAGRAM_SIZE];

    while let Some(received) = source.recv(&mut buf).await? {
        metrics.datagrams_received_total.inc();
        metrics.bytes_received_total.inc_by(received.len as u64);

        let started = Instant::now();
        let packet = encoder.encode(&buf[..received.len]);
        metrics.packets_encoded_total.inc();

        match analyze_packet(&packet, received.from) {
            Ok(report) => {
                metrics
                    .analysis_seconds
                    .observe(started.elapsed().as_secs_f64());

                match &report.level {
                    Some(level) => {
                        metrics.observe_level(level.db);
                        if level.is_silent() {
                            metrics.payloads_silent_total.inc();
                        }
                    }
                    None => metrics.payloads_without_samples_total.inc(),
                }

                sink.report(&report);
                stats.record_packet(report.level.as_ref());
            }
            Err(e) => {
                metrics.packets_malformed_total.inc();
                sink.malformed(&e);
                stats.record_malformed();
            }
        }
    }

    Ok(())
}
