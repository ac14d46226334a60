//! Integration tests for the core pipeline.
//!
//! Drives `receive_loop` end to end: synthetic payloads → RTP framing →
//! header decoding → level measurement → sink, with and without a real
//! UDP socket.

use receiver::{
    receive_loop, LevelStats, MemorySource, PacketError, PacketReport, ReportSink, StreamEncoder,
    UdpDatagramSource,
};
use rtp_level_common::level::SILENCE_FLOOR_DB;
use rtp_level_common::rtp::HeaderFields;
use rtp_level_common::{LevelReading, MetricsContext};
use std::time::Duration;

/// Owned copy of what the sink saw for one packet.
#[derive(Debug, Clone)]
struct Seen {
    header: HeaderFields,
    packet_len: usize,
    payload: Vec<u8>,
    level: Option<LevelReading>,
}

#[derive(Default)]
struct CollectingSink {
    seen: Vec<Seen>,
    malformed: Vec<PacketError>,
}

impl ReportSink for CollectingSink {
    fn report(&mut self, report: &PacketReport<'_>) {
        self.seen.push(Seen {
            header: report.header,
            packet_len: report.packet.len(),
            payload: report.payload().to_vec(),
            level: report.level,
        });
    }

    fn malformed(&mut self, error: &PacketError) {
        self.malformed.push(error.clone());
    }
}

fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

async fn run(payloads: Vec<Vec<u8>>, ssrc: u32) -> (CollectingSink, LevelStats, MetricsContext) {
    // ---
    let mut source = MemorySource::new(payloads);
    let mut encoder = StreamEncoder::with_ssrc(ssrc);
    let mut sink = CollectingSink::default();
    let mut stats = LevelStats::new(Duration::from_secs(3600));
    let metrics = MetricsContext::new("test").expect("metrics init");

    receive_loop(&mut source, &mut encoder, &mut sink, &mut stats, &metrics)
        .await
        .expect("loop failed");

    (sink, stats, metrics)
}

/// Every payload is framed with consecutive sequence numbers and timestamps.
#[tokio::test]
async fn test_sequence_and_timestamp_across_packets() {
    // ---
    let payloads = (0..20).map(|i| vec![i as u8; i]).collect();
    let (sink, stats, _) = run(payloads, 0x0102_0304).await;

    assert_eq!(sink.seen.len(), 20);
    assert_eq!(stats.packets, 20);

    for (i, seen) in sink.seen.iter().enumerate() {
        assert_eq!(seen.header.version, 2);
        assert_eq!(seen.header.payload_type, 96);
        assert_eq!(seen.header.sequence as usize, i);
        assert_eq!(seen.header.timestamp as usize, i * 160);
        assert_eq!(seen.header.ssrc, 0x0102_0304);
        assert_eq!(seen.packet_len, 12 + i);
        assert_eq!(seen.payload, vec![i as u8; i]);
    }
}

/// Payload contents decide between a level, silence and "no samples".
#[tokio::test]
async fn test_levels_reported_per_payload() {
    // ---
    let payloads = vec![
        pcm(&[1000, -1000]),
        vec![0u8; 100],
        vec![],
        vec![0x42],
        {
            let mut odd = pcm(&[10, 10, 10]);
            odd.push(0x99);
            odd
        },
    ];
    let (sink, stats, metrics) = run(payloads, 1).await;

    let levels: Vec<_> = sink.seen.iter().map(|s| s.level).collect();

    let loud = levels[0].expect("level expected");
    assert!((loud.rms - 1000.0).abs() < 1e-9);
    assert!((loud.db - 60.0).abs() < 1e-9);

    let silent = levels[1].expect("level expected");
    assert_eq!(silent.rms, 0.0);
    assert_eq!(silent.db, SILENCE_FLOOR_DB);

    assert!(levels[2].is_none());
    assert!(levels[3].is_none());

    let odd = levels[4].expect("level expected");
    assert_eq!(odd.sample_count, 3);
    assert!((odd.db - 20.0).abs() < 1e-9);

    assert_eq!(stats.packets_without_samples, 2);
    assert_eq!(stats.packets_silent, 1);
    assert_eq!(stats.max_db.map(|db| db.round()), Some(60.0));
    assert!(sink.malformed.is_empty());

    assert_eq!(metrics.datagrams_received_total.get(), 5);
    assert_eq!(metrics.payloads_without_samples_total.get(), 2);
    assert_eq!(metrics.payloads_silent_total.get(), 1);
}

/// Framing never produces a packet too short to decode.
#[tokio::test]
async fn test_no_malformed_packets_from_encoder() {
    // ---
    let (sink, stats, metrics) = run(vec![vec![]; 3], 9).await;

    assert!(sink.malformed.is_empty());
    assert_eq!(stats.packets_malformed, 0);
    assert_eq!(metrics.packets_malformed_total.get(), 0);
    assert!(sink.seen.iter().all(|s| s.packet_len == 12));
}

/// Datagrams larger than the receive buffer are cut to 4096 bytes.
#[tokio::test]
async fn test_oversized_datagram_truncated() {
    // ---
    let (sink, _, _) = run(vec![vec![1u8; 5000]], 9).await;

    assert_eq!(sink.seen[0].payload.len(), 4096);
    assert_eq!(sink.seen[0].packet_len, 12 + 4096);
}

/// Real socket: datagrams sent over loopback come out framed and measured.
#[tokio::test]
async fn test_udp_loopback() {
    // ---
    let mut source = UdpDatagramSource::bind(0).await.expect("bind failed");
    let port = source.local_addr().expect("local addr").port();

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("client bind failed");
    for _ in 0..3 {
        client
            .send_to(&pcm(&[1000, -1000]), ("127.0.0.1", port))
            .await
            .expect("send failed");
    }

    let mut encoder = StreamEncoder::with_ssrc(77);
    let mut sink = CollectingSink::default();
    let mut stats = LevelStats::default();
    let metrics = MetricsContext::new("test").expect("metrics init");

    // A socket never ends; the loop must still be waiting when the timeout fires.
    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        receive_loop(&mut source, &mut encoder, &mut sink, &mut stats, &metrics),
    )
    .await;
    assert!(outcome.is_err(), "receive loop ended early: {outcome:?}");

    assert_eq!(sink.seen.len(), 3);
    assert_eq!(encoder.sequence(), 3);
    assert_eq!(encoder.timestamp(), 480);
    for seen in &sink.seen {
        let level = seen.level.expect("level expected");
        assert!((level.db - 60.0).abs() < 1e-9);
    }
}
