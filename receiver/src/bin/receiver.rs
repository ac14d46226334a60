//! RTP level receiver - CLI binary.
//!
//! Listens for raw PCM datagrams, frames each as an RTP packet and logs the
//! decoded header together with the payload level in dB.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::info;

use receiver::network::DEFAULT_PORT;
use receiver::{receive_loop, LevelStats, StreamEncoder, TracingSink, UdpDatagramSource};
use rtp_level_common::{init_tracing, ColorWhen, MetricsContext, MetricsServerConfig};

/// RTP Level Receiver - frame incoming audio as RTP and log its loudness
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    // ---
    /// UDP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Fixed SSRC for the generated stream (decimal or 0x-prefixed hex).
    /// Random when omitted.
    #[arg(long, value_parser = parse_ssrc)]
    ssrc: Option<u32>,

    /// Seconds between periodic level statistics lines
    #[arg(short = 's', long, default_value = "5")]
    stats_interval_secs: u64,

    /// Prometheus metrics bind address (serves `GET /metrics`).
    #[arg(long, default_value = "127.0.0.1:9200")]
    metrics_bind: String,

    /// Coloring
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorWhen,
}

fn parse_ssrc(s: &str) -> Result<u32, String> {
    // ---
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid SSRC '{s}': {e}"))
}

/// Capture version number from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let args = Args::parse();
    init_tracing(args.color)?;

    info!("Starting RTP level receiver v{VERSION}");
    info!("Listening on port: {}", args.port);
    info!("Stats interval: {}s", args.stats_interval_secs);
    info!("Metrics bind: {}", args.metrics_bind);

    let metrics = MetricsContext::new("receiver")?;
    let metrics_bind = args.metrics_bind.parse().context("invalid metrics bind")?;
    let _metrics_task = metrics.spawn_metrics_server(MetricsServerConfig::new(metrics_bind));

    let mut source = UdpDatagramSource::bind(args.port)
        .await
        .context("failed to create receiver")?;

    let mut encoder = match args.ssrc {
        Some(ssrc) => StreamEncoder::with_ssrc(ssrc),
        None => StreamEncoder::new(),
    };
    info!("Stream SSRC: 0x{:08X}", encoder.ssrc());

    let mut sink = TracingSink;
    let mut stats = LevelStats::new(Duration::from_secs(args.stats_interval_secs));

    info!("Ready to receive audio...");

    let result = tokio::select! {
        r = receive_loop(&mut source, &mut encoder, &mut sink, &mut stats, &metrics) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    let (datagrams, bytes) = source.stats();
    drop(source);
    info!("UDP socket closed ({} datagrams, {} bytes)", datagrams, bytes);
    stats.log();

    result
}
