//! RTP level sender - CLI binary.
//!
//! Reads a WAV file (or generates a tone), converts it to 8kHz mono PCM and
//! sends it to the receiver as raw UDP datagrams, one 20ms frame each.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rtp_level_common::{init_tracing, ColorWhen, MetricsContext, MetricsServerConfig};
use sender::network::DEFAULT_REMOTE;
use sender::{stream_pcm, AudioData, DatagramSender};

/// RTP Level Sender - feed raw PCM audio to the level receiver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    // ---
    /// Input audio file (WAV format)
    #[arg(short, long, conflicts_with = "tone_hz", required_unless_present = "tone_hz")]
    input: Option<String>,

    /// Send a generated sine tone at this frequency instead of a file
    #[arg(long)]
    tone_hz: Option<f64>,

    /// Peak amplitude of the generated tone
    #[arg(long, default_value = "8000")]
    tone_amplitude: i16,

    /// Remote address (IP:port) to send to
    #[arg(short, long, default_value = DEFAULT_REMOTE)]
    remote: String,

    /// Datagram transmission interval in milliseconds
    ///
    /// Default 20ms matches the frame duration for real-time streaming.
    #[arg(short = 't', long, default_value = "20")]
    interval_ms: u64,

    /// Replay input audio continuously (default). Use `--no-loop` to play once and exit.
    #[arg(long = "no-loop", default_value_t = true, action = clap::ArgAction::SetFalse)]
    loop_audio: bool,

    /// Prometheus metrics bind address (serves `GET /metrics`).
    #[arg(long, default_value = "127.0.0.1:9100")]
    metrics_bind: String,

    /// Coloring
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorWhen,
}

/// Capture version number from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let args = Args::parse();

    init_tracing(args.color)?;

    info!("Starting RTP level sender v{VERSION}");
    info!("Remote address: {}", args.remote);
    info!("Transmission interval: {}ms", args.interval_ms);
    info!("Loop audio: {}", args.loop_audio);
    info!("Metrics bind: {}", args.metrics_bind);

    let metrics = MetricsContext::new("sender")?;
    let metrics_bind = args.metrics_bind.parse().context("invalid metrics bind")?;
    let _metrics_task = metrics.spawn_metrics_server(MetricsServerConfig::new(metrics_bind));

    let audio = match (&args.input, args.tone_hz) {
        (Some(path), _) => {
            // Decoding and resampling are CPU-bound; keep them off the runtime
            let input_path = path.clone();
            tokio::task::spawn_blocking(move || sender::read_wav(input_path))
                .await
                .context("audio reading task failed")??
        }
        (None, Some(freq)) => {
            info!("Generating {}Hz tone", freq);
            AudioData::tone(freq, 1.0, args.tone_amplitude)
        }
        (None, None) => anyhow::bail!("either --input or --tone-hz is required"),
    };

    info!(
        "Loaded {:.2}s of audio ({} frames)",
        audio.duration_secs(),
        audio.frame_count()
    );

    let mut sender = DatagramSender::new(&args.remote)
        .await
        .context("failed to create sender")?;

    info!("Starting transmission...");
    tokio::select! {
        r = stream_pcm(&audio, &mut sender, &metrics, args.interval_ms, args.loop_audio) => r?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    let (datagrams, bytes, errors) = sender.stats();
    info!(
        "Transmission complete: {} datagrams, {} bytes, {} errors",
        datagrams, bytes, errors
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn tone_or_input_required() {
        // ---
        assert!(Args::try_parse_from(["sender"]).is_err());
        assert!(Args::try_parse_from(["sender", "--tone-hz", "440"]).is_ok());
        assert!(Args::try_parse_from(["sender", "-i", "a.wav", "--tone-hz", "440"]).is_err());
    }

    #[test]
    fn defaults_target_receiver_port() {
        // ---
        let args = Args::parse_from(["sender", "--input", "a.wav"]);
        assert_eq!(args.remote, "127.0.0.1:30000");
        assert!(args.loop_audio);
        assert_eq!(args.interval_ms, 20);
    }
}
