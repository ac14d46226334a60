//! RTP Level Sender Library
//!
//! Feeds the receiver with raw 8kHz mono 16-bit PCM over UDP, one 20ms
//! frame per datagram. Audio comes from a WAV file or a generated tone.

pub mod audio;
pub mod network;

pub use audio::{read_wav, AudioData};
pub use network::DatagramSender;

use anyhow::Result;
use rtp_level_common::MetricsContext;
use tracing::info;

/// Streams audio frames as raw PCM datagrams.
///
/// # Arguments
///
/// * `audio` - Audio to send
/// * `sender` - UDP sender
/// * `metrics` - Prometheus handles
/// * `interval_ms` - Milliseconds between datagrams
/// * `loop_audio` - Start over at the end instead of returning
///
/// # Errors
///
/// Returns error if the audio holds no samples. Individual send failures
/// are logged and counted but do not stop the stream.
pub async fn stream_pcm(
    audio: &AudioData,
    sender: &mut DatagramSender,
    metrics: &MetricsContext,
    interval_ms: u64,
    loop_audio: bool,
) -> Result<()> {
    // ---
    if audio.samples.is_empty() {
        anyhow::bail!("no audio samples to send");
    }

    let interval = tokio::time::Duration::from_millis(interval_ms);
    let mut pass = 0u64;

    loop {
        let mut frame_count = 0usize;

        for payload in audio.frame_payloads() {
            if sender.send(&payload).await {
                metrics.datagrams_sent_total.inc();
                metrics.bytes_sent_total.inc_by(payload.len() as u64);
            } else {
                metrics.send_errors_total.inc();
            }
            frame_count += 1;

            // Pace transmission (real-time simulation)
            tokio::time::sleep(interval).await;
        }

        pass += 1;
        info!("Streamed {} frames (pass {})", frame_count, pass);

        if !loop_audio {
            return Ok(());
        }
    }
}
