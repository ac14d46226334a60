//! Audio loading and preprocessing.
//!
//! Produces the raw payload format the receiver measures: 8kHz mono
//! signed 16-bit little-endian PCM, cut into 20ms frames.

use anyhow::{Context, Result};
use hound::{WavReader, WavSpec};
use std::path::Path;
use tracing::info;

/// Output sample rate (8kHz narrowband)
pub const SAMPLE_RATE: u32 = 8000;

/// Frame duration in milliseconds
pub const FRAME_DURATION_MS: usize = 20;

/// Samples per frame (20ms at 8kHz); one frame per datagram
pub const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE as usize * FRAME_DURATION_MS) / 1000;

/// Audio data container with PCM samples and metadata.
///
/// Samples are always 8kHz mono regardless of input format.
#[derive(Debug)]
pub struct AudioData {
    // ---
    /// PCM samples as 16-bit signed integers
    pub samples: Vec<i16>,

    /// Sample rate of the source before conversion
    pub original_sample_rate: u32,

    /// Channel count of the source before conversion
    pub original_channels: u16,
}

impl AudioData {
    // ---
    /// Generates a sine tone.
    ///
    /// # Arguments
    ///
    /// * `freq_hz` - Tone frequency
    /// * `duration_secs` - Length of the generated audio
    /// * `amplitude` - Peak sample value
    pub fn tone(freq_hz: f64, duration_secs: f64, amplitude: i16) -> Self {
        // ---
        let count = (duration_secs * SAMPLE_RATE as f64) as usize;
        let samples = (0..count)
            .map(|i| {
                let phase = i as f64 * 2.0 * std::f64::consts::PI * freq_hz / SAMPLE_RATE as f64;
                (phase.sin() * amplitude as f64) as i16
            })
            .collect();

        Self {
            samples,
            original_sample_rate: SAMPLE_RATE,
            original_channels: 1,
        }
    }

    /// Returns an iterator over 20ms frames. The last one may be short.
    pub fn frames(&self) -> impl Iterator<Item = &[i16]> {
        // ---
        self.samples.chunks(SAMPLES_PER_FRAME)
    }

    /// Returns each frame encoded as little-endian bytes, ready to send.
    pub fn frame_payloads(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        // ---
        self.frames()
            .map(|frame| frame.iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    /// Returns the total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        // ---
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    /// Returns the number of frames, counting a trailing short frame.
    pub fn frame_count(&self) -> usize {
        // ---
        self.samples.len().div_ceil(SAMPLES_PER_FRAME)
    }
}

/// Reads a WAV file and converts it to 8kHz mono.
///
/// # Errors
///
/// Returns error if:
/// - File cannot be opened
/// - WAV format is invalid
/// - Sample format is neither 16-bit PCM nor 32-bit float
///
/// # Example
///
/// ```no_run
/// use sender::audio::read_wav;
///
/// let audio = read_wav("voice.wav").unwrap();
/// println!("Duration: {:.2}s", audio.duration_secs());
/// ```
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    // ---
    let path = path.as_ref();
    info!("Reading WAV file: {}", path.display());

    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    info!(
        "WAV format: {}Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    use hound::SampleFormat;

    let raw_samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read 16-bit PCM WAV samples")?,

        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read 32-bit float WAV samples")?
            .into_iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect(),

        (SampleFormat::Int, bits) => {
            anyhow::bail!(
                "unsupported integer PCM WAV format: {}-bit (only 16-bit PCM is supported)",
                bits
            );
        }

        (SampleFormat::Float, bits) => {
            anyhow::bail!(
                "unsupported float WAV format: {}-bit (only 32-bit float is supported)",
                bits
            );
        }
    };

    info!("Read {} samples from file", raw_samples.len());

    Ok(AudioData {
        samples: convert_to_target_format(&raw_samples, &spec),
        original_sample_rate: spec.sample_rate,
        original_channels: spec.channels,
    })
}

fn convert_to_target_format(samples: &[i16], spec: &WavSpec) -> Vec<i16> {
    // ---
    let mono = if spec.channels > 1 {
        info!("Converting {} channels to mono", spec.channels);
        convert_to_mono(samples, spec.channels as usize)
    } else {
        samples.to_vec()
    };

    if spec.sample_rate == SAMPLE_RATE {
        return mono;
    }

    info!(
        "Resampling from {}Hz to {}Hz",
        spec.sample_rate, SAMPLE_RATE
    );
    resample_linear(&mono, spec.sample_rate, SAMPLE_RATE)
}

/// Averages interleaved channels into one.
fn convert_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    // ---
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear-interpolation resampler. Adequate for a level-metering feed.
fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    // ---
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio) as usize;
    let last = samples.len() - 1;

    (0..new_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            if idx >= last {
                return samples[last];
            }
            let frac = pos - idx as f64;
            let s0 = samples[idx] as f64;
            let s1 = samples[idx + 1] as f64;
            (s0 + (s1 - s0) * frac) as i16
        })
        .collect()
}
