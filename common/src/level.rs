//! Loudness measurement for 16-bit PCM payloads.
//!
//! Payload bytes are read as signed 16-bit little-endian samples. The level
//! is the RMS of those samples expressed in decibels relative to a sample
//! value of 1 (`20 * log10(rms)`), so full-scale audio reads about +90 dB
//! and digital silence reads [`SILENCE_FLOOR_DB`].

/// Lowest level ever reported, in dB.
///
/// `log10(0)` is negative infinity; an all-zero payload (and anything
/// quieter than this) is clamped here instead.
pub const SILENCE_FLOOR_DB: f64 = -100.0;

/// Result of measuring one payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReading {
    // ---
    /// Root-mean-square sample value
    pub rms: f64,

    /// `20 * log10(rms)`, never below `SILENCE_FLOOR_DB`
    pub db: f64,

    /// Number of complete samples consumed
    pub sample_count: usize,
}

impl LevelReading {
    // ---
    /// Returns true when the level sits on the silence floor.
    pub fn is_silent(&self) -> bool {
        self.db <= SILENCE_FLOOR_DB
    }
}

/// Iterates the complete little-endian `i16` samples in `payload`.
///
/// A trailing odd byte is not part of any sample and is skipped.
pub fn pcm_samples(payload: &[u8]) -> impl Iterator<Item = i16> + '_ {
    // ---
    payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

/// Measures the loudness of a PCM payload.
///
/// Returns `None` when the payload holds no complete sample (empty, or a
/// single stray byte). Never fails otherwise.
///
/// # Example
///
/// ```
/// use rtp_level_common::level::compute_level;
///
/// let payload: Vec<u8> = [1000i16, -1000]
///     .iter()
///     .flat_map(|s| s.to_le_bytes())
///     .collect();
///
/// let reading = compute_level(&payload).unwrap();
/// assert!((reading.db - 60.0).abs() < 1e-9);
/// ```
pub fn compute_level(payload: &[u8]) -> Option<LevelReading> {
    // ---
    let sample_count = payload.len() / 2;
    if sample_count == 0 {
        return None;
    }

    // Each square is at most 2^30; u64 holds any datagram-sized sum exactly.
    let sum_of_squares: u64 = pcm_samples(payload)
        .map(|s| {
            let s = i64::from(s);
            (s * s) as u64
        })
        .sum();

    let rms = (sum_of_squares as f64 / sample_count as f64).sqrt();

    Some(LevelReading {
        rms,
        db: rms_to_db(rms),
        sample_count,
    })
}

/// Converts an RMS value to decibels, clamped to `SILENCE_FLOOR_DB`.
pub fn rms_to_db(rms: f64) -> f64 {
    // ---
    if rms <= 0.0 {
        return SILENCE_FLOOR_DB;
    }

    (20.0 * rms.log10()).max(SILENCE_FLOOR_DB)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_empty_payload_has_no_samples() {
        // ---
        assert_eq!(compute_level(&[]), None);
    }

    #[test]
    fn test_single_byte_has_no_samples() {
        // ---
        assert_eq!(compute_level(&[0x7F]), None);
    }

    #[test]
    fn test_symmetric_samples() {
        // ---
        let reading = compute_level(&pcm(&[1000, -1000])).expect("samples expected");

        assert_eq!(reading.sample_count, 2);
        assert!((reading.rms - 1000.0).abs() < 1e-9);
        assert!((reading.db - 60.0).abs() < 1e-9);
        assert!(!reading.is_silent());
    }

    #[test]
    fn test_all_zero_payload_hits_floor() {
        // ---
        let reading = compute_level(&[0u8; 100]).expect("samples expected");

        assert_eq!(reading.sample_count, 50);
        assert_eq!(reading.rms, 0.0);
        assert_eq!(reading.db, SILENCE_FLOOR_DB);
        assert!(reading.db.is_finite());
        assert!(reading.is_silent());
    }

    #[test]
    fn test_odd_length_ignores_trailing_byte() {
        // ---
        let mut payload = pcm(&[3, 4, 12]);
        payload.push(0xFF);
        assert_eq!(payload.len(), 7);

        let reading = compute_level(&payload).expect("samples expected");

        // (9 + 16 + 144) / 3 = 56.33..
        assert_eq!(reading.sample_count, 3);
        assert!((reading.rms - (169.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_full_scale_does_not_overflow() {
        // ---
        let payload = pcm(&[i16::MIN; 30_000]);
        let reading = compute_level(&payload).expect("samples expected");

        assert!((reading.rms - 32768.0).abs() < 1e-6);
        assert!((reading.db - 20.0 * 32768f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_samples_are_little_endian() {
        // ---
        let samples: Vec<i16> = pcm_samples(&[0x01, 0x00, 0x00, 0x80, 0xFF]).collect();
        assert_eq!(samples, vec![1, i16::MIN]);
    }

    #[test]
    fn test_rms_to_db_clamps() {
        // ---
        assert_eq!(rms_to_db(0.0), SILENCE_FLOOR_DB);
        assert_eq!(rms_to_db(1e-9), SILENCE_FLOOR_DB);
        assert!((rms_to_db(1.0)).abs() < 1e-12);
    }
}
