//! Running statistics over analyzed payloads.
//!
//! Tracks how many packets went through the pipeline and summarizes their
//! levels so a long-running receiver can log a heartbeat instead of
//! relying on per-packet lines alone.

use rtp_level_common::level::LevelReading;
use std::time::{Duration, Instant};
use tracing::info;

/// Level and packet statistics.
#[derive(Debug, Clone)]
pub struct LevelStats {
    // ---
    /// Packets framed and decoded successfully
    pub packets: u64,

    /// Packets whose payload held no complete sample
    pub packets_without_samples: u64,

    /// Packets that failed header decoding
    pub packets_malformed: u64,

    /// Packets measured at the silence floor
    pub packets_silent: u64,

    /// Quietest level seen (dB)
    pub min_db: Option<f64>,

    /// Loudest level seen (dB)
    pub max_db: Option<f64>,

    sum_db: f64,
    measured: u64,

    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
}

impl LevelStats {
    // ---
    /// Creates a new stats tracker.
    ///
    /// # Arguments
    ///
    /// * `log_interval` - How often to automatically log stats
    pub fn new(log_interval: Duration) -> Self {
        // ---
        let now = Instant::now();
        Self {
            packets: 0,
            packets_without_samples: 0,
            packets_malformed: 0,
            packets_silent: 0,
            min_db: None,
            max_db: None,
            sum_db: 0.0,
            measured: 0,
            start_time: now,
            last_log_time: now,
            log_interval,
        }
    }

    /// Records one analyzed packet and its level, if any.
    pub fn record_packet(&mut self, level: Option<&LevelReading>) {
        // ---
        self.packets += 1;

        match level {
            Some(reading) => {
                if reading.is_silent() {
                    self.packets_silent += 1;
                }

                self.min_db = Some(self.min_db.map_or(reading.db, |m| m.min(reading.db)));
                self.max_db = Some(self.max_db.map_or(reading.db, |m| m.max(reading.db)));
                self.sum_db += reading.db;
                self.measured += 1;
            }
            None => self.packets_without_samples += 1,
        }

        self.maybe_log();
    }

    pub fn record_malformed(&mut self) {
        // ---
        self.packets_malformed += 1;
        self.maybe_log();
    }

    /// Mean of the per-packet dB levels, if any packet was measured.
    pub fn mean_db(&self) -> Option<f64> {
        // ---
        (self.measured > 0).then(|| self.sum_db / self.measured as f64)
    }

    /// Calculates packets per second.
    pub fn packets_per_second(&self) -> f64 {
        // ---
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.packets as f64 / elapsed
        }
    }

    /// Returns runtime duration.
    pub fn runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn maybe_log(&mut self) {
        // ---
        if self.last_log_time.elapsed() >= self.log_interval {
            self.log();
            self.last_log_time = Instant::now();
        }
    }

    /// Force log current statistics.
    pub fn log(&self) {
        // ---
        let fmt_db = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |db| format!("{db:.1}"));

        info!(
            "Level stats: {} pkts ({:.2} pkt/s), {} without samples, {} silent, {} malformed, dB min/mean/max {}/{}/{}",
            self.packets,
            self.packets_per_second(),
            self.packets_without_samples,
            self.packets_silent,
            self.packets_malformed,
            fmt_db(self.min_db),
            fmt_db(self.mean_db()),
            fmt_db(self.max_db),
        );
    }
}

impl Default for LevelStats {
    fn default() -> Self {
        // ---
        Self::new(Duration::from_secs(5))
    }
}
