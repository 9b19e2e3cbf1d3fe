//! Wire-to-local timestamp calibration
//!
//! Incoming frame timestamps are in the sender's clock. Downstream
//! consumers (frame/tool-pose synchronization, playback search) need them
//! in the receiver's clock, so the client estimates the clock offset and
//! applies it as an additive correction.
//!
//! The estimator keeps the last 20 `local − wire` differences. Every 2
//! seconds it re-estimates: samples are ranked by distance from the
//! current shift, the 5 farthest are discarded as outliers (network
//! latency spikes) and the remaining 15 are averaged. Until the first full
//! window the shift is seeded from the first sample so early frames are
//! already roughly in local time.

use std::collections::VecDeque;
use tracing::debug;

/// Number of difference samples kept in the window
pub const WINDOW_SIZE: usize = 20;

/// Samples retained after outlier trimming
pub const KEEP_SIZE: usize = 15;

/// Seconds between re-estimations
pub const RESYNC_INTERVAL: f64 = 2.0;

/// Additive clock-shift estimator
pub struct TimestampSync {
    shift: f64,
    initialized: bool,
    diffs: VecDeque<f64>,
    last_resync: f64,
}

impl TimestampSync {
    pub fn new() -> Self {
        TimestampSync {
            shift: 0.0,
            initialized: false,
            diffs: VecDeque::with_capacity(WINDOW_SIZE),
            last_resync: 0.0,
        }
    }

    /// Correct a wire timestamp given the local receive time, both in
    /// seconds; updates the estimator state
    pub fn correct(&mut self, wire_seconds: f64, local_seconds: f64) -> f64 {
        let diff = local_seconds - wire_seconds;

        if self.diffs.len() == WINDOW_SIZE {
            self.diffs.pop_front();
        }
        self.diffs.push_back(diff);

        if !self.initialized {
            self.shift = diff;
            self.initialized = true;
            self.last_resync = local_seconds;
        } else if local_seconds - self.last_resync >= RESYNC_INTERVAL
            && self.diffs.len() == WINDOW_SIZE
        {
            self.resync();
            self.last_resync = local_seconds;
        }

        wire_seconds + self.shift
    }

    /// Current shift estimate in seconds
    pub fn shift(&self) -> f64 {
        self.shift
    }

    fn resync(&mut self) {
        let mut samples: Vec<f64> = self.diffs.iter().copied().collect();
        samples.sort_by(|a, b| {
            let da = (a - self.shift).abs();
            let db = (b - self.shift).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        samples.truncate(KEEP_SIZE);

        let new_shift = samples.iter().sum::<f64>() / samples.len() as f64;
        debug!(
            old_shift = self.shift,
            new_shift, "Resynchronized timestamp calibration"
        );
        self.shift = new_shift;
    }
}

impl Default for TimestampSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // deterministic jitter in [-amplitude, amplitude]
    fn jitter(i: usize, amplitude: f64) -> f64 {
        let phase = (i as f64) * 0.7368;
        amplitude * (phase.sin())
    }

    #[test]
    fn test_first_frame_is_roughly_local() {
        let mut sync = TimestampSync::new();
        let corrected = sync.correct(1000.0, 5000.0);
        assert!((corrected - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_offset_recovered() {
        let mut sync = TimestampSync::new();
        let offset = 3600.0;
        for i in 0..100 {
            let wire = i as f64 * 0.033;
            sync.correct(wire, wire + offset);
        }
        assert!((sync.shift() - offset).abs() < 1e-9);
    }

    #[test]
    fn test_convergence_under_jitter() {
        // frames at 30 fps with a constant true offset plus bounded jitter;
        // after a full window the corrected error must be below the raw
        // per-frame jitter amplitude
        let offset = 120.5;
        let amplitude = 0.050;

        let mut sync = TimestampSync::new();
        let mut corrected = 0.0;
        let mut wire = 0.0;
        for i in 0..120 {
            wire = i as f64 * 0.033;
            let local = wire + offset + jitter(i, amplitude);
            corrected = sync.correct(wire, local);
        }

        let error = (corrected - (wire + offset)).abs();
        assert!(error < amplitude, "calibrated error {error} not below jitter");
        // and the estimate is much closer than a single raw sample can be
        assert!((sync.shift() - offset).abs() < amplitude / 2.0);
    }

    #[test]
    fn test_outlier_spike_suppressed() {
        let offset = 10.0;
        let mut sync = TimestampSync::new();
        for i in 0..90 {
            let wire = i as f64 * 0.033;
            // every 10th frame arrives half a second late
            let latency = if i % 10 == 0 { 0.5 } else { 0.0 };
            sync.correct(wire, wire + offset + latency);
        }
        // trimming keeps the estimate near the true offset, not the spikes
        assert!((sync.shift() - offset).abs() < 0.1);
    }
}
