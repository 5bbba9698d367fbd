//! Frame throughput telemetry
//!
//! Arrival timestamps are folded into fixed windows. At each window rollover
//! the average inter-frame interval is reported, unless the window saw no
//! intervals at all.

use std::time::{Duration, Instant};

/// Default report window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

/// One window's worth of statistics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputReport {
    /// Mean time between consecutive frames
    pub average_interval: Duration,
    /// Intervals measured in the window
    pub sample_count: u64,
}

impl ThroughputReport {
    /// Frame rate implied by the average interval
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.average_interval.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

/// Rolling inter-frame statistics
#[derive(Clone, Debug)]
pub struct ThroughputTelemetry {
    last_arrival: Option<Instant>,
    sample_count: u64,
    accumulated_interval: Duration,
    window_start: Instant,
    window: Duration,
    last_report: Option<ThroughputReport>,
    reports_emitted: u64,
}

impl ThroughputTelemetry {
    pub fn new(now: Instant) -> Self {
        Self::with_window(now, DEFAULT_WINDOW)
    }

    pub fn with_window(now: Instant, window: Duration) -> Self {
        ThroughputTelemetry {
            last_arrival: None,
            sample_count: 0,
            accumulated_interval: Duration::ZERO,
            window_start: now,
            window,
            last_report: None,
            reports_emitted: 0,
        }
    }

    /// Record a frame arrival
    ///
    /// Returns the report when this arrival closes a window with samples.
    pub fn record(&mut self, now: Instant) -> Option<ThroughputReport> {
        if let Some(last) = self.last_arrival {
            self.accumulated_interval += now.saturating_duration_since(last);
            self.sample_count += 1;
        }
        self.last_arrival = Some(now);

        if now.saturating_duration_since(self.window_start) < self.window {
            return None;
        }

        let report = if self.sample_count > 0 {
            let report = ThroughputReport {
                average_interval: average(self.accumulated_interval, self.sample_count),
                sample_count: self.sample_count,
            };
            tracing::info!(
                target: "marionette::throughput",
                avg_interval_ms = report.average_interval.as_secs_f64() * 1000.0,
                fps = report.frames_per_second(),
                frames = report.sample_count,
                "pose stream throughput"
            );
            self.last_report = Some(report);
            self.reports_emitted += 1;
            Some(report)
        } else {
            None
        };

        self.accumulated_interval = Duration::ZERO;
        self.sample_count = 0;
        self.window_start = now;
        report
    }

    /// Intervals accumulated in the open window
    pub fn pending_samples(&self) -> u64 {
        self.sample_count
    }

    /// Most recent emitted report
    pub fn last_report(&self) -> Option<ThroughputReport> {
        self.last_report
    }

    pub fn reports_emitted(&self) -> u64 {
        self.reports_emitted
    }

    /// Start over, e.g. for a new stream
    pub fn reset(&mut self, now: Instant) {
        *self = Self::with_window(now, self.window);
    }
}

/// Mean of `count` intervals summing to `total`; zero for no samples
fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_steady_60hz() {
        let t0 = Instant::now();
        let mut telemetry = ThroughputTelemetry::new(t0);

        let mut report = None;
        for i in 1..=61u64 {
            // 16ms + 2/3ms per frame, rounded to whole micros
            let at = t0 + Duration::from_micros(i * 16_667);
            if let Some(r) = telemetry.record(at) {
                report = Some(r);
            }
        }

        let report = report.expect("window should have rolled over");
        assert_eq!(report.sample_count, 59);
        assert_eq!(report.average_interval, Duration::from_micros(16_667));
        assert!((report.frames_per_second() - 60.0).abs() < 0.1);
    }

    #[test]
    fn test_first_frame_is_not_an_interval() {
        let t0 = Instant::now();
        let mut telemetry = ThroughputTelemetry::new(t0);

        assert_eq!(telemetry.record(t0 + ms(10)), None);
        assert_eq!(telemetry.pending_samples(), 0);
        assert_eq!(telemetry.record(t0 + ms(30)), None);
        assert_eq!(telemetry.pending_samples(), 1);
    }

    #[test]
    fn test_zero_samples_at_rollover_emits_nothing() {
        let t0 = Instant::now();
        let mut telemetry = ThroughputTelemetry::new(t0);

        // First arrival lands past the window boundary: no interval yet
        assert_eq!(telemetry.record(t0 + ms(1500)), None);
        assert_eq!(telemetry.reports_emitted(), 0);
        assert_eq!(telemetry.last_report(), None);

        // The window was still reset
        assert_eq!(telemetry.record(t0 + ms(1600)), None);
        assert_eq!(telemetry.pending_samples(), 1);
    }

    #[test]
    fn test_window_resets_after_report() {
        let t0 = Instant::now();
        let mut telemetry = ThroughputTelemetry::new(t0);

        telemetry.record(t0 + ms(500));
        let report = telemetry.record(t0 + ms(1000)).unwrap();
        assert_eq!(report.sample_count, 1);
        assert_eq!(report.average_interval, ms(500));
        assert_eq!(telemetry.pending_samples(), 0);

        // Next report needs another full window
        assert_eq!(telemetry.record(t0 + ms(1900)), None);
        let report = telemetry.record(t0 + ms(2000)).unwrap();
        assert_eq!(report.sample_count, 2);
        assert_eq!(report.average_interval, ms(500));
        assert_eq!(telemetry.reports_emitted(), 2);
    }

    proptest::proptest! {
        #[test]
        fn prop_every_interval_is_counted_once(gaps in proptest::collection::vec(0u64..1500, 1..200)) {
            let t0 = Instant::now();
            let mut telemetry = ThroughputTelemetry::new(t0);
            let mut at = t0;
            let mut reported = 0u64;

            for gap in &gaps {
                at += ms(*gap);
                if let Some(report) = telemetry.record(at) {
                    proptest::prop_assert!(report.sample_count > 0);
                    reported += report.sample_count;
                }
            }

            proptest::prop_assert_eq!(reported + telemetry.pending_samples(), gaps.len() as u64 - 1);
        }
    }

    #[test]
    fn test_reset_keeps_window_length() {
        let t0 = Instant::now();
        let mut telemetry = ThroughputTelemetry::with_window(t0, ms(100));
        telemetry.record(t0 + ms(10));
        telemetry.reset(t0 + ms(20));

        assert_eq!(telemetry.pending_samples(), 0);
        telemetry.record(t0 + ms(30));
        assert!(telemetry.record(t0 + ms(120)).is_some());
    }

    #[test]
    fn test_average_beyond_u32_counts() {
        let count = 1u64 << 32;
        let total = Duration::from_secs(count * 2);
        assert_eq!(average(total, count), Duration::from_secs(2));
        assert_eq!(average(ms(90), 3), ms(30));
        assert_eq!(average(ms(90), 0), Duration::ZERO);
    }
}
