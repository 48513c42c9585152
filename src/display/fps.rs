//! Rendered/skipped frame rate reporting

use std::time::{Duration, Instant};

use tracing::info;

/// Counts accumulated over one reporting interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsReport {
    pub rendered: u32,
    pub skipped: u32,
    pub interval: Duration,
}

impl FpsReport {
    pub fn fps(&self) -> f64 {
        self.rendered as f64 / self.interval.as_secs_f64()
    }
}

/// Reports rendered and skipped frames once per interval.
///
/// Driven from the renderer thread; counting while stopped is ignored.
pub struct FpsCounter {
    interval: Duration,
    started: bool,
    next_report: Instant,
    rendered: u32,
    skipped: u32,
}

impl FpsCounter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: false,
            next_report: Instant::now(),
            rendered: 0,
            skipped: 0,
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn add_rendered_frame(&mut self) -> Option<FpsReport> {
        self.add_at(1, 0, Instant::now())
    }

    pub fn add_skipped_frames(&mut self, skipped: u32) -> Option<FpsReport> {
        self.add_at(0, skipped, Instant::now())
    }

    /// Report an elapsed interval even when no frame arrives
    pub fn tick(&mut self) -> Option<FpsReport> {
        self.add_at(0, 0, Instant::now())
    }

    fn start_at(&mut self, now: Instant) {
        self.started = true;
        self.next_report = now + self.interval;
        self.rendered = 0;
        self.skipped = 0;
    }

    fn add_at(&mut self, rendered: u32, skipped: u32, now: Instant) -> Option<FpsReport> {
        if !self.started {
            return None;
        }

        // Close the elapsed interval before counting into the next one
        let report = self.check_interval(now);
        self.rendered += rendered;
        self.skipped += skipped;
        report
    }

    fn check_interval(&mut self, now: Instant) -> Option<FpsReport> {
        if now < self.next_report {
            return None;
        }

        let report = FpsReport {
            rendered: self.rendered,
            skipped: self.skipped,
            interval: self.interval,
        };

        if report.skipped > 0 {
            info!(
                "{:.1} fps (+{} frames skipped)",
                report.fps(),
                report.skipped
            );
        } else {
            info!("{:.1} fps", report.fps());
        }

        self.rendered = 0;
        self.skipped = 0;
        self.next_report = now + self.interval;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn ignores_frames_while_stopped() {
        let mut counter = FpsCounter::new(SECOND);
        let t0 = Instant::now();
        assert_eq!(counter.add_at(5, 2, t0 + SECOND * 3), None);

        counter.start_at(t0);
        counter.stop();
        assert!(!counter.is_started());
        assert_eq!(counter.add_at(1, 0, t0 + SECOND * 2), None);
    }

    #[test]
    fn reports_previous_interval_once_expired() {
        let mut counter = FpsCounter::new(SECOND);
        let t0 = Instant::now();
        counter.start_at(t0);

        assert_eq!(counter.add_at(1, 0, t0 + Duration::from_millis(100)), None);
        assert_eq!(counter.add_at(1, 3, t0 + Duration::from_millis(500)), None);
        assert_eq!(counter.add_at(1, 0, t0 + Duration::from_millis(900)), None);

        let report = counter
            .add_at(1, 0, t0 + Duration::from_millis(1200))
            .unwrap();
        assert_eq!(report.rendered, 3);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.fps(), 3.0);

        // the frame that closed the interval counts toward the next one
        let report = counter
            .add_at(0, 0, t0 + Duration::from_millis(2200))
            .unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn restart_clears_counts() {
        let mut counter = FpsCounter::new(SECOND);
        let t0 = Instant::now();
        counter.start_at(t0);
        counter.add_at(4, 4, t0);

        counter.start_at(t0);
        let report = counter.add_at(0, 0, t0 + SECOND).unwrap();
        assert_eq!((report.rendered, report.skipped), (0, 0));
    }
}
