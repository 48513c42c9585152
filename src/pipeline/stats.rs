//! Cumulative hand-off counters for a frame relay

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// Counters shared by both halves of a relay.
///
/// These are observational only. The relay's own skip counter (reset on every
/// take) lives under the relay mutex and is what the consumer is told about.
#[derive(Default)]
pub(crate) struct RelayStats {
    inner: CachePadded<Counters>,
}

#[derive(Default)]
struct Counters {
    frames_offered: AtomicU64,
    frames_taken: AtomicU64,
    frames_skipped: AtomicU64,
    interrupts: AtomicU64,
}

/// Point-in-time copy of the relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    pub frames_offered: u64,
    pub frames_taken: u64,
    pub frames_skipped: u64,
    pub interrupts: u64,
}

impl RelayStats {
    pub(crate) fn record_offer(&self, skipped: bool) {
        self.inner.frames_offered.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_frames_offered_total").increment(1);
        if skipped {
            self.inner.frames_skipped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("relay_frames_skipped_total").increment(1);
        }
    }

    pub(crate) fn record_take(&self) {
        self.inner.frames_taken.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_frames_taken_total").increment(1);
    }

    pub(crate) fn record_interrupt(&self) {
        self.inner.interrupts.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_interrupts_total").increment(1);
    }

    pub(crate) fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            frames_offered: self.inner.frames_offered.load(Ordering::Relaxed),
            frames_taken: self.inner.frames_taken.load(Ordering::Relaxed),
            frames_skipped: self.inner.frames_skipped.load(Ordering::Relaxed),
            interrupts: self.inner.interrupts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_offers_skips_and_takes() {
        let stats = RelayStats::default();
        stats.record_offer(false);
        stats.record_offer(true);
        stats.record_offer(true);
        stats.record_take();
        stats.record_interrupt();

        assert_eq!(
            stats.snapshot(),
            RelayStatsSnapshot {
                frames_offered: 3,
                frames_taken: 1,
                frames_skipped: 2,
                interrupts: 1,
            }
        );
    }
}
