//! Single-slot, double-buffered frame relay between a decoder and a renderer
//!
//! One producer thread offers frames, one consumer thread takes them. Only the
//! most recent frame is kept: offers made between two takes overwrite the
//! pending slot and are reported to the consumer as skipped frames.
//!
//! ```text
//! Decoder Thread                  FrameRelay                    Renderer Thread
//!     │                               │                               │
//! [offer(&mut frame)]──(swap)──►[pending slot]                        │
//!     │◄──── empty shell ─────────────│                               │
//!     │                         [listener]──────(notify)────────►[take()]
//!     │                               │◄────────(swap)──────────[consumer slot]
//! ```
//!
//! In wait-for-consumer mode an offer blocks while the previous frame is still
//! pending, so no frame is ever dropped. `interrupt` releases a blocked producer
//! for good; the flag is never cleared.

use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::stats::{RelayStats, RelayStatsSnapshot};
use crate::error::{RelayError, Result};

/// Storage behind a frame handle.
///
/// The relay never looks inside a frame. It only swaps handles between its
/// slots and drops the referenced data of a slot before reusing it.
pub trait FrameStorage: Send {
    /// Allocate an empty frame shell.
    fn try_alloc() -> Result<Self>
    where
        Self: Sized;

    /// Release the referenced data, leaving a reusable empty shell.
    fn unref(&mut self);
}

/// Notified on the producer thread when a new frame becomes available.
///
/// Exactly one `take` must follow each notification. The listener runs with the
/// relay unlocked but must not call back into `offer` on the same thread.
pub trait FrameListener: Send + Sync {
    fn on_frame_available(&self);
}

impl<T> FrameListener for T
where
    T: Fn() + Send + Sync,
{
    fn on_frame_available(&self) {
        self()
    }
}

struct PendingSlot<F> {
    frame: F,
    /// No frame awaits consumption
    consumed: bool,
    /// Frames overwritten before being taken, since the last take
    skipped: u32,
    interrupted: bool,
}

/// State shared by the producer and consumer halves.
pub struct FrameRelay<F> {
    pending: Mutex<PendingSlot<F>>,
    /// Present only in wait-for-consumer mode
    pending_consumed: Option<Condvar>,
    listener: Box<dyn FrameListener>,
    stats: RelayStats,
}

impl<F: FrameStorage> FrameRelay<F> {
    /// Create a relay and split it into its producer and consumer halves.
    ///
    /// With `wait_consumer` set, `offer` blocks until the previously offered
    /// frame has been taken (or the relay is interrupted). Otherwise it never
    /// blocks and overwritten frames are counted as skipped.
    ///
    /// Fails with `RelayError::Allocation` naming the slot that could not be
    /// allocated; a slot allocated before the failure is released before
    /// returning.
    pub fn new(
        wait_consumer: bool,
        listener: impl FrameListener + 'static,
    ) -> Result<(FrameProducer<F>, FrameConsumer<F>)> {
        let pending_frame = Self::alloc_slot("pending")?;
        let consumer_frame = Self::alloc_slot("consumer")?;

        let relay = Arc::new(Self {
            pending: Mutex::new(PendingSlot {
                frame: pending_frame,
                // nothing has been offered yet, so there is nothing to consume
                consumed: true,
                skipped: 0,
                interrupted: false,
            }),
            pending_consumed: wait_consumer.then(Condvar::new),
            listener: Box::new(listener),
            stats: RelayStats::default(),
        });

        debug!(wait_consumer, "Frame relay created");

        Ok((
            FrameProducer {
                relay: Arc::clone(&relay),
            },
            FrameConsumer {
                relay,
                frame: consumer_frame,
            },
        ))
    }

    fn alloc_slot(slot: &'static str) -> Result<F> {
        F::try_alloc().map_err(|e| {
            warn!(slot, error = %e, "Frame slot allocation failed");
            RelayError::Allocation { slot }
        })
    }
}

impl<F> FrameRelay<F> {
    fn lock(&self) -> MutexGuard<'_, PendingSlot<F>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interrupt(&self) {
        let Some(cond) = &self.pending_consumed else {
            // offer never blocks in this mode
            return;
        };

        let already = mem::replace(&mut self.lock().interrupted, true);
        cond.notify_one();

        if !already {
            self.stats.record_interrupt();
            debug!("Frame relay interrupted");
        }
    }

    fn is_interrupted(&self) -> bool {
        self.lock().interrupted
    }
}

/// Producer half. Owned by the decoder thread.
pub struct FrameProducer<F> {
    relay: Arc<FrameRelay<F>>,
}

impl<F: FrameStorage> FrameProducer<F> {
    /// Make `frame` the pending frame.
    ///
    /// The handle is swapped, not copied: on return `frame` holds the previous
    /// pending shell with its data released, ready for reuse.
    ///
    /// Returns `true` if the previous pending frame was overwritten without
    /// being taken. In that case the listener is not called, since the earlier
    /// notification still owes exactly one take.
    pub fn offer(&mut self, frame: &mut F) -> bool {
        let relay = &*self.relay;

        let skipped = {
            let mut slot = relay.lock();
            if let Some(cond) = &relay.pending_consumed {
                slot = cond
                    .wait_while(slot, |slot| !slot.consumed && !slot.interrupted)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            slot.frame.unref();
            mem::swap(frame, &mut slot.frame);

            let skipped = !slot.consumed;
            if skipped {
                slot.skipped = slot.skipped.saturating_add(1);
            }
            slot.consumed = false;
            skipped
        };

        relay.stats.record_offer(skipped);

        if !skipped {
            relay.listener.on_frame_available();
        }

        skipped
    }
}

impl<F> FrameProducer<F> {
    /// Release a producer blocked in `offer`, permanently.
    pub fn interrupt(&self) {
        self.relay.interrupt();
    }

    pub fn interrupter(&self) -> Interrupter<F> {
        Interrupter {
            relay: Arc::clone(&self.relay),
        }
    }

    pub fn is_waiting_for_consumer(&self) -> bool {
        self.relay.pending_consumed.is_some()
    }

    pub fn is_interrupted(&self) -> bool {
        self.relay.is_interrupted()
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.relay.stats.snapshot()
    }
}

/// Consumer half. Owned by the renderer thread, together with the frame it
/// currently exposes.
pub struct FrameConsumer<F> {
    relay: Arc<FrameRelay<F>>,
    frame: F,
}

impl<F: FrameStorage> FrameConsumer<F> {
    /// Take the pending frame.
    ///
    /// Returns the most recently offered frame and the number of frames that
    /// were overwritten since the previous take.
    ///
    /// # Panics
    ///
    /// Panics if no frame is pending. `take` must only be called once per
    /// availability notification.
    pub fn take(&mut self) -> (&F, u32) {
        let relay = &*self.relay;

        let skipped = {
            let mut slot = relay.lock();
            assert!(!slot.consumed, "take() called with no pending frame");
            slot.consumed = true;

            mem::swap(&mut self.frame, &mut slot.frame);
            slot.frame.unref();

            if let Some(cond) = &relay.pending_consumed {
                cond.notify_one();
            }

            mem::take(&mut slot.skipped)
        };

        relay.stats.record_take();

        (&self.frame, skipped)
    }
}

impl<F> FrameConsumer<F> {
    /// The frame returned by the last `take`, or an empty shell before the first.
    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Release a producer blocked in `offer`, permanently.
    pub fn interrupt(&self) {
        self.relay.interrupt();
    }

    pub fn interrupter(&self) -> Interrupter<F> {
        Interrupter {
            relay: Arc::clone(&self.relay),
        }
    }

    pub fn is_waiting_for_consumer(&self) -> bool {
        self.relay.pending_consumed.is_some()
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.relay.stats.snapshot()
    }
}

/// Handle for interrupting a relay from a third thread (e.g. shutdown).
pub struct Interrupter<F> {
    relay: Arc<FrameRelay<F>>,
}

impl<F> Interrupter<F> {
    pub fn interrupt(&self) {
        self.relay.interrupt();
    }

    pub fn is_interrupted(&self) -> bool {
        self.relay.is_interrupted()
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.relay.stats.snapshot()
    }
}

impl<F> Clone for Interrupter<F> {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
        }
    }
}
