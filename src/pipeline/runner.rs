//! Decoder and renderer threads wired through a frame relay

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::info;

use super::relay::{FrameRelay, Interrupter};
use super::stats::RelayStatsSnapshot;
use crate::capture::{DecodeSummary, Frame, SyntheticDecoder};
use crate::display::{RenderSummary, Renderer};
use crate::error::{RelayError, Result};
use crate::utils::spawn_pinned;
use crate::Config;

/// Totals from both threads and the relay between them
#[derive(Debug, Clone, Copy)]
pub struct PipelineSummary {
    pub decoder: DecodeSummary,
    pub renderer: RenderSummary,
    pub relay: RelayStatsSnapshot,
}

/// Running decoder and renderer threads
pub struct PipelineThreads {
    stop: Arc<AtomicBool>,
    interrupter: Interrupter<Frame>,
    decoder: JoinHandle<DecodeSummary>,
    renderer: JoinHandle<RenderSummary>,
}

/// Start the decoder and renderer threads
pub fn spawn(config: &Config) -> Result<PipelineThreads> {
    config.validate()?;

    let decoder = SyntheticDecoder::new(config.capture.clone())?;
    let renderer = Renderer::new(config.display.clone());

    // At most one notification is ever outstanding: the next one is only sent
    // after the renderer has taken the frame announced by the previous one.
    let (notify_tx, notify_rx) = flume::bounded(1);
    let (producer, consumer) = FrameRelay::<Frame>::new(config.pipeline.wait_consumer, move || {
        // Receiver gone means the renderer already stopped
        let _ = notify_tx.send(());
    })?;

    let interrupter = producer.interrupter();
    let stop = Arc::new(AtomicBool::new(false));

    let renderer = {
        let renderer_stop = Arc::clone(&stop);
        spawn_pinned("renderer", config.display.pin_core, move || {
            renderer.run(consumer, notify_rx, &renderer_stop)
        })?
    };

    let decoder = {
        let decoder_stop = Arc::clone(&stop);
        match spawn_pinned("decoder", config.capture.pin_core, move || {
            decoder.run(producer, &decoder_stop)
        }) {
            Ok(handle) => handle,
            Err(e) => {
                stop.store(true, Ordering::Release);
                let _ = renderer.join();
                return Err(e.into());
            }
        }
    };

    info!(
        wait_consumer = config.pipeline.wait_consumer,
        "Pipeline started"
    );

    Ok(PipelineThreads {
        stop,
        interrupter,
        decoder,
        renderer,
    })
}

impl PipelineThreads {
    /// True once the decoder hit its frame limit (or stopped)
    pub fn is_decoder_finished(&self) -> bool {
        self.decoder.is_finished()
    }

    /// Ask both threads to stop and release a decoder blocked on the renderer
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.interrupter.interrupt();
    }

    pub fn relay_stats(&self) -> RelayStatsSnapshot {
        self.interrupter.stats()
    }

    /// Stop and join both threads.
    ///
    /// Frames announced to the renderer before the stop are still presented.
    pub fn join(self) -> Result<PipelineSummary> {
        self.stop();

        let decoder = self
            .decoder
            .join()
            .map_err(|_| RelayError::ThreadPanicked("decoder"))?;
        let renderer = self
            .renderer
            .join()
            .map_err(|_| RelayError::ThreadPanicked("renderer"))?;

        Ok(PipelineSummary {
            decoder,
            renderer,
            relay: self.interrupter.stats(),
        })
    }
}
