//! Headless renderer consuming a frame relay
//!
//! Waits for availability notifications, takes exactly one frame per
//! notification and "presents" it: validates its layout, checksums the pixels
//! and sleeps for the configured render cost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, instrument, warn};

use super::fps::FpsCounter;
use crate::capture::Frame;
use crate::pipeline::FrameConsumer;
use crate::DisplayConfig;

/// How often the render loop re-checks the stop flag while idle
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Totals reported when the renderer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub frames_rendered: u64,
    /// Frames reported skipped by the relay
    pub frames_skipped: u64,
    /// Frames whose sequence did not advance past the previous one
    pub out_of_order: u64,
    pub malformed: u64,
    pub last_sequence: Option<u64>,
    /// Running checksum over all presented pixels
    pub checksum: u64,
}

pub struct Renderer {
    config: DisplayConfig,
    fps: FpsCounter,
    summary: RenderSummary,
}

impl Renderer {
    pub fn new(config: DisplayConfig) -> Self {
        let fps = FpsCounter::new(config.fps_report_interval());
        Self {
            config,
            fps,
            summary: RenderSummary::default(),
        }
    }

    /// Present one frame per notification until `stop` is set.
    ///
    /// Frames announced before the stop are still presented. On exit the relay
    /// is interrupted so a producer blocked on this renderer is released.
    #[instrument(skip_all, name = "renderer")]
    pub fn run(
        mut self,
        mut consumer: FrameConsumer<Frame>,
        notifications: Receiver<()>,
        stop: &AtomicBool,
    ) -> RenderSummary {
        info!(
            wait_consumer = consumer.is_waiting_for_consumer(),
            render_delay_ms = self.config.render_delay_ms,
            "Renderer started"
        );
        self.fps.start();

        while !stop.load(Ordering::Acquire) {
            match notifications.recv_timeout(POLL_INTERVAL) {
                Ok(()) => self.take_and_present(&mut consumer),
                Err(RecvTimeoutError::Timeout) => {
                    self.fps.tick();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Notification channel closed");
                    break;
                }
            }
        }

        // one take is owed per notification already sent
        while notifications.try_recv().is_ok() {
            self.take_and_present(&mut consumer);
        }

        consumer.interrupt();
        self.fps.stop();

        info!(
            rendered = self.summary.frames_rendered,
            skipped = self.summary.frames_skipped,
            "Renderer stopped"
        );
        self.summary
    }

    fn take_and_present(&mut self, consumer: &mut FrameConsumer<Frame>) {
        let (frame, skipped) = consumer.take();
        if skipped > 0 {
            self.summary.frames_skipped += u64::from(skipped);
            self.fps.add_skipped_frames(skipped);
        }
        self.present(frame);
    }

    /// Present a frame taken from the relay
    pub fn present(&mut self, frame: &Frame) {
        let render_start = Instant::now();
        let meta = &frame.meta;

        if let Some(last) = self.summary.last_sequence {
            if meta.sequence <= last {
                error!(
                    sequence = meta.sequence,
                    last, "Frame older than the one already presented"
                );
                self.summary.out_of_order += 1;
            }
        }
        self.summary.last_sequence = Some(meta.sequence);

        let expected_len = meta.stride as usize * meta.height as usize;
        if frame.data.len() != expected_len {
            warn!(
                sequence = meta.sequence,
                len = frame.data.len(),
                expected_len,
                "Malformed frame, not presented"
            );
            self.summary.malformed += 1;
            return;
        }

        self.summary.checksum = frame
            .data
            .iter()
            .fold(self.summary.checksum, |acc, &b| acc.wrapping_add(u64::from(b)));

        if let Some(latency) = frame.age() {
            metrics::histogram!("frame_latency_ms").record(latency.as_millis() as f64);
        }

        let delay = self.config.render_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.summary.frames_rendered += 1;
        self.fps.add_rendered_frame();

        let render_time = render_start.elapsed();
        metrics::histogram!("render_time_us").record(render_time.as_micros() as f64);
    }

    pub fn summary(&self) -> &RenderSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::{FrameMetadata, PixelFormat};
    use bytes::Bytes;

    fn display_config() -> DisplayConfig {
        DisplayConfig {
            render_delay_ms: 0,
            ..Default::default()
        }
    }

    fn frame(sequence: u64, data: &'static [u8]) -> Frame {
        Frame::new(
            Bytes::from_static(data),
            FrameMetadata {
                sequence,
                width: 1,
                height: 1,
                stride: 3,
                format: PixelFormat::Rgb24,
                device_timestamp: None,
            },
        )
    }

    #[test]
    fn presents_and_checksums_frames() {
        let mut renderer = Renderer::new(display_config());
        renderer.present(&frame(1, &[1, 2, 3]));
        renderer.present(&frame(2, &[4, 5, 6]));

        let summary = renderer.summary();
        assert_eq!(summary.frames_rendered, 2);
        assert_eq!(summary.checksum, 21);
        assert_eq!(summary.last_sequence, Some(2));
        assert_eq!(summary.out_of_order, 0);
    }

    #[test]
    fn flags_stale_and_malformed_frames() {
        let mut renderer = Renderer::new(display_config());
        renderer.present(&frame(5, &[0, 0, 0]));
        renderer.present(&frame(4, &[0, 0, 0]));
        renderer.present(&frame(6, &[0, 0]));

        let summary = renderer.summary();
        assert_eq!(summary.out_of_order, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.frames_rendered, 2);
    }
}
