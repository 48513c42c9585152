//! Synthetic decoder feeding a frame relay
//!
//! Generates a moving test pattern at a fixed rate. Stands in for a real
//! decoder: whatever it produces is handed to the renderer through the relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use tracing::{info, instrument, trace};

use super::frame::Frame;
use crate::error::{RelayError, Result};
use crate::pipeline::FrameProducer;
use crate::CaptureConfig;

/// Totals reported when the decoder stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub frames_produced: u64,
    /// Frames this decoder overwrote before the renderer took them
    pub frames_skipped: u64,
}

pub struct SyntheticDecoder {
    config: CaptureConfig,
    bytes_per_pixel: u32,
    sequence: u64,
    epoch: Instant,
}

impl SyntheticDecoder {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let bytes_per_pixel = config.format.bytes_per_pixel().ok_or_else(|| {
            RelayError::InvalidConfig(format!("cannot synthesize {:?} frames", config.format))
        })?;

        info!(
            "Synthetic decoder: {}x{} {:?} @ {}fps",
            config.width, config.height, config.format, config.fps
        );

        Ok(Self {
            config,
            bytes_per_pixel,
            sequence: 0,
            epoch: Instant::now(),
        })
    }

    /// Decode the next frame into `frame`, refilling the handle in place.
    ///
    /// Meant for the empty shells `offer` hands back; any data `frame` still
    /// referenced is released.
    pub fn decode_next(&mut self, frame: &mut Frame) {
        self.sequence += 1;

        let width = self.config.width;
        let height = self.config.height;
        let bpp = self.bytes_per_pixel;
        let stride = width * bpp;
        let shift = self.sequence as u32;

        // Diagonal gradient scrolling one pixel per frame
        let mut data = Vec::with_capacity((stride * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let value = (x + y).wrapping_add(shift) as u8;
                for channel in 0..bpp {
                    data.push(value.wrapping_add((channel * 85) as u8));
                }
            }
        }

        let meta = &mut frame.meta;
        meta.sequence = self.sequence;
        meta.width = width;
        meta.height = height;
        meta.stride = stride;
        meta.format = self.config.format;
        meta.device_timestamp = Some(self.epoch.elapsed());

        frame.data = Bytes::from(data);
        frame.timestamp = Some(Instant::now());
    }

    /// Produce frames into `producer` until `stop` is set or the frame limit is reached
    #[instrument(skip_all, name = "decoder")]
    pub fn run(mut self, mut producer: FrameProducer<Frame>, stop: &AtomicBool) -> DecodeSummary {
        let interval = self.config.frame_interval();
        let mut summary = DecodeSummary::default();
        let mut frame = Frame::default();
        let mut next_deadline = Instant::now();

        info!(
            wait_consumer = producer.is_waiting_for_consumer(),
            "Decoder started"
        );

        while !stop.load(Ordering::Acquire) {
            if self
                .config
                .frame_limit
                .is_some_and(|limit| summary.frames_produced >= limit)
            {
                info!("Frame limit reached");
                break;
            }

            self.decode_next(&mut frame);
            let sequence = frame.meta.sequence;

            // `frame` comes back as an empty shell
            if producer.offer(&mut frame) {
                summary.frames_skipped += 1;
                trace!(sequence, "Previous frame dropped before display");
            }
            summary.frames_produced += 1;

            next_deadline += interval;
            let now = Instant::now();
            match next_deadline.checked_duration_since(now) {
                Some(wait) => thread::sleep(wait),
                // fell behind (e.g. blocked on the renderer); don't burst to catch up
                None => next_deadline = now,
            }
        }

        info!(
            produced = summary.frames_produced,
            skipped = summary.frames_skipped,
            "Decoder stopped"
        );
        summary
    }
}
