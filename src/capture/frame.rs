use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::pipeline::FrameStorage;

/// Frame handle with zero-copy semantics
///
/// Cloning or moving a frame never copies pixel data. An empty frame (no data,
/// no timestamp) is a reusable shell.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: FrameMetadata,

    /// Capture timestamp for latency tracking
    pub timestamp: Option<Instant>,
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
    Nv12,
}

impl PixelFormat {
    /// Bytes per pixel for packed raw formats, `None` for compressed or planar ones
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Yuyv4 => Some(2),
            PixelFormat::Mjpeg | PixelFormat::Nv12 => None,
        }
    }
}

impl Frame {
    pub fn new(data: Bytes, meta: FrameMetadata) -> Self {
        Self {
            data,
            meta,
            timestamp: Some(Instant::now()),
        }
    }

    /// True for a shell whose data has been released
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.timestamp.is_none()
    }

    /// Time since capture, if the frame carries a timestamp
    pub fn age(&self) -> Option<Duration> {
        self.timestamp.map(|t| t.elapsed())
    }
}

impl FrameStorage for Frame {
    fn try_alloc() -> Result<Self> {
        Ok(Self::default())
    }

    fn unref(&mut self) {
        // Drops our reference only; other clones of the data stay valid
        self.data = Bytes::new();
        self.meta = FrameMetadata::default();
        self.timestamp = None;
    }
}
