pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod utils;

use std::path::Path;
use std::time::Duration;

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

pub use capture::Frame;
pub use error::{RelayError, Result};
pub use pipeline::{FrameConsumer, FrameListener, FrameProducer, FrameRelay, FrameStorage};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";
/// Configuration file used when `RELAY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

/// Producer side: the synthetic decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub frame_limit: Option<u64>, // Stop after this many frames
    pub pin_core: Option<usize>,
}

/// Consumer side: the headless renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub render_delay_ms: u64, // Simulated present cost
    pub fps_report_interval_ms: u64,
    pub pin_core: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Block the decoder until each frame is displayed instead of dropping it
    pub wait_consumer: bool,
    pub run_duration_secs: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 60,
            format: PixelFormat::Rgb24,
            frame_limit: None,
            pin_core: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            // 30fps renderer behind a 60fps decoder, so frames get skipped
            render_delay_ms: 33,
            fps_report_interval_ms: 1000,
            pin_core: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wait_consumer: false,
            run_duration_secs: None,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then `RELAY_*` environment overrides
    /// (e.g. `RELAY_PIPELINE__WAIT_CONSUMER=true`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `$RELAY_CONFIG`, falling back to `relay.toml`
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        let capture = &self.capture;
        if capture.width == 0 || capture.height == 0 {
            return Err(RelayError::InvalidConfig(format!(
                "capture size {}x{} is empty",
                capture.width, capture.height
            )));
        }
        if capture.fps == 0 {
            return Err(RelayError::InvalidConfig("capture fps must be > 0".into()));
        }
        if capture.format.bytes_per_pixel().is_none() {
            return Err(RelayError::InvalidConfig(format!(
                "synthetic decoder cannot produce {:?}",
                capture.format
            )));
        }
        if self.display.fps_report_interval_ms == 0 {
            return Err(RelayError::InvalidConfig(
                "fps report interval must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

impl DisplayConfig {
    pub fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    pub fn fps_report_interval(&self) -> Duration {
        Duration::from_millis(self.fps_report_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(!config.pipeline.wait_consumer);
        assert_eq!(config.capture.frame_interval(), Duration::from_secs(1) / 60);
    }

    #[test]
    fn rejects_zero_fps() {
        let mut config = Config::default();
        config.capture.fps = 0;
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_compressed_capture_format() {
        let mut config = Config::default();
        config.capture.format = PixelFormat::Mjpeg;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load("does-not-exist/relay.toml").unwrap();
        assert_eq!(config.capture.width, CaptureConfig::default().width);
    }

    #[test]
    fn loads_partial_toml() {
        let path = std::env::temp_dir().join(format!("relay-{}.toml", std::process::id()));
        fs::write(
            &path,
            "[pipeline]\nwait_consumer = true\n\n[capture]\nfps = 24\nformat = \"Bgr24\"\n",
        )
        .unwrap();

        let config = Config::load(&path);
        fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert!(config.pipeline.wait_consumer);
        assert_eq!(config.capture.fps, 24);
        assert_eq!(config.capture.format, PixelFormat::Bgr24);
        assert_eq!(config.capture.height, 240);
    }

    #[test]
    fn loads_invalid_toml_as_error() {
        let path = std::env::temp_dir().join(format!("relay-bad-{}.toml", std::process::id()));
        fs::write(&path, "[capture]\nfps = 0\n").unwrap();

        let config = Config::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(config, Err(RelayError::InvalidConfig(_))));
    }
}
