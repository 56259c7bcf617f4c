//! Pipeline configuration

use std::time::Duration;

use crate::detect::{Mode, WindowPolicy, WindowSpec};

use super::encode::EncodeOptions;

/// Frame processing options
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detection sub-window (inactive = full frame)
    pub window: WindowSpec,

    /// What happens after the window fails to fit a frame
    pub window_policy: WindowPolicy,

    /// Cadence used when the source reports no frame rate
    pub default_fps: f64,

    /// Downsample and compression settings
    pub encode: EncodeOptions,

    /// Mode at startup
    pub initial_mode: Mode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: WindowSpec::full_frame(),
            window_policy: WindowPolicy::Sticky,
            default_fps: 30.0,
            encode: EncodeOptions::default(),
            initial_mode: Mode::Face,
        }
    }
}

impl PipelineConfig {
    /// Set the detection window
    pub fn window(mut self, spec: WindowSpec, policy: WindowPolicy) -> Self {
        self.window = spec;
        self.window_policy = policy;
        self
    }

    /// Set the fallback frame rate
    pub fn default_fps(mut self, fps: f64) -> Self {
        self.default_fps = fps;
        self
    }

    /// Set the startup mode
    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = mode;
        self
    }

    /// Delay between ticks for a source rate, whole milliseconds
    pub fn frame_delay(&self, source_fps: Option<f64>) -> Duration {
        let fps = match source_fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ if self.default_fps.is_finite() && self.default_fps > 0.0 => self.default_fps,
            _ => 30.0,
        };
        Duration::from_millis((1000.0 / fps) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();

        assert!(!config.window.is_active());
        assert_eq!(config.window_policy, WindowPolicy::Sticky);
        assert_eq!(config.initial_mode, Mode::Face);
        assert_eq!(config.encode.jpeg_quality, 60);
    }

    #[test]
    fn test_frame_delay() {
        let config = PipelineConfig::default();

        assert_eq!(config.frame_delay(Some(25.0)), Duration::from_millis(40));
        assert_eq!(config.frame_delay(None), Duration::from_millis(33));
        assert_eq!(config.frame_delay(Some(0.0)), Duration::from_millis(33));
        assert_eq!(config.frame_delay(Some(f64::NAN)), Duration::from_millis(33));
    }

    #[test]
    fn test_builder_chaining() {
        let config = PipelineConfig::default()
            .window(WindowSpec::new(1, 2, 3, 4), WindowPolicy::PerFrame)
            .default_fps(10.0)
            .initial_mode(Mode::Body);

        assert_eq!(config.window, WindowSpec::new(1, 2, 3, 4));
        assert_eq!(config.window_policy, WindowPolicy::PerFrame);
        assert_eq!(config.frame_delay(None), Duration::from_millis(100));
        assert_eq!(config.initial_mode, Mode::Body);
    }
}
