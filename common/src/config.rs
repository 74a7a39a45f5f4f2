use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Frames that may wait between capture and processing. Anything beyond
    /// this is dropped, never queued.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Stop after this many captured frames. Runs until interrupted if unset.
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Horizontal travel of the synthetic camera's moving block, px/frame.
    #[serde(default = "default_speed")]
    pub speed: u32,
}

/// Parameters of the motion-highlight pass.
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    /// Pixels whose frame-to-frame difference is strictly greater than this
    /// count as changed.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_contour_color")]
    pub contour_color: [u8; 4],
    #[serde(default = "default_contour_thickness")]
    pub contour_thickness: u32,
    #[serde(default = "default_box_color")]
    pub box_color: [u8; 4],
    #[serde(default = "default_box_thickness")]
    pub box_thickness: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            queue_depth: default_queue_depth(),
            max_frames: None,
            speed: default_speed(),
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            contour_color: default_contour_color(),
            contour_thickness: default_contour_thickness(),
            box_color: default_box_color(),
            box_thickness: default_box_thickness(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CameraConfig {
    /// Time between captures. `None` when `fps` does not give a positive,
    /// representable period.
    pub fn frame_period(&self) -> Option<Duration> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.fps)
            .ok()
            .filter(|period| !period.is_zero())
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera.width, self.camera.height
            )));
        }
        if self.camera.frame_period().is_none() {
            return Err(ConfigError::Invalid(format!(
                "camera fps must give a non-zero frame period, got {}",
                self.camera.fps
            )));
        }
        if self.camera.queue_depth == 0 {
            return Err(ConfigError::Invalid("camera queue_depth must be at least 1".into()));
        }
        if self.highlight.contour_thickness == 0 || self.highlight.box_thickness == 0 {
            return Err(ConfigError::Invalid(
                "stroke thickness must be at least 1 px".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_fps() -> f64 {
    30.0
}
fn default_queue_depth() -> usize {
    1
}
fn default_speed() -> u32 {
    8
}
fn default_threshold() -> u8 {
    40
}
fn default_contour_color() -> [u8; 4] {
    [255, 0, 0, 255]
}
fn default_contour_thickness() -> u32 {
    4
}
fn default_box_color() -> [u8; 4] {
    [0, 0, 255, 255]
}
fn default_box_thickness() -> u32 {
    3
}
fn default_log_level() -> String {
    "info".into()
}
