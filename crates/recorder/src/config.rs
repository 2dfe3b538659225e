use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use common::{RecorderError, Result};

use crate::encoder::FfmpegCommand;

pub const DEFAULT_FPS: u32 = 15;
pub const DEFAULT_FORMAT: &str = "avi";

/// Called with the encoder command right before it runs, once per encode.
pub type BeforeEncodeHook = Arc<dyn Fn(&mut FfmpegCommand) + Send + Sync>;

#[derive(Clone)]
pub struct RecorderConfig {
    pub fps: u32,
    pub working_dir: PathBuf,
    pub format: String,
    pub aspect: Option<String>,
    pub size: Option<String>,
    pub before_encode: Option<BeforeEncodeHook>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            working_dir: storage::default_working_dir(),
            format: DEFAULT_FORMAT.to_string(),
            aspect: None,
            size: None,
            before_encode: None,
        }
    }
}

impl fmt::Debug for RecorderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderConfig")
            .field("fps", &self.fps)
            .field("working_dir", &self.working_dir)
            .field("format", &self.format)
            .field("aspect", &self.aspect)
            .field("size", &self.size)
            .field("before_encode", &self.before_encode.is_some())
            .finish()
    }
}

impl RecorderConfig {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_aspect(mut self, aspect: impl Into<String>) -> Self {
        self.aspect = Some(aspect.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_before_encode<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut FfmpegCommand) + Send + Sync + 'static,
    {
        self.before_encode = Some(Arc::new(hook));
        self
    }

    /// Target time between two captures.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }

    /// Checks the values and makes the working directory absolute.
    pub(crate) fn validated(mut self) -> Result<Self> {
        if self.fps == 0 {
            return Err(RecorderError::Config("fps must be greater than zero".into()));
        }
        if self.format.trim().is_empty() {
            return Err(RecorderError::Config("format must not be empty".into()));
        }
        self.working_dir = absolute(&self.working_dir)?;
        Ok(self)
    }
}

pub(crate) fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| RecorderError::filesystem(path, e))
}
