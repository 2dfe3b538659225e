use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use common::async_trait::async_trait;
use common::log::{debug, error, info};
use common::tokio::process::Command;
use common::{RecorderError, Result};

/// Result of a finished encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutput {
    pub stdout: String,
    pub stderr: String,
    pub output_path: PathBuf,
}

/// An ffmpeg invocation turning a numbered image sequence into a video.
///
/// This is the handle passed to the `before_encode` hook, which may add
/// arbitrary options or change the output before the encoder runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    input: PathBuf,
    input_options: Vec<OsString>,
    output_options: Vec<OsString>,
    format: Option<String>,
    output: Option<PathBuf>,
}

impl FfmpegCommand {
    /// `input` is an image2 pattern such as `/tmp/frames/%010d.png`.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            input_options: vec!["-start_number".into(), "0".into()],
            output_options: Vec::new(),
            format: None,
            output: None,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn format_name(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Rate at which the image sequence is read.
    pub fn input_fps(&mut self, fps: u32) -> &mut Self {
        self.add_input_option("-framerate").add_input_option(fps.to_string())
    }

    pub fn output_fps(&mut self, fps: u32) -> &mut Self {
        self.add_output_option("-r").add_output_option(fps.to_string())
    }

    pub fn aspect(&mut self, aspect: &str) -> &mut Self {
        self.add_output_option("-aspect").add_output_option(aspect)
    }

    /// Output frame size, e.g. `640x480`.
    pub fn size(&mut self, size: &str) -> &mut Self {
        self.add_output_option("-s").add_output_option(size)
    }

    pub fn no_audio(&mut self) -> &mut Self {
        self.add_output_option("-an")
    }

    /// Container format passed as `-f`.
    pub fn format(&mut self, format: &str) -> &mut Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn output(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.output = Some(path.into());
        self
    }

    pub fn add_input_option(&mut self, option: impl Into<OsString>) -> &mut Self {
        self.input_options.push(option.into());
        self
    }

    pub fn add_output_option(&mut self, option: impl Into<OsString>) -> &mut Self {
        self.output_options.push(option.into());
        self
    }

    pub fn add_output_options<I, S>(&mut self, options: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.output_options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Full argument list, without the binary name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into()];
        args.extend(self.input_options.iter().cloned());
        args.push("-i".into());
        args.push(self.input.clone().into_os_string());
        args.extend(self.output_options.iter().cloned());
        if let Some(format) = &self.format {
            args.push("-f".into());
            args.push(format.into());
        }
        if let Some(output) = &self.output {
            args.push(output.clone().into_os_string());
        }
        args
    }
}

/// Runs an [`FfmpegCommand`] to completion.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn run(&self, command: &FfmpegCommand) -> Result<EncodeOutput>;
}

#[async_trait]
impl<T: VideoEncoder + ?Sized> VideoEncoder for Arc<T> {
    async fn run(&self, command: &FfmpegCommand) -> Result<EncodeOutput> {
        (**self).run(command).await
    }
}

/// Encoder backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn run(&self, command: &FfmpegCommand) -> Result<EncodeOutput> {
        let output_path = command
            .output_path()
            .ok_or_else(|| RecorderError::encoder("no output path set", ""))?
            .to_path_buf();
        let args = command.args();
        debug!("[encoder] {} {:?}", self.binary.display(), args);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RecorderError::encoder(
                    format!(
                        "{} not found. Please install ffmpeg and ensure it is available in your PATH.",
                        self.binary.display()
                    ),
                    "",
                ),
                _ => RecorderError::encoder(format!("failed to spawn {}: {}", self.binary.display(), e), ""),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("[encoder] ffmpeg exited with {}", output.status);
            return Err(RecorderError::Encoder {
                message: format!("ffmpeg exited with {}", output.status),
                stderr,
            });
        }

        info!("[encoder] wrote {}", output_path.display());
        Ok(EncodeOutput {
            stdout,
            stderr,
            output_path,
        })
    }
}

/// Whether `binary -version` can be executed.
pub fn ffmpeg_available(binary: impl AsRef<Path>) -> bool {
    std::process::Command::new(binary.as_ref())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
