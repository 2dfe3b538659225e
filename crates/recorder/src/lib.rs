use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::async_trait::async_trait;
use common::log::{info, warn};
use common::{RecorderError, Result};
use storage::FrameStore;

pub mod capture;
pub mod config;
pub mod encoder;
pub mod recorder;
mod scheduler;
mod session;

pub use capture::{Base64Capture, CaptureSource, FnCapture};
pub use config::{BeforeEncodeHook, RecorderConfig};
pub use encoder::{EncodeOutput, FfmpegCommand, FfmpegEncoder, VideoEncoder, ffmpeg_available};
pub use recorder::Recorder;

use session::{Session, SharedSession, lock};

/// Records screenshots from a [`CaptureSource`] into numbered PNG files and
/// encodes them with a [`VideoEncoder`].
pub struct ScreenshotRecorder {
    config: RecorderConfig,
    store: FrameStore,
    source: Arc<dyn CaptureSource>,
    encoder: Arc<dyn VideoEncoder>,
    session: SharedSession,
}

impl ScreenshotRecorder {
    pub fn new<S>(source: S, config: RecorderConfig) -> Result<Self>
    where
        S: CaptureSource + 'static,
    {
        let config = config.validated()?;
        let store = FrameStore::new(config.working_dir.clone());
        let session = Session::new(config.frame_interval(), store.clone()).shared();

        Ok(Self {
            config,
            store,
            source: Arc::new(source),
            encoder: Arc::new(FfmpegEncoder::default()),
            session,
        })
    }

    pub fn with_encoder<E>(mut self, encoder: E) -> Self
    where
        E: VideoEncoder + 'static,
    {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn working_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Number of frames written since the last clear.
    pub fn frame_count(&self) -> u64 {
        lock(&self.session).frame
    }

    /// The capture failure that ended the last run, if neither `stop()` nor
    /// `start()` has reported it yet.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.session).failure.as_ref().map(ToString::to_string)
    }

    fn build_command(&self, output: PathBuf) -> FfmpegCommand {
        let mut command = FfmpegCommand::new(self.store.input_pattern());
        command
            .input_fps(self.config.fps)
            .no_audio()
            .output_fps(self.config.fps)
            .format(&self.config.format);
        if let Some(aspect) = &self.config.aspect {
            command.aspect(aspect);
        }
        if let Some(size) = &self.config.size {
            command.size(size);
        }
        command.output(output);
        command
    }
}

#[async_trait]
impl Recorder for ScreenshotRecorder {
    fn start(&self) -> Result<()> {
        if common::tokio::runtime::Handle::try_current().is_err() {
            return Err(RecorderError::NoRuntime);
        }
        self.store.ensure_dir()?;

        let mut state = lock(&self.session);
        if state.running {
            return Ok(());
        }
        // The previous run died and nobody called stop() since.
        if let Some(err) = state.failure.take() {
            return Err(err);
        }
        state.running = true;
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        info!(
            "[recorder] recording at {} fps into {}",
            self.config.fps,
            self.store.dir().display()
        );
        scheduler::spawn_iteration(self.session.clone(), self.source.clone(), generation);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = lock(&self.session);
        if state.running {
            state.running = false;
            state.cancel_timer();
            info!("[recorder] stopped after {} frames", state.frame);
        }
        match state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_recording(&self) -> bool {
        lock(&self.session).running
    }

    async fn encode(&self, output: &Path) -> Result<EncodeOutput> {
        if self.is_recording() {
            warn!("[recorder] encoding while still recording, the frame set may be incomplete");
        }

        let frames = self.store.frames()?;
        if frames.is_empty() {
            return Err(RecorderError::encoder(
                format!("no frames in {}", self.store.dir().display()),
                "",
            ));
        }

        let output = config::absolute(output)?;
        let mut command = self.build_command(output);
        if let Some(hook) = &self.config.before_encode {
            hook(&mut command);
        }

        info!(
            "[recorder] encoding {} frames as {}",
            frames.len(),
            command.format_name().unwrap_or("default format")
        );
        self.encoder.run(&command).await
    }

    fn clear(&self) -> Result<()> {
        let mut state = lock(&self.session);
        if state.running {
            return Err(RecorderError::Precondition("cannot clear while recording"));
        }
        if let Err(err) = self.store.clear() {
            // Frames go highest index first, so what is left is still 0..n.
            state.frame = self.store.frames().map_or(0, |frames| frames.len() as u64);
            warn!(
                "[recorder] clear failed with {} frames left: {}",
                state.frame, err
            );
            return Err(err);
        }
        state.frame = 0;
        Ok(())
    }
}
