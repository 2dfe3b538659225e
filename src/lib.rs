//! Records a browser (or anything else that can take screenshots) into a
//! video.
//!
//! A [`ScreenshotRecorder`] asks its [`CaptureSource`] for a screenshot,
//! writes it as `<working_dir>/0000000000.png`, `0000000001.png`, ... and
//! paces the requests so the average rate follows the configured fps. Once
//! stopped, the frames are handed to ffmpeg (or any [`VideoEncoder`]) and can
//! then be cleared.

pub use common::utils::{FRAME_PATTERN, frame_file_name};
pub use common::{RecorderError, Result};
pub use recorder::{
    Base64Capture, BeforeEncodeHook, CaptureSource, EncodeOutput, FfmpegCommand, FfmpegEncoder,
    FnCapture, Recorder, RecorderConfig, ScreenshotRecorder, VideoEncoder, ffmpeg_available,
};
pub use storage::{FrameStore, default_working_dir};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    struct CountingEncoder {
        runs: AtomicUsize,
    }

    #[common::async_trait::async_trait]
    impl VideoEncoder for CountingEncoder {
        async fn run(&self, command: &FfmpegCommand) -> Result<EncodeOutput> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(EncodeOutput {
                stdout: String::new(),
                stderr: String::new(),
                output_path: command.output_path().unwrap_or(command.input()).to_path_buf(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn records_encodes_and_cleans_up() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let encoder = Arc::new(CountingEncoder {
            runs: AtomicUsize::new(0),
        });
        let source = FnCapture::new(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(b"\x89PNG".to_vec())
        });
        let config = RecorderConfig::default()
            .with_fps(5)
            .with_working_dir(dir.path().join("frames"));
        let recorder = ScreenshotRecorder::new(source, config)
            .unwrap()
            .with_encoder(encoder.clone());

        recorder.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let store = FrameStore::new(recorder.working_dir());
        let frames = store.frames().unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].1, recorder.working_dir().join(frame_file_name(0)));

        let output = dir.path().join("session.avi");
        let encoded = recorder.stop_encode_and_clear(&output).await.unwrap();

        assert_eq!(encoded.output_path, output);
        assert_eq!(encoder.runs.load(Ordering::SeqCst), 1);
        assert!(!store.exists());
        assert!(!recorder.is_recording());
    }
}
