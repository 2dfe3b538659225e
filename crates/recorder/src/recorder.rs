use std::path::Path;

use common::Result;
use common::async_trait::async_trait;

use crate::encoder::EncodeOutput;

/// Recorder lifecycle: `Idle -> Recording -> Idle`.
///
/// The composite operations are provided on top of the primitives and keep
/// their order: stop before encode, encode finished before clear.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Starts capturing. No-op while already recording.
    fn start(&self) -> Result<()>;

    /// Cancels the pending capture. No-op while idle. Returns the error that
    /// ended the recording, if capture failed since the last stop.
    fn stop(&self) -> Result<()>;

    fn is_recording(&self) -> bool;

    /// Encodes the frames on disk into `output`. Frames are left in place.
    async fn encode(&self, output: &Path) -> Result<EncodeOutput>;

    /// Deletes all frames and the working directory. Fails while recording.
    fn clear(&self) -> Result<()>;

    async fn stop_and_encode(&self, output: &Path) -> Result<EncodeOutput> {
        self.stop()?;
        self.encode(output).await
    }

    /// A failed encode skips the clear, so the frames can be encoded again.
    async fn stop_encode_and_clear(&self, output: &Path) -> Result<EncodeOutput> {
        self.stop()?;
        let encoded = self.encode(output).await?;
        self.clear()?;
        Ok(encoded)
    }

    fn stop_and_clear(&self) -> Result<()> {
        self.stop()?;
        self.clear()
    }
}
