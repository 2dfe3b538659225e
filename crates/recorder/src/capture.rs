use std::future::Future;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::anyhow::{Context, Result};
use common::async_trait::async_trait;

/// Something that can take a screenshot on request, e.g. a WebDriver session.
///
/// Returns PNG bytes. Any error ends the recording.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn take_screenshot(&self) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: CaptureSource + ?Sized> CaptureSource for Arc<T> {
    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        (**self).take_screenshot().await
    }
}

/// Adapts an async closure into a [`CaptureSource`].
pub struct FnCapture<F> {
    f: F,
}

impl<F, Fut> FnCapture<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> CaptureSource for FnCapture<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>>> + Send,
{
    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        (self.f)().await
    }
}

/// Wraps a source that answers with base64 text (the WebDriver screenshot
/// endpoint does) and hands out the decoded image.
pub struct Base64Capture<S> {
    inner: S,
}

impl<S: CaptureSource> Base64Capture<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CaptureSource> CaptureSource for Base64Capture<S> {
    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        let encoded = self.inner.take_screenshot().await?;
        STANDARD
            .decode(encoded.trim_ascii())
            .context("screenshot is not valid base64")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::anyhow::anyhow;

    #[tokio::test]
    async fn fn_capture_forwards_result() {
        let source = FnCapture::new(|| async { Ok(vec![1, 2, 3]) });
        assert_eq!(source.take_screenshot().await.unwrap(), vec![1, 2, 3]);

        let failing = FnCapture::new(|| async { Err(anyhow!("no such window")) });
        assert!(failing.take_screenshot().await.is_err());
    }

    #[tokio::test]
    async fn base64_capture_decodes() {
        let source = Base64Capture::new(FnCapture::new(|| async {
            Ok(b"iVBORw0K\n".to_vec())
        }));
        let png = source.take_screenshot().await.unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn base64_capture_rejects_garbage() {
        let source = Base64Capture::new(FnCapture::new(|| async { Ok(b"not base64!".to_vec()) }));
        let err = source.take_screenshot().await.unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
