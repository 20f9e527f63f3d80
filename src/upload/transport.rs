//! Transport abstraction for moving bytes to and from the photo host.
//!
//! The pipeline only needs two things from the network: push one encoded
//! image and get its public URL back, and pull an already-uploaded image
//! when gallery completion needs its pixels. [`HttpTransport`](super::HttpTransport)
//! does both over HTTP.

use crate::types::ImageFile;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upload progress callback: `(bytes_sent, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// No-op progress callback.
pub fn no_progress() -> ProgressFn {
    Arc::new(|_, _| {})
}

/// One upload: the payload plus the optional listing group code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: ImageFile,
    pub group_code: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upload timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid server response: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Something that can store an image and hand back its public URL.
pub trait Transport: Send + Sync + 'static {
    /// Upload one file. Resolves to the URL the server assigned.
    fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Download a previously uploaded image.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        (**self).upload(request, progress)
    }

    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        (**self).fetch(url)
    }
}
