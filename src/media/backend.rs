//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, recompress, and transform. All of them work on encoded
//! bytes in memory; the gallery never touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Another environment (a GPU path, a platform codec) plugs in by
//! implementing this trait.

use super::params::{RecompressParams, TransformParams};
use thiserror::Error;

/// Image decode/encode failure.
///
/// Never surfaced to the user: the optimizer downgrades it to a no-op and the
/// variant generator skips the derivation.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so one backend instance can serve blocking tasks and the
/// rayon pool concurrently.
pub trait ImageBackend: Send + Sync {
    /// Read image dimensions from the encoded header.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, resize to exactly the requested dimensions, re-encode as JPEG.
    fn recompress(&self, params: &RecompressParams<'_>) -> Result<Vec<u8>, BackendError>;

    /// Decode, apply one transform, re-encode as JPEG.
    fn transform(&self, params: &TransformParams<'_>) -> Result<Vec<u8>, BackendError>;
}
