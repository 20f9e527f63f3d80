//! Shared types passed between the validator, the media operations, the
//! gallery store and the upload transport.

use std::path::Path;
use std::sync::Arc;

/// An encoded image with the metadata needed to upload it.
///
/// The byte buffer is reference-counted: retries and the derivation pool
/// share it without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name, used for the multipart part and for display.
    pub name: String,
    /// Declared MIME type, e.g. `image/jpeg`.
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Replace the extension of `name` with `.jpg`, inserting `suffix` before it.
///
/// ```
/// # use listing_gallery::types::jpeg_name;
/// assert_eq!(jpeg_name("sala.png", None), "sala.jpg");
/// assert_eq!(jpeg_name("sala.png", Some("mirror")), "sala-mirror.jpg");
/// ```
pub fn jpeg_name(name: &str, suffix: Option<&str>) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("photo");
    match suffix {
        Some(suffix) => format!("{stem}-{suffix}.jpg"),
        None => format!("{stem}.jpg"),
    }
}
