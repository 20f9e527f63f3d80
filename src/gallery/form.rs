//! The committed photo list handed to the listing form.

use serde::Serialize;

/// Ordered URLs of every uploaded item. Index 0 is the cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommittedPhotos {
    pub urls: Vec<String>,
}

impl CommittedPhotos {
    pub fn cover(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Receives the committed list whenever it changes.
///
/// Called from the store's writer, so implementations must not block.
pub trait FormSink: Send {
    fn publish(&mut self, photos: &CommittedPhotos);
}

/// Discards every publication.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FormSink for NullSink {
    fn publish(&mut self, _photos: &CommittedPhotos) {}
}

impl FormSink for tokio::sync::watch::Sender<CommittedPhotos> {
    fn publish(&mut self, photos: &CommittedPhotos) {
        self.send_replace(photos.clone());
    }
}
