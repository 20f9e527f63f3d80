//! The gallery state machine.
//!
//! [`GalleryStore`] is the single source of truth for which photos exist,
//! what state each one is in and in what order they appear. It is plain
//! synchronous data: concurrency lives in [`GalleryHandle`](super::GalleryHandle),
//! which owns the store on one task and serializes every mutation.
//!
//! Every mutation that can change the committed list (the ordered URLs of
//! uploaded items) ends in [`GalleryStore::republish`], which forwards the
//! list to the [`FormSink`] only when it differs from the last publication.

use super::form::{CommittedPhotos, FormSink};
use super::item::{DisplayRef, GalleryItem, ItemId, ItemState, ItemView, Provenance};
use crate::types::ImageFile;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no item with id {0}")]
    UnknownItem(ItemId),
    #[error("gallery is full ({max} photos)")]
    Full { max: usize },
    #[error("item {id} cannot go from {from} via {transition}")]
    InvalidTransition {
        id: ItemId,
        from: ItemState,
        transition: &'static str,
    },
    #[error("item {id} is {state} and cannot be moved")]
    NotDraggable { id: ItemId, state: ItemState },
    #[error("position {index} is outside the gallery (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// An event that moves an item through its lifecycle.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Pending → Optimizing.
    StartOptimizing,
    /// Pending/Optimizing → Uploading, carrying the payload to transfer.
    StartUploading(ImageFile),
    /// Uploading → Uploading with a new percentage.
    Progress(u8),
    /// Uploading → Uploaded.
    Succeeded { url: String },
    /// Uploading → Failed, after the retry policy gave up.
    Failed { error: String },
    /// Failed → Uploading, on explicit user request.
    Retry,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::StartOptimizing => "start-optimizing",
            Transition::StartUploading(_) => "start-uploading",
            Transition::Progress(_) => "progress",
            Transition::Succeeded { .. } => "succeeded",
            Transition::Failed { .. } => "failed",
            Transition::Retry => "retry",
        }
    }
}

/// Target state of `transition` from `from`, if the edge exists.
pub fn next_state(from: ItemState, transition: &Transition) -> Option<ItemState> {
    use ItemState::*;
    match (from, transition) {
        (Pending, Transition::StartOptimizing) => Some(Optimizing),
        (Pending | Optimizing, Transition::StartUploading(_)) => Some(Uploading),
        (Uploading, Transition::Progress(_)) => Some(Uploading),
        (Uploading, Transition::Succeeded { .. }) => Some(Uploaded),
        (Uploading, Transition::Failed { .. }) => Some(Failed),
        (Failed, Transition::Retry) => Some(Uploading),
        _ => None,
    }
}

/// Ordered collection of gallery items plus the form publication.
pub struct GalleryStore {
    items: Vec<GalleryItem>,
    next_id: u64,
    max_items: usize,
    sink: Box<dyn FormSink>,
    published: CommittedPhotos,
}

impl std::fmt::Debug for GalleryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryStore")
            .field("items", &self.items.len())
            .field("next_id", &self.next_id)
            .field("max_items", &self.max_items)
            .field("published", &self.published)
            .finish()
    }
}

impl GalleryStore {
    pub fn new(max_items: usize, sink: impl FormSink + 'static) -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            max_items,
            sink: Box::new(sink),
            published: CommittedPhotos::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Free slots before the gallery is full.
    pub fn room(&self) -> usize {
        self.max_items.saturating_sub(self.items.len())
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&GalleryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn index_of(&self, id: ItemId) -> Result<usize, StoreError> {
        self.position(id).ok_or(StoreError::UnknownItem(id))
    }

    /// Append a new `Pending` item.
    pub fn insert(
        &mut self,
        file: ImageFile,
        provenance: Provenance,
    ) -> Result<ItemId, StoreError> {
        if self.items.len() >= self.max_items {
            return Err(StoreError::Full {
                max: self.max_items,
            });
        }
        let id = ItemId(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, file = %file.name, "item added");
        self.items.push(GalleryItem::new(id, file, provenance));
        Ok(id)
    }

    /// Apply a lifecycle transition, returning the new state.
    pub fn apply(&mut self, id: ItemId, transition: Transition) -> Result<ItemState, StoreError> {
        let index = self.index_of(id)?;
        let item = &mut self.items[index];
        let to = next_state(item.state, &transition).ok_or(StoreError::InvalidTransition {
            id,
            from: item.state,
            transition: transition.name(),
        })?;

        match transition {
            Transition::StartOptimizing => {}
            Transition::StartUploading(file) => {
                item.source = Some(file);
                item.progress = 0;
            }
            Transition::Progress(percent) => {
                item.progress = percent.min(100);
            }
            Transition::Succeeded { url } => {
                item.display = DisplayRef::Remote(url);
                item.source = None;
                item.progress = 100;
                item.error = None;
            }
            Transition::Failed { error } => {
                item.error = Some(error);
                item.progress = 0;
            }
            Transition::Retry => {
                item.error = None;
                item.progress = 0;
            }
        }
        if item.state != to {
            tracing::debug!(%id, from = %item.state, %to, "state changed");
        }
        item.state = to;

        if to == ItemState::Uploaded {
            self.republish();
        }
        Ok(to)
    }

    /// Drop an item regardless of its state.
    pub fn remove(&mut self, id: ItemId) -> Result<GalleryItem, StoreError> {
        let index = self.index_of(id)?;
        let item = self.items.remove(index);
        tracing::debug!(%id, state = %item.state, "item removed");
        if item.state == ItemState::Uploaded {
            self.republish();
        }
        Ok(item)
    }

    /// Move `id` to `to`, shifting the items in between. No draggability check.
    pub fn move_item(&mut self, id: ItemId, to: usize) -> Result<(), StoreError> {
        let from = self.index_of(id)?;
        if to >= self.items.len() {
            return Err(StoreError::IndexOutOfRange {
                index: to,
                len: self.items.len(),
            });
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
            self.republish();
        }
        Ok(())
    }

    /// Uploaded URLs in gallery order.
    pub fn committed(&self) -> CommittedPhotos {
        CommittedPhotos {
            urls: self
                .items
                .iter()
                .filter_map(|item| item.url().map(str::to_owned))
                .collect(),
        }
    }

    /// Push the committed list to the sink if it changed since the last push.
    pub fn republish(&mut self) {
        let current = self.committed();
        if current != self.published {
            tracing::debug!(photos = current.len(), "committed list changed");
            self.sink.publish(&current);
            self.published = current;
        }
    }

    pub fn snapshot(&self) -> Vec<ItemView> {
        self.items.iter().map(GalleryItem::view).collect()
    }

    pub fn count_in(&self, state: ItemState) -> usize {
        self.items.iter().filter(|item| item.state == state).count()
    }

    /// Items that are neither uploaded nor failed.
    pub fn in_flight(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.state.is_in_flight())
            .count()
    }

    /// `(id, url, name)` of every uploaded item, in gallery order.
    pub fn uploaded_sources(&self) -> Vec<UploadedSource> {
        self.items
            .iter()
            .filter_map(|item| {
                let url = item.url()?;
                Some(UploadedSource {
                    id: item.id,
                    url: url.to_owned(),
                })
            })
            .collect()
    }
}

/// An uploaded item that can seed gallery completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSource {
    pub id: ItemId,
    pub url: String,
}
