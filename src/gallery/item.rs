//! Gallery items and their lifecycle states.

use crate::media::ImageTransform;
use crate::types::ImageFile;
use serde::Serialize;
use std::fmt;

/// Stable item identifier. Allocated monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of one photo.
///
/// ```text
/// Pending ──▶ Optimizing ──▶ Uploading ──▶ Uploaded
///                               │  ▲
///                     exhausted │  │ user retry
///                               ▼  │
///                              Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemState {
    Pending,
    Optimizing,
    Uploading,
    Uploaded,
    Failed,
}

impl ItemState {
    /// `Uploaded` and `Failed` are the only states nobody is mutating.
    pub fn is_settled(self) -> bool {
        matches!(self, ItemState::Uploaded | ItemState::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_settled()
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::Pending => "pending",
            ItemState::Optimizing => "optimizing",
            ItemState::Uploading => "uploading",
            ItemState::Uploaded => "uploaded",
            ItemState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What the UI renders for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DisplayRef {
    /// Transient local preview, identified by the file name.
    Local(String),
    /// Final URL returned by the upload endpoint.
    Remote(String),
}

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Selected or dropped by the user.
    User,
    /// Synthesized by gallery completion.
    Derived {
        derived_from: ItemId,
        transform: ImageTransform,
    },
}

impl Provenance {
    pub fn derived_from(&self) -> Option<ItemId> {
        match self {
            Provenance::User => None,
            Provenance::Derived { derived_from, .. } => Some(*derived_from),
        }
    }
}

/// One photo candidate or confirmed photo.
#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub(crate) id: ItemId,
    pub(crate) display: DisplayRef,
    pub(crate) state: ItemState,
    pub(crate) progress: u8,
    pub(crate) error: Option<String>,
    /// Payload to upload. Dropped once the item is `Uploaded`.
    pub(crate) source: Option<ImageFile>,
    pub(crate) provenance: Provenance,
}

impl GalleryItem {
    pub(crate) fn new(id: ItemId, file: ImageFile, provenance: Provenance) -> Self {
        Self {
            id,
            display: DisplayRef::Local(file.name.clone()),
            state: ItemState::Pending,
            progress: 0,
            error: None,
            source: Some(file),
            provenance,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn display(&self) -> &DisplayRef {
        &self.display
    }

    /// Upload progress, 0–100. Meaningful only while `Uploading`.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Cause of the last failure. Present only in `Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> Option<&ImageFile> {
        self.source.as_ref()
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Remote URL, once uploaded.
    pub fn url(&self) -> Option<&str> {
        match (&self.state, &self.display) {
            (ItemState::Uploaded, DisplayRef::Remote(url)) => Some(url),
            _ => None,
        }
    }

    /// Render-ready view without the payload.
    pub fn view(&self) -> ItemView {
        ItemView {
            id: self.id,
            display: self.display.clone(),
            state: self.state,
            progress: self.progress,
            error: self.error.clone(),
            provenance: self.provenance,
        }
    }
}

/// Read-only snapshot of an item, cheap to hand to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub display: DisplayRef,
    pub state: ItemState,
    pub progress: u8,
    pub error: Option<String>,
    pub provenance: Provenance,
}
