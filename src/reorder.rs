//! Drag-and-drop reordering and cover selection.
//!
//! A drag is an array move: the dragged item is taken out and reinserted at
//! the drop index, everyone else keeps their relative order. Index 0 is the
//! cover, so any move that touches it changes the cover and the store
//! republishes the committed list.

use crate::gallery::{GalleryStore, ItemId, ItemState, StoreError};
use serde::{Deserialize, Serialize};

/// Which items accept a drag gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DragPolicy {
    /// Items being optimized or uploaded keep their slot until they settle.
    #[default]
    SettledOnly,
    /// Everything can be dragged.
    Any,
}

impl DragPolicy {
    pub fn allows(self, state: ItemState) -> bool {
        match self {
            DragPolicy::SettledOnly => state.is_settled(),
            DragPolicy::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReorderController {
    policy: DragPolicy,
}

impl ReorderController {
    pub fn new(policy: DragPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DragPolicy {
        self.policy
    }

    /// Move the dragged item `id` to the drop position `target`.
    pub fn drag(
        &self,
        store: &mut GalleryStore,
        id: ItemId,
        target: usize,
    ) -> Result<(), StoreError> {
        let item = store.get(id).ok_or(StoreError::UnknownItem(id))?;
        if !self.policy.allows(item.state()) {
            return Err(StoreError::NotDraggable {
                id,
                state: item.state(),
            });
        }
        store.move_item(id, target)?;
        tracing::debug!(%id, target, "item reordered");
        Ok(())
    }

    /// Make `id` the cover regardless of its state.
    pub fn set_cover(&self, store: &mut GalleryStore, id: ItemId) -> Result<(), StoreError> {
        store.move_item(id, 0)?;
        tracing::debug!(%id, "cover changed");
        Ok(())
    }
}
