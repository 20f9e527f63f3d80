//! Gallery state: items, lifecycle, ordering and the committed photo list.
//!
//! | Piece | Role |
//! |---|---|
//! | [`GalleryItem`] | One photo with state, progress, error and provenance |
//! | [`GalleryStore`] | Ordered items + transition table + form publication |
//! | [`GalleryHandle`] | Single-writer task owning the store |
//! | [`FormSink`] | Receives [`CommittedPhotos`] whenever it changes |

pub mod form;
pub mod handle;
pub mod item;
pub mod store;

pub use form::{CommittedPhotos, FormSink, NullSink};
pub use handle::{GalleryHandle, StoreClosed};
pub use item::{DisplayRef, GalleryItem, ItemId, ItemState, ItemView, Provenance};
pub use store::{GalleryStore, StoreError, Transition, UploadedSource, next_state};
