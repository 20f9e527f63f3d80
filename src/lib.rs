//! # Listing Gallery
//!
//! The photo step of a property listing wizard: users drop photos, the crate
//! checks them, shrinks the oversized ones, uploads everything concurrently
//! with retries, and keeps an ordered gallery whose first photo is the cover.
//! The ordered URLs of uploaded photos are what the rest of the listing sees.
//!
//! # Architecture: One Writer, Many Tasks
//!
//! ```text
//! files ─▶ validate ─▶ GalleryStore (Pending)
//!                          │   one tokio task per item
//!                          ▼
//!              optimize (blocking pool) ─▶ retry(upload) ─▶ Uploaded | Failed
//!                          │
//!                          ▼
//!              FormSink ◀── committed URL list (index 0 = cover)
//! ```
//!
//! Items progress independently and finish in any order. Their progress
//! callbacks and results never touch the store directly: they are sent as
//! commands to the single task that owns it (see [`gallery::GalleryHandle`]),
//! so there are no lost updates and no locks around gallery state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestration: add, retry, remove, reorder, complete, leave warning |
//! | [`validate`] | Admission policy: MIME allow-list, size ceiling, capacity; batch summary |
//! | [`media`] | Image backend trait, `image`-crate backend, optimizer, variant transforms |
//! | [`upload`] | Transport trait, reqwest multipart transport, retry with backoff |
//! | [`gallery`] | Items, lifecycle state machine, single-writer store, form publication |
//! | [`reorder`] | Drag-and-drop array moves and "set as cover" |
//! | [`variants`] | Gallery completion: round-robin derived photos toward a target count |
//! | [`config`] | `gallery.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Shared [`types::ImageFile`] payload |
//!
//! # Design Decisions
//!
//! ## Optimization Never Fails an Upload
//!
//! Recompression is an optimization, not a requirement. Any decode or encode
//! error falls back to uploading the original bytes, logged at `warn`. Users
//! never see an optimizer error.
//!
//! ## Failed Is Not Terminal
//!
//! After the retry policy gives up, the item stays in the gallery as `Failed`
//! with the last error and its optimized payload. [`pipeline::Pipeline::retry`]
//! sends it straight back to `Uploading` without optimizing again.
//!
//! ## Derived Photos Are Ordinary Photos
//!
//! Gallery completion inserts derived photos as regular items that go through
//! the same optimizer and upload path. Their provenance records the source
//! item and transform, and they stay independent of the source once created.
//!
//! ## Backend Behind a Trait
//!
//! Pixel work goes through [`media::ImageBackend`]. The shipped
//! [`media::RustBackend`] uses the pure-Rust `image` crate; tests use a mock
//! that records operations, so pipeline logic is tested without encoding.

pub mod config;
pub mod gallery;
pub mod media;
pub mod pipeline;
pub mod reorder;
pub mod types;
pub mod upload;
pub mod validate;
pub mod variants;

pub use config::GalleryConfig;
pub use pipeline::Pipeline;
