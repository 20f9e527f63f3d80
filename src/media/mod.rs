//! Image processing: decode, fit, recompress, derive.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Optimize** | fit within bounds + Lanczos3 + JPEG re-encode |
//! | **Derive** | center crop, mirror, brightness, contrast |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and channel math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The optimizer and variant derivation, combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CropRect, center_crop_rect, fit_within};
pub use operations::{
    JPEG_MIME, OptimizeOutcome, OptimizeSettings, Optimized, derive_variant, optimize,
    optimize_async,
};
pub use params::{ImageTransform, Quality, RecompressParams, TransformParams};
pub use rust_backend::RustBackend;
