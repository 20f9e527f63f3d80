//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what to produce) and the [`backend`](super::backend)
//! (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`ImageTransform`]: One of the four derivations used for gallery completion.
//! - [`RecompressParams`]: Source bytes, target dimensions, quality.
//! - [`TransformParams`]: Source bytes, transform, quality.

use crate::config::CompletionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Deterministic derivation applied to an existing photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImageTransform {
    /// Keep the centered fraction of each dimension.
    CenterCrop(f32),
    /// Horizontal flip.
    Mirror,
    /// Multiply every channel by the factor.
    Brightness(f32),
    /// Scale each channel's distance from mid-gray by the factor.
    Contrast(f32),
}

impl ImageTransform {
    /// The four transforms in cycling order, parameterized from config.
    pub fn cycle(config: &CompletionConfig) -> [ImageTransform; 4] {
        [
            ImageTransform::CenterCrop(config.crop_ratio),
            ImageTransform::Mirror,
            ImageTransform::Brightness(config.brightness),
            ImageTransform::Contrast(config.contrast),
        ]
    }

    /// Short label used in derived file names and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ImageTransform::CenterCrop(_) => "crop",
            ImageTransform::Mirror => "mirror",
            ImageTransform::Brightness(_) => "bright",
            ImageTransform::Contrast(_) => "contrast",
        }
    }
}

impl fmt::Display for ImageTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageTransform::CenterCrop(ratio) => write!(f, "center-crop {:.0}%", ratio * 100.0),
            ImageTransform::Mirror => write!(f, "mirror"),
            ImageTransform::Brightness(k) => write!(f, "brightness x{k:.2}"),
            ImageTransform::Contrast(k) => write!(f, "contrast x{k:.2}"),
        }
    }
}

/// Parameters for a downscale + re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct RecompressParams<'a> {
    pub source: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Parameters for a variant derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams<'a> {
    pub source: &'a [u8],
    pub transform: ImageTransform,
    pub quality: Quality,
}
