//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take
//! configuration, compute parameters, and call the backend. Both are
//! best-effort: a backend failure never fails the upload pipeline.

use super::backend::{BackendError, ImageBackend};
use super::calculations::fit_within;
use super::params::{ImageTransform, Quality, RecompressParams, TransformParams};
use crate::config::OptimizeConfig;
use crate::types::{ImageFile, jpeg_name};
use std::sync::Arc;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// MIME type of everything the backend encodes.
pub const JPEG_MIME: &str = "image/jpeg";

/// Optimizer settings resolved from [`OptimizeConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeSettings {
    /// Files strictly below this size are returned unchanged.
    pub threshold_bytes: u64,
    pub bounds: (u32, u32),
    pub quality: Quality,
}

impl From<&OptimizeConfig> for OptimizeSettings {
    fn from(config: &OptimizeConfig) -> Self {
        Self {
            threshold_bytes: config.threshold_bytes,
            bounds: (config.max_width, config.max_height),
            quality: Quality::new(config.quality),
        }
    }
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self::from(&OptimizeConfig::default())
    }
}

/// What the optimizer did with a file.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeOutcome {
    /// Below the size threshold; uploaded as-is.
    Skipped,
    /// Decoded, downscaled to fit, re-encoded.
    Recompressed {
        before: usize,
        after: usize,
        width: u32,
        height: u32,
    },
    /// Decode or encode failed; the original is uploaded.
    Fallback(String),
}

/// Optimizer output: the file to upload plus what happened to it.
#[derive(Debug, Clone)]
pub struct Optimized {
    pub file: ImageFile,
    pub outcome: OptimizeOutcome,
}

/// Downscale and recompress an oversized image.
///
/// Never fails: on any backend error the original file comes back with
/// [`OptimizeOutcome::Fallback`].
pub fn optimize(
    backend: &impl ImageBackend,
    file: ImageFile,
    settings: &OptimizeSettings,
) -> Optimized {
    if (file.len() as u64) < settings.threshold_bytes {
        tracing::debug!(file = %file.name, bytes = file.len(), "below optimize threshold");
        return Optimized {
            file,
            outcome: OptimizeOutcome::Skipped,
        };
    }

    match recompress_within(backend, &file.bytes, settings) {
        Ok((bytes, (width, height))) => {
            let outcome = OptimizeOutcome::Recompressed {
                before: file.len(),
                after: bytes.len(),
                width,
                height,
            };
            tracing::debug!(file = %file.name, ?outcome, "optimized");
            Optimized {
                file: ImageFile::new(jpeg_name(&file.name, None), JPEG_MIME, bytes),
                outcome,
            }
        }
        Err(e) => {
            tracing::warn!(
                file = %file.name,
                error = %e,
                "optimization failed, uploading original"
            );
            Optimized {
                file,
                outcome: OptimizeOutcome::Fallback(e.to_string()),
            }
        }
    }
}

fn recompress_within(
    backend: &impl ImageBackend,
    source: &[u8],
    settings: &OptimizeSettings,
) -> Result<(Vec<u8>, (u32, u32))> {
    let dims = backend.identify(source)?;
    let (width, height) = fit_within((dims.width, dims.height), settings.bounds);
    let bytes = backend.recompress(&RecompressParams {
        source,
        width,
        height,
        quality: settings.quality,
    })?;
    Ok((bytes, (width, height)))
}

/// Run [`optimize`] on the blocking pool.
///
/// Dropping the returned future (e.g. aborting the owning task) discards the
/// result; a panicking backend degrades to a fallback like any other error.
pub async fn optimize_async<B: ImageBackend + 'static>(
    backend: Arc<B>,
    file: ImageFile,
    settings: OptimizeSettings,
) -> Optimized {
    let original = file.clone();
    let task = tokio::task::spawn_blocking(move || optimize(backend.as_ref(), file, &settings));
    match task.await {
        Ok(optimized) => optimized,
        Err(e) => Optimized {
            file: original,
            outcome: OptimizeOutcome::Fallback(format!("optimizer task failed: {e}")),
        },
    }
}

/// Derive a new image from `source` by applying one transform.
pub fn derive_variant(
    backend: &impl ImageBackend,
    source: &ImageFile,
    transform: ImageTransform,
    quality: Quality,
) -> Result<ImageFile> {
    let bytes = backend.transform(&TransformParams {
        source: &source.bytes,
        transform,
        quality,
    })?;
    Ok(ImageFile::new(
        jpeg_name(&source.name, Some(transform.label())),
        JPEG_MIME,
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::backend::Dimensions;
    use crate::media::backend::tests::{MockBackend, RecordedOp};

    fn file_of(len: usize) -> ImageFile {
        ImageFile::new("living-room.png", "image/png", vec![0u8; len])
    }

    // =========================================================================
    // optimize tests
    // =========================================================================

    #[test]
    fn small_file_is_returned_untouched() {
        let backend = MockBackend::new();
        let file = file_of(100 * 1024);
        let result = optimize(&backend, file.clone(), &OptimizeSettings::default());

        assert_eq!(result.outcome, OptimizeOutcome::Skipped);
        assert_eq!(result.file, file);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let backend = MockBackend::new();
        let result = optimize(&backend, file_of(512_000), &OptimizeSettings::default());
        assert!(matches!(
            result.outcome,
            OptimizeOutcome::Recompressed { .. }
        ));
    }

    #[test]
    fn large_file_is_fitted_and_recompressed() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 4000,
            height: 3000,
        });
        let result = optimize(&backend, file_of(2_000_000), &OptimizeSettings::default());

        assert_eq!(
            result.outcome,
            OptimizeOutcome::Recompressed {
                before: 2_000_000,
                after: 1024,
                width: 1440,
                height: 1080,
            }
        );
        assert_eq!(result.file.name, "living-room.jpg");
        assert_eq!(result.file.mime, JPEG_MIME);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], RecordedOp::Identify(2_000_000)));
        assert!(matches!(
            ops[1],
            RecordedOp::Recompress {
                width: 1440,
                height: 1080,
                quality: 85,
                ..
            }
        ));
    }

    #[test]
    fn large_file_within_bounds_is_still_recompressed() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 1200,
            height: 800,
        });
        let result = optimize(&backend, file_of(900_000), &OptimizeSettings::default());
        assert!(matches!(
            result.outcome,
            OptimizeOutcome::Recompressed {
                width: 1200,
                height: 800,
                ..
            }
        ));
    }

    #[test]
    fn decode_failure_falls_back_to_original() {
        let backend = MockBackend::failing();
        let file = file_of(2_000_000);
        let result = optimize(&backend, file.clone(), &OptimizeSettings::default());

        assert!(matches!(result.outcome, OptimizeOutcome::Fallback(_)));
        assert_eq!(result.file, file);
    }

    #[test]
    fn settings_follow_config() {
        let config = OptimizeConfig {
            threshold_bytes: 10,
            max_width: 800,
            max_height: 600,
            quality: 70,
        };
        let settings = OptimizeSettings::from(&config);
        assert_eq!(settings.bounds, (800, 600));
        assert_eq!(settings.quality.value(), 70);
    }

    #[tokio::test]
    async fn optimize_async_runs_on_blocking_pool() {
        let backend = Arc::new(MockBackend::new());
        let result = optimize_async(
            backend.clone(),
            file_of(1_000_000),
            OptimizeSettings::default(),
        )
        .await;
        assert!(matches!(
            result.outcome,
            OptimizeOutcome::Recompressed { .. }
        ));
        assert_eq!(backend.get_operations().len(), 2);
    }

    // =========================================================================
    // derive_variant tests
    // =========================================================================

    #[test]
    fn derive_variant_names_output_after_transform() {
        let backend = MockBackend::new();
        let source = ImageFile::new("kitchen.jpg", JPEG_MIME, vec![1u8; 10]);
        let derived =
            derive_variant(&backend, &source, ImageTransform::Mirror, Quality::default()).unwrap();

        assert_eq!(derived.name, "kitchen-mirror.jpg");
        assert_eq!(derived.mime, JPEG_MIME);
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Transform {
                source_len: 10,
                transform: ImageTransform::Mirror
            }]
        );
    }

    #[test]
    fn derive_variant_propagates_backend_error() {
        let backend = MockBackend::failing();
        let source = ImageFile::new("kitchen.jpg", JPEG_MIME, vec![1u8; 10]);
        let result = derive_variant(
            &backend,
            &source,
            ImageTransform::Brightness(1.03),
            Quality::default(),
        );
        assert!(result.is_err());
    }
}
