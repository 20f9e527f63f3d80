//! Admission checks for user-selected files.
//!
//! A candidate is rejected, in this order, when its MIME type is not in the
//! allow-list, when it exceeds the size ceiling, or when the gallery has no
//! room left. Checks are pure; nothing is decoded.
//!
//! Batches are validated file by file. Room is consumed by earlier accepted
//! files of the same batch, so a batch never pushes the gallery past
//! `max_items`. Rejections are collected into one [`BatchValidation`] whose
//! [`summary`](BatchValidation::summary) is shown to the user once.

use crate::config::LimitsConfig;
use crate::types::ImageFile;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{name}: unsupported file type {mime}")]
    UnsupportedType { name: String, mime: String },
    #[error("{name}: {} exceeds the {} limit", size_label(.size), size_label(.limit))]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("{name}: the gallery already has the maximum of {max} photos")]
    GalleryFull { name: String, max: usize },
}

impl ValidationError {
    /// Name of the rejected file.
    pub fn file_name(&self) -> &str {
        match self {
            ValidationError::UnsupportedType { name, .. }
            | ValidationError::TooLarge { name, .. }
            | ValidationError::GalleryFull { name, .. } => name,
        }
    }
}

fn size_label(bytes: &u64) -> String {
    format_size(*bytes)
}

/// Human-readable byte size with one decimal (`12.0 MiB`, `512.0 KiB`).
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Check a single file against the policy, given the current gallery size.
pub fn validate_file(
    file: &ImageFile,
    gallery_len: usize,
    limits: &LimitsConfig,
) -> Result<(), ValidationError> {
    let allowed = limits
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(file.mime.trim()));
    if !allowed {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime: file.mime.clone(),
        });
    }

    let size = file.len() as u64;
    if size > limits.max_file_bytes {
        return Err(ValidationError::TooLarge {
            name: file.name.clone(),
            size,
            limit: limits.max_file_bytes,
        });
    }

    if gallery_len >= limits.max_items {
        return Err(ValidationError::GalleryFull {
            name: file.name.clone(),
            max: limits.max_items,
        });
    }

    Ok(())
}

/// Outcome of validating a batch: accepted files in input order plus every rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchValidation {
    pub accepted: Vec<ImageFile>,
    pub rejected: Vec<ValidationError>,
}

impl BatchValidation {
    /// One aggregated message for the whole batch, or `None` if nothing was rejected.
    pub fn summary(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        let total = self.accepted.len() + self.rejected.len();
        let mut lines = vec![format!(
            "{} of {} files were not added:",
            self.rejected.len(),
            total
        )];
        lines.extend(self.rejected.iter().map(|e| format!("- {e}")));
        Some(lines.join("\n"))
    }
}

/// Validate a batch against the current gallery size.
pub fn validate_batch(
    files: Vec<ImageFile>,
    gallery_len: usize,
    limits: &LimitsConfig,
) -> BatchValidation {
    let mut result = BatchValidation::default();
    for file in files {
        match validate_file(&file, gallery_len + result.accepted.len(), limits) {
            Ok(()) => result.accepted.push(file),
            Err(e) => {
                tracing::debug!(error = %e, "file rejected");
                result.rejected.push(e);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn jpeg(name: &str, len: usize) -> ImageFile {
        ImageFile::new(name, "image/jpeg", vec![0u8; len])
    }

    #[test]
    fn accepts_allowed_type_within_limits() {
        let limits = LimitsConfig::default();
        assert!(validate_file(&jpeg("a.jpg", 1024), 0, &limits).is_ok());
    }

    #[test]
    fn mime_comparison_ignores_case() {
        let limits = LimitsConfig::default();
        let file = ImageFile::new("a.png", "IMAGE/PNG", vec![0u8; 10]);
        assert!(validate_file(&file, 0, &limits).is_ok());
    }

    #[test]
    fn rejects_unsupported_type() {
        let limits = LimitsConfig::default();
        let file = ImageFile::new("anim.gif", "image/gif", vec![0u8; 10]);
        assert_eq!(
            validate_file(&file, 0, &limits),
            Err(ValidationError::UnsupportedType {
                name: "anim.gif".into(),
                mime: "image/gif".into()
            })
        );
    }

    #[test]
    fn rejects_twelve_mib_jpeg() {
        let limits = LimitsConfig::default();
        let result = validate_file(&jpeg("big.jpg", 12 * MIB), 0, &limits);
        assert!(matches!(
            result,
            Err(ValidationError::TooLarge {
                size,
                limit: 10_485_760,
                ..
            }) if size == (12 * MIB) as u64
        ));
    }

    #[test]
    fn exactly_ten_mib_is_accepted() {
        let limits = LimitsConfig::default();
        assert!(validate_file(&jpeg("edge.jpg", 10 * MIB), 0, &limits).is_ok());
    }

    #[test]
    fn rejects_when_gallery_full() {
        let limits = LimitsConfig::default();
        assert!(matches!(
            validate_file(&jpeg("a.jpg", 10), 20, &limits),
            Err(ValidationError::GalleryFull { max: 20, .. })
        ));
    }

    #[test]
    fn type_is_checked_before_size() {
        let limits = LimitsConfig::default();
        let file = ImageFile::new("huge.bmp", "image/bmp", vec![0u8; 11 * MIB]);
        assert!(matches!(
            validate_file(&file, 0, &limits),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    // =========================================================================
    // validate_batch tests
    // =========================================================================

    #[test]
    fn batch_partitions_input() {
        let limits = LimitsConfig::default();
        let files = vec![
            jpeg("a.jpg", 10),
            ImageFile::new("b.gif", "image/gif", vec![0u8; 10]),
            jpeg("c.jpg", 12 * MIB),
            jpeg("d.jpg", 10),
        ];
        let result = validate_batch(files, 0, &limits);

        assert_eq!(result.accepted.len() + result.rejected.len(), 4);
        let names: Vec<&str> = result.accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "d.jpg"]);
        let rejected: Vec<&str> = result.rejected.iter().map(|e| e.file_name()).collect();
        assert_eq!(rejected, vec!["b.gif", "c.jpg"]);
    }

    #[test]
    fn batch_never_overfills_gallery() {
        let limits = LimitsConfig::default();
        let files: Vec<ImageFile> = (0..5).map(|i| jpeg(&format!("{i}.jpg"), 10)).collect();
        let result = validate_batch(files, 18, &limits);

        assert_eq!(result.accepted.len(), 2);
        assert_eq!(result.rejected.len(), 3);
        assert!(
            result
                .rejected
                .iter()
                .all(|e| matches!(e, ValidationError::GalleryFull { .. }))
        );
    }

    #[test]
    fn summary_is_none_when_all_accepted() {
        let limits = LimitsConfig::default();
        let result = validate_batch(vec![jpeg("a.jpg", 10)], 0, &limits);
        assert_eq!(result.summary(), None);
    }

    #[test]
    fn summary_aggregates_every_rejection() {
        let limits = LimitsConfig::default();
        let files = vec![
            jpeg("ok.jpg", 10),
            ImageFile::new("b.gif", "image/gif", vec![0u8; 10]),
            jpeg("big.jpg", 12 * MIB),
        ];
        let summary = validate_batch(files, 0, &limits).summary().unwrap();

        assert!(summary.starts_with("2 of 3 files were not added:"));
        assert!(summary.contains("- b.gif: unsupported file type image/gif"));
        assert!(summary.contains("- big.jpg: 12.0 MiB exceeds the 10.0 MiB limit"));
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(500 * 1024), "500.0 KiB");
        assert_eq!(format_size(12 * MIB as u64), "12.0 MiB");
    }
}
