//! Gallery configuration module.
//!
//! Handles loading, validating, and merging `gallery.toml` files. Stock
//! defaults encode the listing-portal policy (20 photos, 10 MiB ceiling,
//! 1920×1080 bounds); a user file only overrides the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_items = 20                 # Gallery capacity
//! max_file_bytes = 10485760      # 10 MiB per file
//! allowed_types = ["image/jpeg", "image/png", "image/webp"]
//! drag_policy = "settled-only"   # Or "any" to allow dragging in-flight photos
//!
//! [optimize]
//! threshold_bytes = 512000       # Files below this are uploaded untouched
//! max_width = 1920
//! max_height = 1080
//! quality = 85                   # JPEG re-encode quality (1-100)
//!
//! [upload]
//! endpoint = "http://localhost:8080/api/uploads"
//! timeout_secs = 60
//! max_attempts = 3
//! base_delay_ms = 1000           # Backoff: base * 2^attempt
//!
//! [completion]
//! target = 20                    # Photo count the gallery is padded toward
//! crop_ratio = 0.98
//! brightness = 1.03
//! contrast = 1.02
//!
//! [processing]
//! max_processes = 4              # Variant derivation workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::reorder::DragPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up by [`load_config`].
pub const CONFIG_FILENAME: &str = "gallery.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Admission policy applied by the validator.
    pub limits: LimitsConfig,
    /// Client-side recompression before transfer.
    pub optimize: OptimizeConfig,
    /// Remote endpoint, timeout and retry schedule.
    pub upload: UploadConfig,
    /// Gallery completion (derived variants).
    pub completion: CompletionConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_items == 0 {
            return Err(ConfigError::Validation(
                "limits.max_items must be non-zero".into(),
            ));
        }
        if self.limits.allowed_types.is_empty() {
            return Err(ConfigError::Validation(
                "limits.allowed_types must not be empty".into(),
            ));
        }
        if self.optimize.max_width == 0 || self.optimize.max_height == 0 {
            return Err(ConfigError::Validation(
                "optimize.max_width and optimize.max_height must be non-zero".into(),
            ));
        }
        if self.optimize.quality == 0 || self.optimize.quality > 100 {
            return Err(ConfigError::Validation(
                "optimize.quality must be 1-100".into(),
            ));
        }
        if self.upload.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "upload.max_attempts must be at least 1".into(),
            ));
        }
        if self.upload.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upload.timeout_secs must be non-zero".into(),
            ));
        }
        if !(self.completion.crop_ratio > 0.0 && self.completion.crop_ratio <= 1.0) {
            return Err(ConfigError::Validation(
                "completion.crop_ratio must be in (0, 1]".into(),
            ));
        }
        if self.completion.brightness <= 0.0 || self.completion.contrast <= 0.0 {
            return Err(ConfigError::Validation(
                "completion.brightness and completion.contrast must be positive".into(),
            ));
        }
        if self.completion.target > self.limits.max_items {
            return Err(ConfigError::Validation(
                "completion.target must not exceed limits.max_items".into(),
            ));
        }
        Ok(())
    }
}

/// Admission policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_items: usize,
    pub max_file_bytes: u64,
    /// MIME types accepted from the user. Compared case-insensitively.
    pub allowed_types: Vec<String>,
    /// Which photos accept a drag gesture.
    pub drag_policy: DragPolicy,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_items: 20,
            max_file_bytes: 10 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            drag_policy: DragPolicy::SettledOnly,
        }
    }
}

/// Recompression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeConfig {
    pub threshold_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u32,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 500 * 1024,
            max_width: 1920,
            max_height: 1080,
            quality: 85,
        }
    }
}

/// Upload endpoint and retry schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl UploadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/uploads".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Gallery completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    pub target: usize,
    /// Fraction of each dimension kept by the center crop.
    pub crop_ratio: f32,
    /// Multiplicative brightness factor (1.03 = +3%).
    pub brightness: f32,
    /// Contrast factor around mid-gray (1.02 = +2%).
    pub contrast: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            target: 20,
            crop_ratio: 0.98,
            brightness: 1.03,
            contrast: 1.02,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of variant derivation workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `gallery.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `gallery.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# Listing Gallery Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Admission policy
# ---------------------------------------------------------------------------
[limits]
# Maximum number of photos in one listing gallery.
max_items = 20

# Files larger than this are rejected before any processing (10 MiB).
max_file_bytes = 10485760

# Accepted MIME types.
allowed_types = ["image/jpeg", "image/png", "image/webp"]

# Which photos can be dragged: "settled-only" keeps photos that are still
# optimizing or uploading in place, "any" lets every photo move.
drag_policy = "settled-only"

# ---------------------------------------------------------------------------
# Client-side optimization
# ---------------------------------------------------------------------------
[optimize]
# Files smaller than this are uploaded as-is (500 KiB).
threshold_bytes = 512000

# Larger images are downscaled to fit inside these bounds, aspect preserved.
max_width = 1920
max_height = 1080

# JPEG re-encode quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[upload]
# Multipart endpoint. Expects a `file` part and an optional `code` field,
# answers 2xx with {"url": "..."}.
endpoint = "http://localhost:8080/api/uploads"

# Per-attempt transfer timeout.
timeout_secs = 60

# Attempts per item before it is marked failed.
max_attempts = 3

# Backoff between attempts: base_delay_ms * 2^attempt.
base_delay_ms = 1000

# ---------------------------------------------------------------------------
# Gallery completion
# ---------------------------------------------------------------------------
[completion]
# Photo count the gallery is padded toward with derived variants.
target = 20

# Center crop keeps this fraction of each dimension.
crop_ratio = 0.98

# Brightness and contrast factors (1.0 = unchanged).
brightness = 1.03
contrast = 1.02

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel variant-derivation workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
