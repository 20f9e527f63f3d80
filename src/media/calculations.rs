//! Pure calculation functions for image dimensions and pixel math.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate dimensions that fit inside `bounds`, preserving aspect ratio.
///
/// Images already inside the bounds are returned unchanged (never upscaled).
/// Both output dimensions are at least 1.
///
/// ```
/// # use listing_gallery::media::fit_within;
/// // 4000x3000 into 1920x1080: height is the binding edge
/// assert_eq!(fit_within((4000, 3000), (1920, 1080)), (1440, 1080));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, max_h);
    (w, h)
}

/// A crop rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered crop keeping `ratio` of each dimension.
pub fn center_crop_rect(source: (u32, u32), ratio: f32) -> CropRect {
    let (w, h) = source;
    let ratio = ratio.clamp(0.0, 1.0) as f64;
    let width = ((w as f64 * ratio).round() as u32).clamp(1, w.max(1));
    let height = ((h as f64 * ratio).round() as u32).clamp(1, h.max(1));
    CropRect {
        x: (w - width.min(w)) / 2,
        y: (h - height.min(h)) / 2,
        width,
        height,
    }
}

/// Scale a channel value, saturating at the 8-bit range.
pub fn scale_channel(value: u8, factor: f32) -> u8 {
    (value as f32 * factor).round().clamp(0.0, 255.0) as u8
}

/// Stretch a channel value away from (or toward) mid-gray.
pub fn contrast_channel(value: u8, factor: f32) -> u8 {
    ((value as f32 - 127.5) * factor + 127.5)
        .round()
        .clamp(0.0, 255.0) as u8
}
