//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with sniffed format |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Center crop | `DynamicImage::crop_imm` |
//! | Mirror | `DynamicImage::fliph` |
//! | Brightness / contrast | per-channel map over RGBA8 |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{center_crop_rect, contrast_channel, scale_channel};
use super::params::{ImageTransform, Quality, RecompressParams, TransformParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Failed to sniff image format: {e}")))
}

/// Decode an image from memory.
fn load_image(data: &[u8]) -> Result<DynamicImage, BackendError> {
    reader(data)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("Failed to decode image: {e}")))
}

/// Drop the alpha channel by compositing onto white.
fn flatten(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encode as baseline JPEG at the given quality.
fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(flatten(img));
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.value() as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

/// Apply `f` to the color channels of every pixel, leaving alpha untouched.
fn map_channels(img: &DynamicImage, f: impl Fn(u8) -> u8) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    for pixel in rgba.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = f(*channel);
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

fn apply_transform(img: &DynamicImage, transform: ImageTransform) -> DynamicImage {
    match transform {
        ImageTransform::CenterCrop(ratio) => {
            let rect = center_crop_rect((img.width(), img.height()), ratio);
            img.crop_imm(rect.x, rect.y, rect.width, rect.height)
        }
        ImageTransform::Mirror => img.fliph(),
        ImageTransform::Brightness(factor) => map_channels(img, |c| scale_channel(c, factor)),
        ImageTransform::Contrast(factor) => map_channels(img, |c| contrast_channel(c, factor)),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(data)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn recompress(&self, params: &RecompressParams<'_>) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        let resized = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode_jpeg(&resized, params.quality)
    }

    fn transform(&self, params: &TransformParams<'_>) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        let derived = apply_transform(&img, params.transform);
        encode_jpeg(&derived, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ExtendedColorType, GenericImageView, ImageEncoder, Rgba, RgbaImage};

    /// Encode a small JPEG whose left half is black and right half is white.
    fn split_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let mut out = Vec::new();
        JpegEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    fn gray_png(width: u32, height: u32, level: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([level, level, level, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn mean_luma(data: &[u8]) -> f64 {
        let img = image::load_from_memory(data).unwrap().to_luma8();
        let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
        sum as f64 / (img.width() * img.height()) as f64
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let backend = RustBackend::new();
        let dims = backend.identify(&split_jpeg(200, 150)).unwrap();
        assert_eq!(
            dims,
            Dimensions {
                width: 200,
                height: 150
            }
        );
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn recompress_resizes_and_emits_jpeg() {
        let backend = RustBackend::new();
        let source = split_jpeg(400, 300);
        let out = backend
            .recompress(&RecompressParams {
                source: &source,
                width: 200,
                height: 150,
                quality: Quality::new(85),
            })
            .unwrap();

        assert_eq!(
            image::guess_format(&out).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert_eq!(
            image::load_from_memory(&out).unwrap().dimensions(),
            (200, 150)
        );
    }

    #[test]
    fn recompress_png_input_outputs_jpeg() {
        let backend = RustBackend::new();
        let source = gray_png(64, 48, 128);
        let out = backend
            .recompress(&RecompressParams {
                source: &source,
                width: 64,
                height: 48,
                quality: Quality::new(85),
            })
            .unwrap();
        assert_eq!(
            image::guess_format(&out).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn flatten_composites_transparency_onto_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flat = flatten(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn transform_center_crop_shrinks_dimensions() {
        let backend = RustBackend::new();
        let source = split_jpeg(100, 50);
        let out = backend
            .transform(&TransformParams {
                source: &source,
                transform: ImageTransform::CenterCrop(0.98),
                quality: Quality::default(),
            })
            .unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (98, 49));
    }

    #[test]
    fn transform_mirror_swaps_halves() {
        let backend = RustBackend::new();
        let source = split_jpeg(64, 16);
        let out = backend
            .transform(&TransformParams {
                source: &source,
                transform: ImageTransform::Mirror,
                quality: Quality::default(),
            })
            .unwrap();

        let img = image::load_from_memory(&out).unwrap().to_luma8();
        assert!(
            img.get_pixel(2, 8).0[0] > 200,
            "left edge should now be white"
        );
        assert!(
            img.get_pixel(61, 8).0[0] < 50,
            "right edge should now be black"
        );
    }

    #[test]
    fn transform_brightness_raises_mean() {
        let backend = RustBackend::new();
        let source = gray_png(32, 32, 100);
        let out = backend
            .transform(&TransformParams {
                source: &source,
                transform: ImageTransform::Brightness(1.03),
                quality: Quality::new(100),
            })
            .unwrap();
        assert!(mean_luma(&out) > 101.0);
    }

    #[test]
    fn transform_contrast_darkens_dark_tones() {
        let backend = RustBackend::new();
        let source = gray_png(32, 32, 40);
        let out = backend
            .transform(&TransformParams {
                source: &source,
                transform: ImageTransform::Contrast(1.2),
                quality: Quality::new(100),
            })
            .unwrap();
        assert!(mean_luma(&out) < 30.0);
    }

    #[test]
    fn transform_garbage_errors() {
        let backend = RustBackend::new();
        let result = backend.transform(&TransformParams {
            source: &[0u8; 8],
            transform: ImageTransform::Mirror,
            quality: Quality::default(),
        });
        assert!(result.is_err());
    }
}
