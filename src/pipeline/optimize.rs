//! Image optimization: bring an image at or under the byte ceiling.
//!
//! Images already under the ceiling pass through byte-identical with their
//! original extension. Oversized images are flattened to RGB (vision APIs
//! and JPEG both reject palette/alpha modes) and pushed down a quality
//! ladder: re-encode as JPEG starting at quality 95, stepping down by 5 to a
//! floor of 20; if the floor still overshoots, scale both dimensions by
//! `sqrt(ceiling / current_size)` — the factor that would hit the target if
//! size scaled linearly with pixel count — reset quality to 95 and repeat.
//!
//! The ladder converges because every resize strictly shrinks the pixel
//! count, but a hard pass cap bounds it anyway: a pathological input fails
//! with [`ImageError::OptimizationFailed`] instead of spinning.

use crate::error::ImageError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Hard bound on JPEG encode attempts across all quality/resize rounds.
/// 16 quality steps per round and a dimension-halving resize between rounds
/// make 64 passes unreachable for any real image.
const MAX_ENCODE_PASSES: u32 = 64;

/// Quality ladder parameters.
const QUALITY_START: u8 = 95;
const QUALITY_STEP: u8 = 5;
const QUALITY_FLOOR: u8 = 20;

/// An image ready for the media store.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    /// Encoded bytes, at or under the ceiling.
    pub bytes: Vec<u8>,
    /// Extension for the stored filename: the source extension when the
    /// image passed through untouched, `jpg` when it was re-encoded.
    pub ext: String,
}

/// Optimize the image at `path` to at most `size_limit` bytes.
///
/// Purely CPU-and-disk bound; callers on the async runtime should wrap this
/// in `spawn_blocking`.
pub fn optimize(path: &Path, size_limit: u64) -> Result<OptimizedImage, ImageError> {
    let failed = |detail: String| ImageError::OptimizationFailed {
        path: path.to_path_buf(),
        detail,
    };

    let metadata = std::fs::metadata(path).map_err(|e| failed(e.to_string()))?;
    if metadata.len() <= size_limit {
        let bytes = std::fs::read(path).map_err(|e| failed(e.to_string()))?;
        return Ok(OptimizedImage {
            bytes,
            ext: source_extension(path),
        });
    }

    let decoded = image::open(path).map_err(|e| failed(e.to_string()))?;
    // Flatten palette/alpha modes; JPEG encodes RGB only.
    let mut img: RgbImage = decoded.to_rgb8();
    let mut quality = QUALITY_START;

    for _pass in 0..MAX_ENCODE_PASSES {
        let bytes = encode_jpeg(&img, quality).map_err(|e| failed(e.to_string()))?;

        if bytes.len() as u64 <= size_limit {
            info!(
                "Compressed {} to {:.2} MB (quality {}, {}x{})",
                path.display(),
                bytes.len() as f64 / (1024.0 * 1024.0),
                quality,
                img.width(),
                img.height()
            );
            return Ok(OptimizedImage {
                bytes,
                ext: "jpg".to_string(),
            });
        }

        if quality > QUALITY_FLOOR {
            quality -= QUALITY_STEP;
        } else {
            // Quality exhausted: shrink dimensions and restart the ladder.
            let factor = (size_limit as f64 / bytes.len() as f64).sqrt();
            let width = ((img.width() as f64 * factor) as u32).max(1);
            let height = ((img.height() as f64 * factor) as u32).max(1);
            debug!(
                "Quality floor reached for {}; resizing to {}x{}",
                path.display(),
                width,
                height
            );
            img = image::imageops::resize(&img, width, height, FilterType::Lanczos3);
            quality = QUALITY_START;
        }
    }

    Err(failed(format!(
        "still over {size_limit} bytes after {MAX_ENCODE_PASSES} encode passes"
    )))
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder.encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

fn source_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = RgbImage::from_fn(width, height, |x, y| {
            // Per-pixel noise defeats PNG compression so the file has real size.
            Rgb([
                (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8,
                (x.wrapping_add(y)) as u8,
                (x ^ y) as u8,
            ])
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn under_limit_passes_through_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "small.png", 8, 8);
        let original = std::fs::read(&path).unwrap();

        let out = optimize(&path, 10 * 1024 * 1024).unwrap();
        assert_eq!(out.bytes, original);
        assert_eq!(out.ext, "png");
    }

    #[test]
    fn oversized_image_is_reencoded_under_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "big.png", 256, 256);
        let original_size = std::fs::metadata(&path).unwrap().len();
        let limit = original_size / 2;

        let out = optimize(&path, limit).unwrap();
        assert!(out.bytes.len() as u64 <= limit, "{} > {limit}", out.bytes.len());
        assert_eq!(out.ext, "jpg");
        // The output is a JPEG stream.
        assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn tight_limit_forces_resize_rounds() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "noise.png", 200, 200);

        // Tight enough that noise at the quality floor still overshoots,
        // forcing at least one resize round.
        let out = optimize(&path, 5_000).unwrap();
        assert!(out.bytes.len() <= 5_000, "got {}", out.bytes.len());
        assert_eq!(out.ext, "jpg");
    }

    #[test]
    fn unreadable_path_is_optimization_failure() {
        let err = optimize(Path::new("/no/such/image.png"), 1024).unwrap_err();
        assert!(matches!(err, ImageError::OptimizationFailed { .. }));
    }
}
