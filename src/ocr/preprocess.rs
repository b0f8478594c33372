use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb, Rgba};
use std::path::Path;
use tracing::debug;

/// Fraction of the width that goes to the header (left) region.
const SPLIT_RATIO: f32 = 0.5;

/// Stats crop margins, relative to the right half (horizontal) or full height (vertical).
const STATS_CROP_TOP: f32 = 0.10;
const STATS_CROP_BOTTOM: f32 = 0.15;
const STATS_CROP_LEFT: f32 = 0.05;
const STATS_CROP_RIGHT: f32 = 0.05;

/// Width the stats crop is scaled to before encoding.
pub const STATS_TARGET_WIDTH: u32 = 1200;
/// Smallest width the stats region may shrink to when over budget.
pub const STATS_MIN_WIDTH: u32 = 600;
const STATS_SHRINK_FACTOR: f32 = 0.85;

/// JPEG qualities in percent.
const HEADER_START_QUALITY: u8 = 85;
const STATS_START_QUALITY: u8 = 90;
const SHRINK_QUALITY: u8 = 85;
const QUALITY_STEP: u8 = 10;
pub const MIN_QUALITY: u8 = 40;

/// Base64 expansion allowance applied to the size budget (x1.37).
const BASE64_EXPANSION_PERCENT: usize = 137;

/// One user-submitted screenshot, decoded.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub image: ImageBuffer<Rgba<u8>, Vec<u8>>,
    /// File name or other label, used in logs and reports
    pub source: String,
}

impl RawCapture {
    /// Decodes a screenshot from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load image {}", path.display()))?;
        Ok(Self {
            image: img.to_rgba8(),
            source: path.display().to_string(),
        })
    }

    #[cfg(test)]
    pub fn from_image(image: ImageBuffer<Rgba<u8>, Vec<u8>>, source: impl Into<String>) -> Self {
        Self {
            image,
            source: source.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Which part of the screenshot a region was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTag {
    /// Left half: mission header, player names
    Header,
    /// Right half, cropped and upscaled: the stats table
    Stats,
}

impl RegionTag {
    /// Marker used when concatenating OCR text.
    pub fn marker(self) -> &'static str {
        match self {
            RegionTag::Header => "[LEFT]",
            RegionTag::Stats => "[RIGHT]",
        }
    }
}

/// An encoded region ready for one OCR pass.
#[derive(Debug, Clone)]
pub struct ImageRegion {
    pub tag: RegionTag,
    /// Raw JPEG bytes
    pub jpeg: Vec<u8>,
    /// `data:image/jpeg;base64,...` payload sent to the OCR service
    pub payload: String,
    pub width: u32,
    pub height: u32,
    /// Final JPEG quality in percent
    pub quality: u8,
}

/// Header and stats regions of one screenshot.
#[derive(Debug, Clone)]
pub struct SplitRegions {
    pub header: ImageRegion,
    pub stats: ImageRegion,
}

/// Maximum payload length for a region, in bytes of base64 text.
pub fn payload_budget(max_size_kb: u32) -> usize {
    max_size_kb as usize * 1024 * BASE64_EXPANSION_PERCENT / 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Computes the header rect and the stats crop rect in absolute pixels.
fn split_rects(width: u32, height: u32) -> (PixelRect, PixelRect) {
    let split_x = ((width as f32 * SPLIT_RATIO).round() as u32).min(width - 1);
    let right_width = width - split_x;

    let header = PixelRect {
        x: 0,
        y: 0,
        width: split_x.max(1),
        height,
    };

    let stats_x = (right_width as f32 * STATS_CROP_LEFT).round() as u32;
    let stats_y = ((height as f32 * STATS_CROP_TOP).round() as u32).min(height - 1);
    let stats_w = (right_width as f32 * (1.0 - STATS_CROP_LEFT - STATS_CROP_RIGHT)).round() as u32;
    let stats_h = (height as f32 * (1.0 - STATS_CROP_TOP - STATS_CROP_BOTTOM)).round() as u32;

    let stats = PixelRect {
        x: split_x + stats_x,
        y: stats_y,
        width: stats_w.clamp(1, right_width - stats_x),
        height: stats_h.clamp(1, height - stats_y),
    };

    (header, stats)
}

fn crop(img: &ImageBuffer<Rgba<u8>, Vec<u8>>, rect: PixelRect) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let cropped = imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image();
    DynamicImage::ImageRgba8(cropped).into_rgb8()
}

/// Resizes an image to the given width, preserving aspect ratio.
fn scale_to_width(img: &ImageBuffer<Rgb<u8>, Vec<u8>>, width: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let (w, h) = img.dimensions();
    let height = ((h as f32 * (width as f32 / w as f32)).round() as u32).max(1);
    imageops::resize(img, width, height, FilterType::CatmullRom)
}

fn encode_region(
    img: &ImageBuffer<Rgb<u8>, Vec<u8>>,
    tag: RegionTag,
    quality: u8,
) -> Result<ImageRegion> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(img)
        .context("Failed to encode JPEG region")?;

    let payload = format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(&jpeg));

    Ok(ImageRegion {
        tag,
        jpeg,
        payload,
        width: img.width(),
        height: img.height(),
        quality,
    })
}

/// Encodes at decreasing quality until the payload fits or the floor is hit.
fn compress_to_budget(
    img: &ImageBuffer<Rgb<u8>, Vec<u8>>,
    tag: RegionTag,
    start_quality: u8,
    budget: usize,
) -> Result<ImageRegion> {
    let mut quality = start_quality;
    let mut region = encode_region(img, tag, quality)?;

    while region.payload.len() > budget && quality > MIN_QUALITY {
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
        region = encode_region(img, tag, quality)?;
    }

    Ok(region)
}

/// Splits a screenshot into the header and stats regions for dual-pass OCR.
///
/// The header is the uncropped left half. The stats region is the right half
/// with headers, footers and edge labels cropped away, scaled to
/// [`STATS_TARGET_WIDTH`]. Both are JPEG-compressed to fit
/// `max_size_kb` (after base64 expansion); the stats region additionally
/// shrinks in 15% steps down to [`STATS_MIN_WIDTH`] if quality alone is not enough.
pub fn split_for_ocr(capture: &RawCapture, max_size_kb: u32) -> Result<SplitRegions> {
    let (width, height) = capture.image.dimensions();
    if width < 2 || height < 2 {
        bail!("Image {} is too small to split ({}x{})", capture.source, width, height);
    }

    let budget = payload_budget(max_size_kb);
    let (header_rect, stats_rect) = split_rects(width, height);

    let header_img = crop(&capture.image, header_rect);
    let header = compress_to_budget(&header_img, RegionTag::Header, HEADER_START_QUALITY, budget)?;

    let stats_crop = crop(&capture.image, stats_rect);
    let scaled = scale_to_width(&stats_crop, STATS_TARGET_WIDTH);
    let mut stats = compress_to_budget(&scaled, RegionTag::Stats, STATS_START_QUALITY, budget)?;

    let mut current_width = STATS_TARGET_WIDTH;
    while stats.payload.len() > budget && current_width > STATS_MIN_WIDTH {
        current_width = ((current_width as f32 * STATS_SHRINK_FACTOR).round() as u32)
            .max(STATS_MIN_WIDTH);
        let shrunk = scale_to_width(&stats_crop, current_width);
        stats = encode_region(&shrunk, RegionTag::Stats, SHRINK_QUALITY)?;
    }

    debug!(
        "Split {}: header {}x{} q{} ({} bytes), stats {}x{} q{} ({} bytes), budget {}",
        capture.source,
        header.width,
        header.height,
        header.quality,
        header.payload.len(),
        stats.width,
        stats.height,
        stats.quality,
        stats.payload.len(),
        budget
    );

    Ok(SplitRegions { header, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RawCapture {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        RawCapture::from_image(img, "gradient")
    }

    fn noise(width: u32, height: u32) -> RawCapture {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(2654435761).wrapping_add(y.wrapping_mul(40503)) ^ (x * y);
            Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, 255])
        });
        RawCapture::from_image(img, "noise")
    }

    #[test]
    fn test_split_rects() {
        let (header, stats) = split_rects(1600, 900);
        assert_eq!(header, PixelRect { x: 0, y: 0, width: 800, height: 900 });
        // Right half is 800 wide: skip 40 left, keep 720; skip 90 top, keep 675
        assert_eq!(stats, PixelRect { x: 840, y: 90, width: 720, height: 675 });
    }

    #[test]
    fn test_stats_region_scaled_to_target_width() {
        let capture = gradient(1600, 900);
        let regions = split_for_ocr(&capture, 900).unwrap();

        assert_eq!(regions.header.tag, RegionTag::Header);
        assert_eq!((regions.header.width, regions.header.height), (800, 900));
        assert_eq!(regions.header.quality, 85);

        assert_eq!(regions.stats.tag, RegionTag::Stats);
        assert_eq!(regions.stats.width, STATS_TARGET_WIDTH);
        assert_eq!(regions.stats.height, 1125);
        assert_eq!(regions.stats.quality, 90);
        assert!(regions.stats.payload.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_tiny_budget_hits_floors() {
        let capture = noise(1600, 900);
        let regions = split_for_ocr(&capture, 1).unwrap();

        assert_eq!(regions.header.quality, MIN_QUALITY);
        assert_eq!(regions.stats.width, STATS_MIN_WIDTH);
        assert_eq!(regions.stats.quality, SHRINK_QUALITY);
    }

    #[test]
    fn test_shrunk_widths_follow_factor() {
        let mut width = STATS_TARGET_WIDTH;
        let mut seen = vec![width];
        while width > STATS_MIN_WIDTH {
            width = ((width as f32 * STATS_SHRINK_FACTOR).round() as u32).max(STATS_MIN_WIDTH);
            seen.push(width);
        }
        assert_eq!(seen, vec![1200, 1020, 867, 737, 626, 600]);
    }

    #[test]
    fn test_too_small_image_is_error() {
        let capture = gradient(1, 10);
        assert!(split_for_ocr(&capture, 900).is_err());
    }

    #[test]
    fn test_payload_budget() {
        assert_eq!(payload_budget(900), 1_262_592);
    }
}
