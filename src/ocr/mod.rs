pub mod cloud;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod preprocess;
pub mod setup;

pub use gateway::{CredentialSlot, OcrGateway, OcrPassResult};
pub use preprocess::{RawCapture, RegionTag, split_for_ocr};

use anyhow::{Context, Result};
use tracing::info;

/// Text from both passes over one screenshot.
#[derive(Debug, Clone)]
pub struct ScreenshotText {
    pub header: OcrPassResult,
    pub stats: OcrPassResult,
}

impl ScreenshotText {
    /// `[LEFT]\n<header>\n[RIGHT]\n<stats>`
    pub fn combined(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            RegionTag::Header.marker(),
            self.header.text,
            RegionTag::Stats.marker(),
            self.stats.text
        )
    }
}

/// High-level function: screenshot → text via dual-pass OCR.
///
/// Splits the capture, runs the header pass without table mode, then the
/// stats pass with table mode. The passes run in order so a credential switch
/// made by the header pass applies to the stats pass.
pub fn ocr_screenshot(
    capture: &RawCapture,
    gateway: &OcrGateway,
    slot: &mut CredentialSlot,
    max_size_kb: u32,
) -> Result<ScreenshotText> {
    info!("Splitting {} ({}x{})", capture.source, capture.width(), capture.height());
    let regions = split_for_ocr(capture, max_size_kb)?;

    info!("OCR: left half (headers)...");
    let header = gateway
        .recognize(&regions.header, false, slot)
        .with_context(|| format!("OCR failed on header of {}", capture.source))?;

    info!("OCR: right half (stats)...");
    let stats = gateway
        .recognize(&regions.stats, true, slot)
        .with_context(|| format!("OCR failed on stats of {}", capture.source))?;

    Ok(ScreenshotText { header, stats })
}
