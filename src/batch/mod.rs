//! One upload batch: screenshots in, result map out.
//!
//! Screenshots are processed strictly one after another. All accumulated
//! state (OCR text, pass records, the credential in use) lives in a
//! [`BatchContext`] owned by the call, so nothing carries over between
//! batches.

pub mod csv_writer;
pub mod report;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::extract::{ResultMap, parse_game_data};
use crate::ocr::{CredentialSlot, OcrGateway, OcrPassResult, RawCapture, ocr_screenshot};

/// Appended after each screenshot's text.
pub const IMAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Request-scoped state for one batch.
#[derive(Debug, Default)]
pub struct BatchContext {
    raw_text: String,
    slot: CredentialSlot,
    passes: Vec<OcrPassResult>,
    sources: Vec<String>,
}

/// Everything a finished batch produced.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Concatenated OCR text of every screenshot
    pub raw_text: String,
    pub passes: Vec<OcrPassResult>,
    pub sources: Vec<String>,
    pub results: ResultMap,
    /// True if the fallback credential was used at any point
    pub used_fallback: bool,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs both OCR passes over one screenshot and appends its text.
    pub fn process(&mut self, capture: &RawCapture, gateway: &OcrGateway, max_size_kb: u32) -> Result<()> {
        let was_fallback = self.slot.is_fallback();
        let text = ocr_screenshot(capture, gateway, &mut self.slot, max_size_kb)?;
        if self.slot.is_fallback() && !was_fallback {
            info!("Fallback OCR credential active for the rest of the batch");
        }

        self.raw_text.push_str(&text.combined());
        self.raw_text.push_str(IMAGE_SEPARATOR);
        self.sources.push(capture.source.clone());
        self.passes.push(text.header);
        self.passes.push(text.stats);
        Ok(())
    }

    /// Parses the accumulated text.
    pub fn finish(self) -> BatchOutcome {
        let results = parse_game_data(&self.raw_text);
        BatchOutcome {
            results,
            used_fallback: self.slot.is_fallback(),
            raw_text: self.raw_text,
            passes: self.passes,
            sources: self.sources,
        }
    }
}

/// Processes every capture in order, then parses the combined text.
///
/// The first failure (decode or OCR) aborts the batch. Captures are pulled
/// from the iterator one at a time, so a path-backed iterator only decodes
/// the image currently being processed.
pub fn run_batch<I>(captures: I, gateway: &OcrGateway, max_size_kb: u32) -> Result<BatchOutcome>
where
    I: IntoIterator<Item = Result<RawCapture>>,
{
    let mut context = BatchContext::new();

    for (index, capture) in captures.into_iter().enumerate() {
        let capture = capture.with_context(|| format!("Failed to load screenshot {}", index + 1))?;
        info!("Processing screenshot {} ({})", index + 1, capture.source);
        context
            .process(&capture, gateway, max_size_kb)
            .with_context(|| format!("Screenshot {} failed", index + 1))?;
    }

    let outcome = context.finish();
    info!(
        "Batch complete: {} screenshots, {} OCR passes, {} fields detected{}",
        outcome.sources.len(),
        outcome.passes.len(),
        outcome.results.len(),
        if outcome.used_fallback { " (fallback key used)" } else { "" }
    );
    for pass in &outcome.passes {
        debug!("{} pass: {}", pass.region.marker(), pass.engine);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FieldValue, PlayerField, ResultKey, StatField};
    use crate::ocr::gateway::testing::*;
    use image::{ImageBuffer, Rgba};

    fn capture(source: &str) -> RawCapture {
        RawCapture::from_image(ImageBuffer::from_pixel(1600, 900, Rgba([20, 20, 20, 255])), source)
    }

    #[test]
    fn test_two_screenshot_batch() {
        let transport = ScriptedTransport::new(vec![
            ok("MISSION: INFERNO STATUS: SUCCESS"),
            ok("Kills 10 20 30\nDamage Taken 5 6 7"),
            ok(""),
            ok(""),
        ]);
        let flags = transport.table_flags.clone();
        let gateway = OcrGateway::cloud(Box::new(transport), credentials());

        let outcome = run_batch(vec![Ok(capture("a.png")), Ok(capture("b.png"))], &gateway, 900).unwrap();
        let results = &outcome.results;

        assert_eq!(results.get(ResultKey::MissionName), Some(&FieldValue::from("Inferno")));
        assert_eq!(results.get(ResultKey::Objective), Some(&FieldValue::from("1")));
        for (slot, kills, damage) in [(1, 10, 5), (2, 20, 6), (3, 30, 7)] {
            assert_eq!(results.get(ResultKey::stat(slot, StatField::Kills)), Some(&FieldValue::Int(kills)));
            assert_eq!(results.get(ResultKey::stat(slot, StatField::Damage)), Some(&FieldValue::Int(damage)));
            assert!(!results.contains(ResultKey::player(slot, PlayerField::Name)));
            assert!(!results.contains(ResultKey::player(slot, PlayerField::Class)));
        }

        assert_eq!(*flags.borrow(), vec![false, true, false, true]);
        assert_eq!(outcome.sources, vec!["a.png", "b.png"]);
        assert_eq!(outcome.passes.len(), 4);
        assert!(outcome.raw_text.starts_with("[LEFT]\nMISSION: INFERNO STATUS: SUCCESS\n[RIGHT]\nKills"));
        assert_eq!(outcome.raw_text.matches(IMAGE_SEPARATOR).count(), 2);
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_fallback_switch_persists_across_screenshots() {
        let transport = ScriptedTransport::new(vec![failed("Rate limit exceeded"), ok("VICTORY")]);
        let keys = transport.keys_used.clone();
        let gateway = OcrGateway::cloud(Box::new(transport), credentials());

        let outcome = run_batch(vec![Ok(capture("a.png")), Ok(capture("b.png"))], &gateway, 900).unwrap();

        assert!(outcome.used_fallback);
        let keys = keys.borrow();
        assert_eq!(keys[0], "primary-key");
        assert!(keys[1..].iter().all(|k| k == "fallback-key"));
        assert_eq!(outcome.results.get(ResultKey::Objective), Some(&FieldValue::from("1")));
    }

    #[test]
    fn test_failure_aborts_batch() {
        let transport = ScriptedTransport::new(vec![failed("Unable to recognize the file type")]);
        let keys = transport.keys_used.clone();
        let gateway = OcrGateway::cloud(Box::new(transport), credentials());

        let result = run_batch(vec![Ok(capture("a.png")), Ok(capture("b.png"))], &gateway, 900);

        assert!(result.is_err());
        assert_eq!(keys.borrow().len(), 1);
    }

    #[test]
    fn test_decode_failure_aborts_batch() {
        let gateway = OcrGateway::cloud(Box::new(ScriptedTransport::new(Vec::new())), credentials());
        let captures = vec![Ok(capture("a.png")), Err(anyhow::anyhow!("not an image"))];

        let err = run_batch(captures, &gateway, 900).unwrap_err();
        assert!(err.to_string().contains("screenshot 2"));
    }
}
