use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::OcrError;
use super::preprocess::ImageRegion;
use super::setup::TesseractPaths;

/// An on-host text recognizer used when no cloud credential is configured.
pub trait LocalEngine {
    fn recognize(&self, region: &ImageRegion, table_mode: bool) -> Result<String, OcrError>;
}

/// Runs the Tesseract executable on an encoded region.
pub struct TesseractEngine {
    paths: TesseractPaths,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths) -> Self {
        Self { paths }
    }
}

/// Page segmentation mode: 6 assumes one uniform block, which keeps table
/// rows on single lines; 3 is fully automatic layout for the header.
fn page_segmentation_mode(table_mode: bool) -> &'static str {
    if table_mode { "6" } else { "3" }
}

impl LocalEngine for TesseractEngine {
    fn recognize(&self, region: &ImageRegion, table_mode: bool) -> Result<String, OcrError> {
        // Save region to temporary file
        let temp_input = NamedTempFile::with_suffix(".jpg")?;
        std::fs::write(temp_input.path(), &region.jpeg)?;

        let mut command = Command::new(&self.paths.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(page_segmentation_mode(table_mode));

        debug!(
            "Running local OCR on {} region ({}x{})",
            region.tag.marker(),
            region.width,
            region.height
        );

        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Local(format!("Tesseract failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::preprocess::RegionTag;
    use std::path::PathBuf;

    #[test]
    fn test_psm_per_pass() {
        assert_eq!(page_segmentation_mode(true), "6");
        assert_eq!(page_segmentation_mode(false), "3");
    }

    #[test]
    fn test_missing_executable_is_io_error() {
        let engine = TesseractEngine::new(TesseractPaths {
            executable: PathBuf::from("/nonexistent/cogitator/tesseract"),
            tessdata: None,
        });
        let region = ImageRegion {
            tag: RegionTag::Header,
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            payload: String::new(),
            width: 1,
            height: 1,
            quality: 85,
        };

        let err = engine.recognize(&region, false).unwrap_err();
        assert!(matches!(err, OcrError::Io(_)));
    }
}
