use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::paths::get_tesseract_dir;

/// Locations of a usable local Tesseract install.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// None means tesseract uses its compiled-in default
    pub tessdata: Option<PathBuf>,
}

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

const COMMON_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

const SYSTEM_TESSDATA_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

/// Locates the local OCR engine. Returns None when Tesseract is not installed.
pub fn locate_tesseract(configured: Option<&Path>) -> Option<TesseractPaths> {
    let executable = find_tesseract_executable(configured)?;
    let tessdata = find_tessdata_dir();
    debug!(
        "Local OCR engine: {} (tessdata: {:?})",
        executable.display(),
        tessdata
    );
    Some(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable: configured path, our local dir, PATH, then
/// common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        debug!("Configured tesseract path {} does not exist", path.display());
    }

    let local_exe = get_tesseract_dir().join(EXECUTABLE_NAME);
    if local_exe.exists() {
        return Some(local_exe);
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Some(PathBuf::from("tesseract"));
        }
    }

    COMMON_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Finds a tessdata directory containing eng.traineddata.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let local_tessdata = get_tesseract_dir().join("tessdata");
    if local_tessdata.join("eng.traineddata").exists() {
        return Some(local_tessdata);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
        let p = p.join("tessdata");
        if p.join("eng.traineddata").exists() {
            return Some(p);
        }
    }

    SYSTEM_TESSDATA_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.join("eng.traineddata").exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_path_wins() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("my-tesseract");
        std::fs::write(&exe, "").unwrap();

        assert_eq!(find_tesseract_executable(Some(&exe)), Some(exe));
    }
}
