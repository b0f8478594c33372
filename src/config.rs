//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides the OCR endpoint,
//! API credentials, the image size budget and local engine overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ocr::gateway::Credentials;

/// Environment variable overriding the primary OCR API key.
pub const API_KEY_ENV: &str = "COGITATOR_OCR_API_KEY";
/// Environment variable overriding the fallback OCR API key.
pub const FALLBACK_API_KEY_ENV: &str = "COGITATOR_OCR_FALLBACK_KEY";

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL of the OCR.space-compatible parse endpoint
    #[serde(default = "default_ocr_endpoint")]
    pub ocr_endpoint: String,
    /// Primary API key. Empty or missing means no cloud OCR.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Secondary API key used after a rate-limit or invalid-key response
    #[serde(default)]
    pub fallback_api_key: Option<String>,
    /// Size ceiling per image region in KB, before base64 expansion
    #[serde(default = "default_max_size_kb")]
    pub max_size_kb: u32,
    /// Timeout for a single OCR request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Explicit path to a tesseract executable for the local engine
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
}

fn default_ocr_endpoint() -> String {
    "https://api.ocr.space/parse/image".to_string()
}

fn default_max_size_kb() -> u32 {
    900
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr_endpoint: default_ocr_endpoint(),
            api_key: None,
            fallback_api_key: None,
            max_size_kb: default_max_size_kb(),
            request_timeout_secs: default_request_timeout_secs(),
            tesseract_path: None,
        }
    }
}

impl AppConfig {
    /// Replaces API keys with values from the environment when set.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(key) = lookup(FALLBACK_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.fallback_api_key = Some(key);
        }
    }

    /// Builds the credential pair for cloud OCR.
    ///
    /// Returns None when no non-empty key is configured, which routes OCR to
    /// the local engine. A lone fallback key is promoted to primary.
    pub fn credentials(&self) -> Option<Credentials> {
        let keys: Vec<String> = [&self.api_key, &self.fallback_api_key]
            .into_iter()
            .flatten()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let mut keys = keys.into_iter();
        let primary = keys.next()?;
        Some(Credentials::new(primary, keys.next()))
    }
}

/// Loads configuration from the given path, or config.json next to the
/// executable, falling back to defaults. Environment overrides are applied last.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(crate::paths::get_config_path);

    info!("Looking for config at: {}", config_path.display());

    let mut config = read_config_file(&config_path).unwrap_or_default();
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config
}

fn read_config_file(config_path: &Path) -> Option<AppConfig> {
    if !config_path.exists() {
        info!("config.json not found. Using default config.");
        return None;
    }

    match fs::read_to_string(config_path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", config_path.display());
                Some(config)
            }
            Err(e) => {
                warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"api_key": "abc"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.max_size_kb, 900);
        assert_eq!(config.ocr_endpoint, "https://api.ocr.space/parse/image");
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = read_config_file(&dir.path().join("missing.json"));
        assert!(config.is_none());
    }

    #[test]
    fn test_load_malformed_file_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_config_file(&path).is_none());
    }

    #[test]
    fn test_env_overrides_replace_keys() {
        let mut config = AppConfig {
            api_key: Some("from-file".to_string()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(|name| match name {
            API_KEY_ENV => Some("from-env".to_string()),
            FALLBACK_API_KEY_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.fallback_api_key, None);
    }

    #[test]
    fn test_credentials_none_without_keys() {
        let config = AppConfig {
            api_key: Some("   ".to_string()),
            ..AppConfig::default()
        };
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_lone_fallback_key_becomes_primary() {
        let config = AppConfig {
            fallback_api_key: Some("second".to_string()),
            ..AppConfig::default()
        };
        let creds = config.credentials().unwrap();
        assert_eq!(creds.key(0), Some("second"));
        assert!(!creds.has_fallback());
    }
}
