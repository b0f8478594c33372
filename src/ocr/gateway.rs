//! Routes OCR passes to the cloud service or the local engine.
//!
//! The cloud path owns the credential escalation policy: a rate-limit or
//! invalid-key rejection on the primary key switches the batch to the
//! fallback key and retries the call once. The switch is recorded in the
//! caller's [`CredentialSlot`] so every later pass in the batch keeps using
//! the fallback key.

use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use super::cloud::{OcrRequest, OcrSpaceClient, OcrTransport};
use super::engine::{LocalEngine, TesseractEngine};
use super::error::OcrError;
use super::preprocess::{ImageRegion, RegionTag};
use super::setup::locate_tesseract;
use crate::config::AppConfig;

/// Primary and optional fallback API keys.
#[derive(Clone)]
pub struct Credentials {
    primary: String,
    fallback: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("primary", &"<redacted>")
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn new(primary: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback,
        }
    }

    /// Returns the key at index 0 (primary) or 1 (fallback).
    pub fn key(&self, index: usize) -> Option<&str> {
        match index {
            0 => Some(&self.primary),
            1 => self.fallback.as_deref(),
            _ => None,
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    fn for_slot(&self, slot: CredentialSlot) -> &str {
        self.key(slot.index()).unwrap_or(&self.primary)
    }
}

/// The credential a batch is currently using. Only ever moves from primary
/// to fallback.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSlot {
    index: usize,
}

impl CredentialSlot {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn is_fallback(self) -> bool {
        self.index > 0
    }

    fn switch_to_fallback(&mut self) {
        self.index = 1;
    }
}

/// Which engine produced a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Cloud { credential: usize },
    Local,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Cloud { credential: 0 } => write!(f, "cloud (primary key)"),
            EngineKind::Cloud { .. } => write!(f, "cloud (fallback key)"),
            EngineKind::Local => write!(f, "local"),
        }
    }
}

/// Text returned by one OCR pass.
#[derive(Debug, Clone)]
pub struct OcrPassResult {
    pub region: RegionTag,
    pub text: String,
    pub engine: EngineKind,
}

enum Backend {
    Cloud {
        transport: Box<dyn OcrTransport>,
        credentials: Credentials,
    },
    Local(Box<dyn LocalEngine>),
}

pub struct OcrGateway {
    backend: Backend,
}

impl OcrGateway {
    /// Picks the backend from configuration: cloud when a key is configured,
    /// otherwise the local Tesseract engine.
    pub fn from_config(config: &AppConfig) -> Result<Self, OcrError> {
        if let Some(credentials) = config.credentials() {
            let client = OcrSpaceClient::new(
                config.ocr_endpoint.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            info!(
                "Using cloud OCR at {} ({} key(s))",
                config.ocr_endpoint,
                if credentials.has_fallback() { 2 } else { 1 }
            );
            return Ok(Self::cloud(Box::new(client), credentials));
        }

        let paths = locate_tesseract(config.tesseract_path.as_deref()).ok_or(OcrError::Unavailable)?;
        warn!(
            "No OCR API key configured, using local Tesseract at {} (less accurate)",
            paths.executable.display()
        );
        Ok(Self::local(Box::new(TesseractEngine::new(paths))))
    }

    pub fn cloud(transport: Box<dyn OcrTransport>, credentials: Credentials) -> Self {
        Self {
            backend: Backend::Cloud {
                transport,
                credentials,
            },
        }
    }

    pub fn local(engine: Box<dyn LocalEngine>) -> Self {
        Self {
            backend: Backend::Local(engine),
        }
    }

    /// Runs one OCR pass over a region.
    ///
    /// `slot` is the batch's credential state; it may be switched to the
    /// fallback key by this call.
    pub fn recognize(
        &self,
        region: &ImageRegion,
        table_mode: bool,
        slot: &mut CredentialSlot,
    ) -> Result<OcrPassResult, OcrError> {
        match &self.backend {
            Backend::Local(engine) => Ok(OcrPassResult {
                region: region.tag,
                text: engine.recognize(region, table_mode)?,
                engine: EngineKind::Local,
            }),
            Backend::Cloud {
                transport,
                credentials,
            } => {
                let request = OcrRequest {
                    payload: &region.payload,
                    table_mode,
                };
                let text = recognize_cloud(transport.as_ref(), credentials, &request, slot)?;
                Ok(OcrPassResult {
                    region: region.tag,
                    text,
                    engine: EngineKind::Cloud {
                        credential: slot.index(),
                    },
                })
            }
        }
    }
}

fn recognize_cloud(
    transport: &dyn OcrTransport,
    credentials: &Credentials,
    request: &OcrRequest<'_>,
    slot: &mut CredentialSlot,
) -> Result<String, OcrError> {
    let is_retry = slot.is_fallback();
    let result = transport
        .submit(request, credentials.for_slot(*slot))
        .and_then(|response| response.into_text(is_retry));

    match result {
        Err(err) if err.is_retryable() && credentials.has_fallback() => {
            warn!("OCR service rejected primary key ({}), trying fallback key", err);
            slot.switch_to_fallback();
            transport
                .submit(request, credentials.for_slot(*slot))?
                .into_text(true)
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::ocr::cloud::{OcrSpaceResponse, ParsedResult};

    pub type Scripted = Result<OcrSpaceResponse, OcrError>;

    /// Replays canned responses in order and records the keys used.
    pub struct ScriptedTransport {
        responses: RefCell<VecDeque<Scripted>>,
        pub keys_used: Rc<RefCell<Vec<String>>>,
        pub table_flags: Rc<RefCell<Vec<bool>>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<Scripted>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                keys_used: Rc::new(RefCell::new(Vec::new())),
                table_flags: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl OcrTransport for ScriptedTransport {
        fn submit(&self, request: &OcrRequest<'_>, api_key: &str) -> Result<OcrSpaceResponse, OcrError> {
            self.keys_used.borrow_mut().push(api_key.to_string());
            self.table_flags.borrow_mut().push(request.table_mode);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| ok(""))
        }
    }

    pub fn ok(text: &str) -> Scripted {
        Ok(OcrSpaceResponse {
            parsed_results: Some(vec![ParsedResult {
                parsed_text: text.to_string(),
            }]),
            is_errored_on_processing: false,
            error_message: None,
        })
    }

    pub fn failed(message: &str) -> Scripted {
        Ok(OcrSpaceResponse {
            parsed_results: None,
            is_errored_on_processing: true,
            error_message: Some(serde_json::Value::String(message.to_string())),
        })
    }

    pub fn credentials() -> Credentials {
        Credentials::new("primary-key", Some("fallback-key".to_string()))
    }
}
