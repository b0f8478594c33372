use thiserror::Error;

/// Why the OCR service rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingCause {
    RateLimited,
    InvalidCredential,
    Other,
}

impl ProcessingCause {
    /// Classifies a service error message.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("invalid api") || lower.contains("api key is invalid") {
            ProcessingCause::InvalidCredential
        } else if lower.contains("limit") {
            ProcessingCause::RateLimited
        } else {
            ProcessingCause::Other
        }
    }

    /// Only credential-related causes can be fixed by swapping the key.
    pub fn is_credential_related(self) -> bool {
        matches!(
            self,
            ProcessingCause::RateLimited | ProcessingCause::InvalidCredential
        )
    }
}

/// Errors produced by the OCR gateway.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{message}")]
    Processing {
        cause: ProcessingCause,
        message: String,
        /// True when a retry with the fallback credential may succeed
        retryable: bool,
    },
    #[error("OCR library not loaded. Configure an API key or install Tesseract.")]
    Unavailable,
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("local OCR failed: {0}")]
    Local(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Builds a processing error from a service message.
    ///
    /// `is_retry` marks a call already made with the fallback credential;
    /// such failures are never retryable.
    pub fn processing(message: impl Into<String>, is_retry: bool) -> Self {
        let message = message.into();
        let cause = ProcessingCause::classify(&message);
        OcrError::Processing {
            cause,
            retryable: cause.is_credential_related() && !is_retry,
            message,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, OcrError::Processing { retryable: true, .. })
    }
}
