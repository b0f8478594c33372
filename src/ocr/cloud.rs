//! Client for the OCR.space parse API.
//!
//! Only the request/response plumbing lives here. Credential selection and
//! the retry policy are in the gateway.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::error::OcrError;

/// One OCR call: the data-URL payload and whether to request table output.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    pub payload: &'a str,
    pub table_mode: bool,
}

/// Parsed text for one page of the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParsedResult {
    #[serde(default)]
    pub parsed_text: String,
}

/// Response body of the parse endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrSpaceResponse {
    #[serde(default)]
    pub parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    pub is_errored_on_processing: bool,
    /// A string or a list of strings depending on the failure
    #[serde(default)]
    pub error_message: Option<Value>,
}

impl OcrSpaceResponse {
    /// Flattens `ErrorMessage` into one line.
    pub fn error_text(&self) -> String {
        match &self.error_message {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
            _ => "OCR processing failed".to_string(),
        }
    }

    /// Returns the text of the first parsed result, or a typed processing error.
    ///
    /// `is_retry` marks a response to a call already made with the fallback key.
    pub fn into_text(self, is_retry: bool) -> Result<String, OcrError> {
        if self.is_errored_on_processing {
            return Err(OcrError::processing(self.error_text(), is_retry));
        }

        Ok(self
            .parsed_results
            .and_then(|results| results.into_iter().next())
            .map(|r| r.parsed_text)
            .unwrap_or_default())
    }
}

/// Sends one request to an OCR service.
pub trait OcrTransport {
    fn submit(&self, request: &OcrRequest<'_>, api_key: &str) -> Result<OcrSpaceResponse, OcrError>;
}

/// Blocking HTTP client for OCR.space.
pub struct OcrSpaceClient {
    client: Client,
    endpoint: String,
}

impl OcrSpaceClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, OcrError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cogitator-ocr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

/// Builds the multipart form fields for a request.
fn form_fields(request: &OcrRequest<'_>) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("base64Image", request.payload.to_string()),
        ("language", "eng".to_string()),
        ("isOverlayRequired", "false".to_string()),
        ("OCREngine", "2".to_string()),
        ("scale", "true".to_string()),
    ];
    if request.table_mode {
        fields.push(("isTable", "true".to_string()));
    }
    fields
}

/// Parses a response body. Bodies that are not the expected JSON (plain-text
/// quota or key errors) become processing errors carrying the body text.
fn parse_response(status: StatusCode, body: &str) -> OcrSpaceResponse {
    match serde_json::from_str::<OcrSpaceResponse>(body) {
        Ok(parsed) => parsed,
        Err(_) => OcrSpaceResponse {
            parsed_results: None,
            is_errored_on_processing: true,
            error_message: Some(Value::String(format!("HTTP {}: {}", status, body.trim()))),
        },
    }
}

impl OcrTransport for OcrSpaceClient {
    fn submit(&self, request: &OcrRequest<'_>, api_key: &str) -> Result<OcrSpaceResponse, OcrError> {
        let form = form_fields(request)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        Ok(parse_response(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields_table_mode() {
        let request = OcrRequest {
            payload: "data:image/jpeg;base64,AAAA",
            table_mode: true,
        };
        let fields = form_fields(&request);
        assert!(fields.contains(&("OCREngine", "2".to_string())));
        assert!(fields.contains(&("isTable", "true".to_string())));

        let request = OcrRequest {
            table_mode: false,
            ..request
        };
        assert!(!form_fields(&request).iter().any(|(name, _)| *name == "isTable"));
    }

    #[test]
    fn test_parse_success_body() {
        let body = r#"{"ParsedResults":[{"ParsedText":"Kills 1 2 3\r\n","FileParseExitCode":1}],"OCRExitCode":1,"IsErroredOnProcessing":false}"#;
        let text = parse_response(StatusCode::OK, body).into_text(false).unwrap();
        assert_eq!(text, "Kills 1 2 3\r\n");
    }

    #[test]
    fn test_parse_error_list() {
        let body = r#"{"OCRExitCode":99,"IsErroredOnProcessing":true,"ErrorMessage":["Rate limit exceeded","Try later"]}"#;
        let response = parse_response(StatusCode::OK, body);
        assert_eq!(response.error_text(), "Rate limit exceeded; Try later");
        assert!(response.into_text(false).unwrap_err().is_retryable());
    }

    #[test]
    fn test_plain_text_body_is_processing_error() {
        let response = parse_response(StatusCode::FORBIDDEN, "The API key is invalid");
        let err = response.into_text(false).unwrap_err();
        match err {
            OcrError::Processing { cause, retryable, .. } => {
                assert_eq!(cause, super::super::error::ProcessingCause::InvalidCredential);
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_results_give_empty_text() {
        let response = parse_response(StatusCode::OK, r#"{"IsErroredOnProcessing":false}"#);
        assert_eq!(response.into_text(false).unwrap(), "");
    }
}
