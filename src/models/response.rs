use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Text pulled out of a staged document, pages joined in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub pages: usize,
}

impl ExtractedText {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_content(&self) -> bool {
        self.text.chars().any(|c| !c.is_whitespace())
    }
}

/// The delegate's output after it has been checked to be a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredResult(pub Map<String, Value>);

impl StructuredResult {
    /// Parses delegate output. Anything that is not a top-level JSON object
    /// is rejected.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| AppError::invalid_delegate_output(e.to_string()))?;

        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AppError::invalid_delegate_output(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub data: ResumeData,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeData {
    pub fields: StructuredResult,
    pub pages: usize,
    pub text_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub scratch_ready: bool,
    pub staged_files: usize,
    pub delegate: DelegateStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DelegateStatus {
    pub name: String,
    pub available: bool,
}

/// Body of every error response. `data` is always `null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub data: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    pub timestamp: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: String, request_id: String) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                request_id: Some(request_id),
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
            data: None,
        }
    }
}

impl ProcessResponse {
    pub fn new(fields: StructuredResult, extracted: &ExtractedText, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            data: ResumeData {
                fields,
                pages: extracted.pages,
                text_length: extracted.text.chars().count(),
            },
            processing_time_ms,
        }
    }
}
