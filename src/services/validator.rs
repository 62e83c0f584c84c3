use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{UploadRequest, ValidatedUpload};

/// Checks an upload's presence and filename against the extension allow-list.
/// Never touches the filesystem.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    /// `allowed_extensions` are expected lowercase and dot-prefixed, as
    /// produced by [`crate::config::normalize_extensions`].
    pub fn new(allowed_extensions: Vec<String>) -> Self {
        Self { allowed_extensions }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn validate(&self, upload: Option<&UploadRequest>) -> AppResult<ValidatedUpload> {
        let upload = upload.ok_or(AppError::MissingFile)?;

        if upload.file_name.is_empty() {
            return Err(AppError::EmptySelection);
        }

        let sanitized_name = sanitize_filename(&upload.file_name);
        let extension = extension_of(&sanitized_name).unwrap_or_default();

        if extension.is_empty() || !self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            debug!(
                sanitized_name = %sanitized_name,
                extension = %extension,
                "Rejected upload with unsupported extension"
            );
            return Err(AppError::unsupported_extension(extension));
        }

        Ok(ValidatedUpload {
            original_name: upload.file_name.clone(),
            sanitized_name,
            extension,
        })
    }
}

/// Reduces a client-supplied filename to a safe ASCII basename.
///
/// Keeps only the last path component, maps whitespace to `_`, drops anything
/// outside `[A-Za-z0-9._-]` (null bytes included) and strips leading and
/// trailing dots and underscores. May return an empty string.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Lowercased, dot-prefixed extension of a sanitized filename.
fn extension_of(sanitized: &str) -> Option<String> {
    let idx = sanitized.rfind('.')?;
    if idx == 0 || idx + 1 == sanitized.len() {
        return None;
    }
    Some(format!(".{}", sanitized[idx + 1..].to_ascii_lowercase()))
}
