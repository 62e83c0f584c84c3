use bytes::Bytes;

/// One uploaded file as read off the wire. Lives only for the request that
/// carried it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content: Bytes,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// An upload whose filename passed the allow-list check.
///
/// Only `extension` is used past this point; the sanitized name is kept for
/// logging and never reaches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub original_name: String,
    pub sanitized_name: String,
    pub extension: String,
}
