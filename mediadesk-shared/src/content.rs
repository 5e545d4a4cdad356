//! Upload payloads for content records
//!

use serde::{Deserialize, Serialize};

/// An uploaded file that has not been committed to the blob store yet.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PendingFile {
    /// Filename as declared by the uploader
    pub filename: String,

    /// MIME type as declared by the uploader (e.g. "image/png")
    pub content_type: String,

    /// Raw payload
    #[serde(default)]
    pub data: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: String, content_type: String, data: Vec<u8>) -> Self {
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Declared length of the upload in bytes
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}
