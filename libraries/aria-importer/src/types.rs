//! Upload types

use serde::{Deserialize, Serialize};

/// One file handed over by the host's file picker
///
/// Only the metadata the intake needs; the bytes stay with the host, which
/// turns them into a locator on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// File name including extension
    pub name: String,

    /// Declared media type (may be empty)
    #[serde(default, rename = "type")]
    pub media_type: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
        }
    }
}
