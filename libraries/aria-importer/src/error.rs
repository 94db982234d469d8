//! Error types for upload intake

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not create a locator for {name}: {reason}")]
    Locator { name: String, reason: String },
}

impl ImportError {
    /// Locator creation failed for `name`
    pub fn locator(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Locator {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
