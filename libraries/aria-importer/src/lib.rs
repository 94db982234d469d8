//! Aria Player Upload Intake
//!
//! Turns a batch of user-supplied files into songs ready for the playlist store.
//!
//! # Features
//!
//! - Audio filter by declared media type or filename extension
//! - Display names derived from file names
//! - Locator creation delegated to the host (object URLs in the browser)
//! - Mixed batches: rejected files are skipped, never reported as errors
//!
//! # Architecture
//!
//! - `filter`: which files count as audio, and what they are called
//! - `importer`: orchestration of a batch

mod error;
mod types;

pub mod filter;
pub mod importer;

pub use error::ImportError;
pub use importer::{ImportReport, LocatorFactory, UploadImporter};
pub use types::*;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ImportError>;
