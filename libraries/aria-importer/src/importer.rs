//! Batch upload orchestration

use crate::filter::{display_name, is_audio_file};
use crate::{ImportError, Result, UploadedFile};
use aria_core::Song;

/// Creates playable locators for uploaded files
///
/// In the browser this is an object URL over the file's bytes. `index` is the
/// file's position in the batch, so hosts can keep the handles alongside.
pub trait LocatorFactory {
    fn create_locator(&mut self, index: usize, file: &UploadedFile) -> Result<String>;
}

impl<F> LocatorFactory for F
where
    F: FnMut(usize, &UploadedFile) -> Result<String>,
{
    fn create_locator(&mut self, index: usize, file: &UploadedFile) -> Result<String> {
        self(index, file)
    }
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Accepted songs, in batch order
    pub songs: Vec<Song>,

    /// Names of files that were not audio
    pub skipped: Vec<String>,

    /// Audio files whose locator could not be created
    pub failed: Vec<ImportError>,
}

impl ImportReport {
    /// Whether at least one song was accepted
    pub fn has_songs(&self) -> bool {
        !self.songs.is_empty()
    }
}

/// Upload intake
#[derive(Debug, Default)]
pub struct UploadImporter;

impl UploadImporter {
    pub fn new() -> Self {
        Self
    }

    /// Turn a batch of files into songs
    ///
    /// Non-audio files are skipped. A file whose locator cannot be created is
    /// logged and left out; the rest of the batch still goes through.
    pub fn import(
        &self,
        files: &[UploadedFile],
        locators: &mut dyn LocatorFactory,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for (index, file) in files.iter().enumerate() {
            if !is_audio_file(file) {
                tracing::debug!("Skipping non-audio upload: {}", file.name);
                report.skipped.push(file.name.clone());
                continue;
            }

            match locators.create_locator(index, file) {
                Ok(url) => report.songs.push(Song::new(display_name(&file.name), url)),
                Err(e) => {
                    tracing::error!("Error processing upload {}: {}", file.name, e);
                    report.failed.push(e);
                }
            }
        }

        if report.has_songs() {
            tracing::info!("Successfully uploaded {} songs", report.songs.len());
        }
        report
    }
}
