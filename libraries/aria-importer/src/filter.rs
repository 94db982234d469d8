//! Audio file recognition

use crate::UploadedFile;

/// Extensions accepted regardless of declared media type
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];

/// Media type prefix accepted regardless of extension
const AUDIO_MEDIA_TYPE_PREFIX: &str = "audio/";

/// Check whether a file counts as audio
///
/// Either the declared media type is `audio/*` or the name ends in a supported
/// extension (case-insensitive).
pub fn is_audio_file(file: &UploadedFile) -> bool {
    file.media_type.starts_with(AUDIO_MEDIA_TYPE_PREFIX) || has_supported_extension(&file.name)
}

/// Check the file name against [`SUPPORTED_EXTENSIONS`]
pub fn has_supported_extension(name: &str) -> bool {
    extension(name).is_some_and(|ext| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
    })
}

/// Display name for a file: the name with its last extension removed
///
/// Names that would become empty (".mp3") are kept whole.
pub fn display_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if extension(name).is_some() && dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Text after the last dot, if it is a non-empty extension without a path separator
fn extension(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        None
    } else {
        Some(ext)
    }
}
