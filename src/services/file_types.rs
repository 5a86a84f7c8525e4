//! Audio file recognition by extension
//!
//! Other formats will transcode fine as long as ffmpeg can decode them; this
//! set only controls which files directory scans and playlists pick up.

use std::collections::HashSet;
use std::path::Path;

use crate::config::DEFAULT_AUDIO_EXTENSIONS;

/// Recognized audio file extensions, extensible at invocation time
#[derive(Debug, Clone)]
pub struct AudioFileTypes {
    extensions: HashSet<String>,
}

impl AudioFileTypes {
    /// Build the default extension set plus any user-supplied extras.
    pub fn with_extra(extra: &[String]) -> Self {
        let mut extensions: HashSet<String> = DEFAULT_AUDIO_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .collect();
        for ext in extra {
            extensions.insert(ext.trim_start_matches('.').to_lowercase());
        }
        Self { extensions }
    }

    /// Case-insensitive extension match.
    pub fn is_audio_file(&self, path: &Path) -> bool {
        normalized_extension(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }
}

impl Default for AudioFileTypes {
    fn default() -> Self {
        Self::with_extra(&[])
    }
}

/// Lower-cased extension without the leading dot, if any.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}
