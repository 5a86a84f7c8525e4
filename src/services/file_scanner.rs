//! Recursive audio file discovery
//!
//! Directory entries are visited in lexical filename order at every level so
//! repeated scans of the same tree produce identical sequences.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::file_types::AudioFileTypes;

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory cannot be read at all
    #[error("Cannot read directory {0}: {1}")]
    Unreadable(PathBuf, String),
}

/// Audio file scanner
#[derive(Debug, Default)]
pub struct FileScanner {
    file_types: AudioFileTypes,
}

impl FileScanner {
    pub fn new(file_types: AudioFileTypes) -> Self {
        Self { file_types }
    }

    /// Scan a directory tree for audio files.
    ///
    /// Unreadable subdirectories are logged and skipped; only a completely
    /// unreadable root is an error.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root)
            .map_err(|e| ScanError::Unreadable(root.to_path_buf(), e.to_string()))?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && self.file_types.is_audio_file(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry under {}: {}", root.display(), e);
                }
            }
        }

        tracing::debug!(
            "Scan of {} found {} audio files",
            root.display(),
            files.len()
        );

        Ok(files)
    }
}
