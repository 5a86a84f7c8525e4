//! Input expansion and deduplication
//!
//! Turns the CLI-level input list (audio files, directories, playlists) into
//! an ordered sequence of source units, one per distinct physical file.
//! Later references to an already-seen file fold into the existing unit's
//! origin set instead of creating duplicates, which is what bounds the batch
//! to at most one transcode per physical file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::file_scanner::FileScanner;
use super::file_types::AudioFileTypes;
use super::playlist::{self, Playlist, PlaylistEntry};
use crate::types::{PlaylistOrigin, SourceUnit};

/// Result of input resolution
#[derive(Debug, Default)]
pub struct ResolvedInputs {
    /// Deduplicated source units in first-occurrence order
    pub units: Vec<SourceUnit>,
    /// Parsed input playlists with surviving, canonicalized entries; indexes
    /// match `PlaylistOrigin::playlist`
    pub playlists: Vec<Playlist>,
    /// Fatal errors for individual top-level inputs (batch continues)
    pub input_errors: Vec<String>,
    /// Count of playlist entries dropped as missing or unrecognized
    pub dropped_entries: usize,
}

/// Expands CLI inputs into source units
#[derive(Debug)]
pub struct InputResolver {
    file_types: AudioFileTypes,
    scanner: FileScanner,
}

impl InputResolver {
    pub fn new(file_types: AudioFileTypes) -> Self {
        let scanner = FileScanner::new(file_types.clone());
        Self {
            file_types,
            scanner,
        }
    }

    /// Resolve all inputs in order. Deterministic for identical inputs.
    pub fn resolve(&self, inputs: &[PathBuf]) -> ResolvedInputs {
        let mut resolved = ResolvedInputs::default();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for input in inputs {
            if input.is_dir() {
                self.resolve_directory(input, &mut resolved, &mut index);
            } else if playlist::is_playlist(input) {
                self.resolve_playlist(input, &mut resolved, &mut index);
            } else if input.is_file() {
                self.resolve_file(input, &mut resolved, &mut index);
            } else {
                tracing::error!("Input not found: {}", input.display());
                resolved
                    .input_errors
                    .push(format!("Input not found: {}", input.display()));
            }
        }

        resolved
    }

    fn resolve_directory(
        &self,
        dir: &Path,
        resolved: &mut ResolvedInputs,
        index: &mut HashMap<PathBuf, usize>,
    ) {
        match self.scanner.scan(dir) {
            Ok(files) => {
                for file in files {
                    if let Some(path) = canonicalize_logged(&file) {
                        mark_direct(path, &mut resolved.units, index);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Skipping input directory: {}", e);
                resolved.input_errors.push(e.to_string());
            }
        }
    }

    fn resolve_file(
        &self,
        file: &Path,
        resolved: &mut ResolvedInputs,
        index: &mut HashMap<PathBuf, usize>,
    ) {
        if !self.file_types.is_audio_file(file) {
            tracing::warn!("Not a known audio file type: {}", file.display());
            return;
        }
        if let Some(path) = canonicalize_logged(file) {
            mark_direct(path, &mut resolved.units, index);
        }
    }

    fn resolve_playlist(
        &self,
        path: &Path,
        resolved: &mut ResolvedInputs,
        index: &mut HashMap<PathBuf, usize>,
    ) {
        let parsed = match playlist::parse(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Skipping input playlist: {}", e);
                resolved.input_errors.push(e.to_string());
                return;
            }
        };

        let playlist_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut surviving: Vec<PlaylistEntry> = Vec::new();
        for entry in parsed.entries {
            let resolved_path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                playlist_dir.join(&entry.path)
            };
            if !self.file_types.is_audio_file(&resolved_path) {
                tracing::warn!(
                    "Playlist {}: dropping entry not recognized as audio: {}",
                    path.display(),
                    entry.path.display()
                );
                resolved.dropped_entries += 1;
                continue;
            }
            match std::fs::canonicalize(&resolved_path) {
                Ok(canonical) => surviving.push(PlaylistEntry {
                    path: canonical,
                    title: entry.title,
                }),
                Err(e) => {
                    tracing::warn!(
                        "Playlist {}: dropping missing entry {}: {}",
                        path.display(),
                        entry.path.display(),
                        e
                    );
                    resolved.dropped_entries += 1;
                }
            }
        }

        let playlist_index = resolved.playlists.len();
        let total = surviving.len();
        for (i, entry) in surviving.iter().enumerate() {
            let unit_index = unit_for(entry.path.clone(), &mut resolved.units, index);
            resolved.units[unit_index].origins.push(PlaylistOrigin {
                playlist: playlist_index,
                number: i + 1,
                total,
            });
        }

        resolved.playlists.push(Playlist {
            name: parsed.name,
            format: parsed.format,
            path: path.to_path_buf(),
            entries: surviving,
        });
    }
}

/// Find or create the unit for a canonical path, returning its index.
fn unit_for(path: PathBuf, units: &mut Vec<SourceUnit>, index: &mut HashMap<PathBuf, usize>) -> usize {
    if let Some(&i) = index.get(&path) {
        return i;
    }
    let i = units.len();
    index.insert(path.clone(), i);
    units.push(SourceUnit::new(path));
    i
}

fn mark_direct(path: PathBuf, units: &mut Vec<SourceUnit>, index: &mut HashMap<PathBuf, usize>) {
    let i = unit_for(path, units, index);
    units[i].direct = true;
}

fn canonicalize_logged(path: &Path) -> Option<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(canonical) => Some(canonical),
        Err(e) => {
            tracing::warn!("Cannot resolve path {}: {}", path.display(), e);
            None
        }
    }
}
