//! Audio tag metadata extraction using lofty
//!
//! Tag reading never fails a batch: corrupt, untagged or unsupported files
//! simply resolve to empty metadata and get fallback naming downstream.

use std::path::Path;

use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;

use crate::types::TagMetadata;

/// Tag reading facility the planner depends on.
///
/// Implementations must not fail on unreadable files; absence of metadata is
/// an empty `TagMetadata`, not an error.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> TagMetadata;
}

/// lofty-backed tag reader used in production
#[derive(Debug, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> TagMetadata {
        let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Could not read tags for file {}: {}", path.display(), e);
                return TagMetadata::default();
            }
        };

        let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => tag,
            None => return TagMetadata::default(),
        };

        let metadata = TagMetadata {
            artist: non_empty(tag.artist().map(|s| s.to_string())),
            album: non_empty(tag.album().map(|s| s.to_string())),
            albumartist: non_empty(tag.get_string(&ItemKey::AlbumArtist).map(str::to_string)),
            title: non_empty(tag.title().map(|s| s.to_string())),
            track: tag.track(),
            tracktotal: tag.track_total(),
            discnumber: tag.disk(),
            genre: non_empty(tag.genre().map(|s| s.to_string())),
            date: tag.year().map(|y| y.to_string()),
        };

        tracing::debug!(
            file = %path.display(),
            artist = ?metadata.artist,
            album = ?metadata.album,
            title = ?metadata.title,
            "Tags extracted"
        );

        metadata
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
