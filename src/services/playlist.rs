//! Playlist parsing and serialization
//!
//! Two formats are supported: M3U/M3U8 (plain ordered paths with optional
//! `#EXTINF` display titles) and PLS (`[playlist]` section with `FileN=` /
//! `TitleN=` keys). Both map onto one in-memory representation of ordered
//! entries with optional titles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::file_types::normalized_extension;

/// Playlist handling errors
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// File extension is not a known playlist format
    #[error("Unknown playlist type: {0}")]
    UnsupportedFormat(PathBuf),

    /// I/O error reading or writing a playlist file
    #[error("I/O error for playlist {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// On-disk playlist format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    M3u,
    Pls,
}

impl PlaylistFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlaylistFormat::M3u => "m3u",
            PlaylistFormat::Pls => "pls",
        }
    }
}

/// One playlist entry: a path plus an optional display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub path: PathBuf,
    pub title: Option<String>,
}

/// In-memory playlist, common to both formats
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Playlist name (file stem of the source playlist)
    pub name: String,
    pub format: PlaylistFormat,
    /// Path of the playlist file this was parsed from
    pub path: PathBuf,
    pub entries: Vec<PlaylistEntry>,
}

/// Detect playlist format from the file extension.
pub fn playlist_format(path: &Path) -> Option<PlaylistFormat> {
    match normalized_extension(path)?.as_str() {
        "m3u" | "m3u8" => Some(PlaylistFormat::M3u),
        "pls" => Some(PlaylistFormat::Pls),
        _ => None,
    }
}

pub fn is_playlist(path: &Path) -> bool {
    playlist_format(path).is_some()
}

/// Parse a playlist file into the common representation.
///
/// Entry paths are kept as written (after `file://` decoding); resolution
/// against the playlist's own directory is the input resolver's job.
pub fn parse(path: &Path) -> Result<Playlist, PlaylistError> {
    let format =
        playlist_format(path).ok_or_else(|| PlaylistError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| PlaylistError::Io(path.to_path_buf(), e))?;

    let entries = match format {
        PlaylistFormat::M3u => parse_m3u(&content),
        PlaylistFormat::Pls => parse_pls(&content),
    };

    Ok(Playlist {
        name: playlist_name(path),
        format,
        path: path.to_path_buf(),
        entries,
    })
}

/// Playlist name is the file stem of the playlist file.
pub fn playlist_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parse_m3u(content: &str) -> Vec<PlaylistEntry> {
    let mut entries = Vec::new();
    let mut pending_title: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(extinf) = line.strip_prefix("#EXTINF:") {
            // "#EXTINF:<duration>,<title>"
            pending_title = extinf
                .split_once(',')
                .map(|(_, title)| title.trim().to_string())
                .filter(|t| !t.is_empty());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        entries.push(PlaylistEntry {
            path: decode_entry_path(line),
            title: pending_title.take(),
        });
    }

    entries
}

fn parse_pls(content: &str) -> Vec<PlaylistEntry> {
    let mut files: BTreeMap<u32, String> = BTreeMap::new();
    let mut titles: BTreeMap<u32, String> = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(number) = key.strip_prefix("File").and_then(|n| n.parse::<u32>().ok()) {
            files.insert(number, value.to_string());
        } else if let Some(number) = key.strip_prefix("Title").and_then(|n| n.parse::<u32>().ok()) {
            titles.insert(number, value.to_string());
        }
    }

    files
        .into_iter()
        .map(|(number, file)| PlaylistEntry {
            path: decode_entry_path(&file),
            title: titles.remove(&number),
        })
        .collect()
}

/// Strip a `file://` scheme and percent-decode the remainder.
fn decode_entry_path(raw: &str) -> PathBuf {
    match raw.strip_prefix("file://") {
        Some(rest) => PathBuf::from(urlencoding::decode(rest).map_or_else(
            |_| rest.to_string(),
            |decoded| decoded.into_owned(),
        )),
        None => PathBuf::from(raw),
    }
}

/// Serialize a playlist to `out_path` in its own format.
///
/// The content is assembled fully in memory and written in one call, so a
/// failure leaves no half-written playlist behind to other formats' harm.
pub fn write(playlist: &Playlist, out_path: &Path) -> Result<(), PlaylistError> {
    let content = match playlist.format {
        PlaylistFormat::M3u => serialize_m3u(playlist),
        PlaylistFormat::Pls => serialize_pls(playlist),
    };
    std::fs::write(out_path, content).map_err(|e| PlaylistError::Io(out_path.to_path_buf(), e))
}

fn serialize_m3u(playlist: &Playlist) -> String {
    let mut out = String::new();
    let with_titles = playlist.entries.iter().any(|e| e.title.is_some());
    if with_titles {
        out.push_str("#EXTM3U\r\n");
    }
    for entry in &playlist.entries {
        if with_titles {
            let title = entry
                .title
                .clone()
                .unwrap_or_else(|| file_title(&entry.path));
            out.push_str(&format!("#EXTINF:-1,{}\r\n", title));
        }
        out.push_str(&entry.path.to_string_lossy());
        out.push_str("\r\n");
    }
    out
}

fn serialize_pls(playlist: &Playlist) -> String {
    let mut out = String::from("[playlist]\n");
    for (i, entry) in playlist.entries.iter().enumerate() {
        let number = i + 1;
        let title = entry
            .title
            .clone()
            .unwrap_or_else(|| file_title(&entry.path));
        out.push_str(&format!("Title{}={}\n", number, title));
        out.push_str(&format!("File{}={}\n", number, entry.path.to_string_lossy()));
    }
    out.push_str(&format!("NumberOfEntries={}\n", playlist.entries.len()));
    out.push_str(&format!("X-Gnome-Title={}\n", playlist.name));
    out.push_str("Version=2\n");
    out
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
