//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use mass_audio_transcoder::services::TagReader;
use mass_audio_transcoder::types::TagMetadata;

/// Deterministic tag source keyed by canonical path
#[derive(Default)]
pub struct StubTagReader {
    tags: HashMap<PathBuf, TagMetadata>,
}

impl StubTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &Path, tags: TagMetadata) {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.tags.insert(canonical, tags);
    }
}

impl TagReader for StubTagReader {
    fn read_tags(&self, path: &Path) -> TagMetadata {
        self.tags.get(path).cloned().unwrap_or_default()
    }
}

pub fn tagged(artist: &str, album: &str, title: &str, track: u32) -> TagMetadata {
    TagMetadata {
        artist: Some(artist.to_string()),
        album: Some(album.to_string()),
        title: Some(title.to_string()),
        track: Some(track),
        ..TagMetadata::default()
    }
}

/// Write a stand-in transcoder script that records every invocation to
/// `log`, writes its last argument as the output file, and fails for any
/// invocation whose arguments contain `fail_pattern`.
pub fn fake_ffmpeg(dir: &Path, log: &Path, fail_pattern: Option<&str>) -> PathBuf {
    let script_path = dir.join("fake-ffmpeg");
    let fail_clause = match fail_pattern {
        Some(pattern) => format!(
            "case \"$*\" in *{}*) echo 'decode error' >&2; exit 1;; esac\n",
            pattern
        ),
        None => String::new(),
    };
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> \"{}\"\n{}for arg in \"$@\"; do last=\"$arg\"; done\necho transcoded > \"$last\"\nexit 0\n",
        log.display(),
        fail_clause
    );
    fs::write(&script_path, script).unwrap();
    fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();
    script_path
}

/// Lines the stand-in transcoder logged, one per invocation.
pub fn invocations(log: &Path) -> Vec<String> {
    match fs::read_to_string(log) {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"audio-bytes").unwrap();
}
