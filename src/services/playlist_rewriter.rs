//! Playlist rewriting against transcode results
//!
//! Every input playlist is re-emitted at the destination root in its own
//! format, entries pointing at the transcoded output files. Entries whose
//! job failed or never produced a destination are dropped with a warning;
//! the relative order of surviving entries is preserved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::playlist::{self, Playlist, PlaylistEntry};
use crate::types::JobResult;

/// One successfully rewritten playlist
#[derive(Debug)]
pub struct WrittenPlaylist {
    pub path: PathBuf,
    pub entries: usize,
    pub dropped: usize,
}

/// Outcome of the rewriting stage
#[derive(Debug, Default)]
pub struct RewriteReport {
    pub written: Vec<WrittenPlaylist>,
    /// Playlists that could not be written (other playlists unaffected)
    pub failures: usize,
}

/// Rewrite all input playlists. Per-playlist write failures are isolated.
pub fn rewrite_playlists(
    playlists: &[Playlist],
    results: &[JobResult],
    dest_root: &Path,
) -> RewriteReport {
    let by_source: HashMap<&Path, &JobResult> = results
        .iter()
        .map(|r| (r.source.as_path(), r))
        .collect();

    let mut report = RewriteReport::default();

    for playlist in playlists {
        let mut entries: Vec<PlaylistEntry> = Vec::new();
        let mut dropped = 0usize;

        for entry in &playlist.entries {
            match by_source.get(entry.path.as_path()) {
                Some(result) if result.destination_available() => {
                    entries.push(PlaylistEntry {
                        path: result.dest.clone(),
                        title: entry.title.clone(),
                    });
                }
                _ => {
                    tracing::warn!(
                        "Playlist {}: omitting entry without transcoded destination: {}",
                        playlist.name,
                        entry.path.display()
                    );
                    dropped += 1;
                }
            }
        }

        if entries.is_empty() {
            tracing::warn!("Not writing playlist {}: no files", playlist.name);
            continue;
        }

        let out_path = dest_root.join(format!(
            "{}.{}",
            playlist.name,
            playlist.format.extension()
        ));
        let rewritten = Playlist {
            name: playlist.name.clone(),
            format: playlist.format,
            path: out_path.clone(),
            entries,
        };

        match playlist::write(&rewritten, &out_path) {
            Ok(()) => {
                tracing::info!(
                    "Wrote playlist {} ({} entries, {} dropped)",
                    out_path.display(),
                    rewritten.entries.len(),
                    dropped
                );
                report.written.push(WrittenPlaylist {
                    path: out_path,
                    entries: rewritten.entries.len(),
                    dropped,
                });
            }
            Err(e) => {
                tracing::error!("Failed to write playlist: {}", e);
                report.failures += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::playlist::PlaylistFormat;
    use crate::types::{JobStatus, SkipReason};
    use tempfile::TempDir;

    fn playlist(name: &str, format: PlaylistFormat, sources: &[&str]) -> Playlist {
        Playlist {
            name: name.to_string(),
            format,
            path: PathBuf::from(format!("/lists/{}.m3u", name)),
            entries: sources
                .iter()
                .map(|s| PlaylistEntry {
                    path: PathBuf::from(s),
                    title: None,
                })
                .collect(),
        }
    }

    fn result(source: &str, dest: &str, status: JobStatus) -> JobResult {
        JobResult {
            source: PathBuf::from(source),
            dest: PathBuf::from(dest),
            status,
        }
    }

    #[test]
    fn rewritten_playlist_keeps_order_and_drops_failures() {
        let dir = TempDir::new().unwrap();
        let playlists = vec![playlist(
            "mix",
            PlaylistFormat::M3u,
            &["/music/a.flac", "/music/b.flac", "/music/c.flac"],
        )];
        let results = vec![
            result("/music/a.flac", "/dest/a.mp3", JobStatus::Completed),
            result(
                "/music/b.flac",
                "/dest/b.mp3",
                JobStatus::Failed("boom".to_string()),
            ),
            result("/music/c.flac", "/dest/c.mp3", JobStatus::Completed),
        ];

        let report = rewrite_playlists(&playlists, &results, dir.path());

        assert_eq!(report.failures, 0);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].entries, 2);
        assert_eq!(report.written[0].dropped, 1);

        let written = playlist::parse(&report.written[0].path).unwrap();
        let paths: Vec<_> = written.entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/dest/a.mp3"), PathBuf::from("/dest/c.mp3")]
        );
    }

    #[test]
    fn overwrite_skipped_destinations_still_count_as_valid_targets() {
        let dir = TempDir::new().unwrap();
        let playlists = vec![playlist("mix", PlaylistFormat::M3u, &["/music/a.flac"])];
        let results = vec![result(
            "/music/a.flac",
            "/dest/a.mp3",
            JobStatus::Skipped(SkipReason::DestinationNewer),
        )];

        let report = rewrite_playlists(&playlists, &results, dir.path());
        assert_eq!(report.written[0].entries, 1);
        assert_eq!(report.written[0].dropped, 0);
    }

    #[test]
    fn collision_skipped_sources_are_omitted() {
        let dir = TempDir::new().unwrap();
        let playlists = vec![playlist(
            "mix",
            PlaylistFormat::M3u,
            &["/music/kept.flac", "/music/collided.flac"],
        )];
        // The collided source never got a job, so it has no result at all
        let results = vec![result("/music/kept.flac", "/dest/x.mp3", JobStatus::Completed)];

        let report = rewrite_playlists(&playlists, &results, dir.path());
        assert_eq!(report.written[0].entries, 1);
        assert_eq!(report.written[0].dropped, 1);
    }

    #[test]
    fn playlist_with_no_surviving_entries_is_not_written() {
        let dir = TempDir::new().unwrap();
        let playlists = vec![playlist("mix", PlaylistFormat::Pls, &["/music/a.flac"])];
        let results = vec![result(
            "/music/a.flac",
            "/dest/a.mp3",
            JobStatus::Failed("boom".to_string()),
        )];

        let report = rewrite_playlists(&playlists, &results, dir.path());
        assert!(report.written.is_empty());
        assert_eq!(report.failures, 0);
        assert!(!dir.path().join("mix.pls").exists());
    }

    #[test]
    fn write_failure_is_isolated_per_playlist() {
        let dir = TempDir::new().unwrap();
        let playlists = vec![
            playlist("bad/slash", PlaylistFormat::M3u, &["/music/a.flac"]),
            playlist("good", PlaylistFormat::M3u, &["/music/a.flac"]),
        ];
        let results = vec![result("/music/a.flac", "/dest/a.mp3", JobStatus::Completed)];

        let report = rewrite_playlists(&playlists, &results, dir.path());
        // The playlist whose name points into a missing subdirectory fails,
        // the other one is still written.
        assert_eq!(report.failures, 1);
        assert_eq!(report.written.len(), 1);
        assert!(report.written[0].path.ends_with("good.m3u"));
    }
}
