//! Destination path planning and collision resolution
//!
//! Applies the configured naming template per source unit, resolves tag
//! metadata once per unit, and maintains the batch-wide destination map that
//! enforces unique destinations: identical sources merge, distinct sources
//! colliding on a destination produce a warning and a single surviving job.

use std::collections::HashMap;
use std::path::PathBuf;

use super::file_types::normalized_extension;
use super::metadata_extractor::TagReader;
use super::playlist::Playlist;
use super::template::{sanitize_path, PlaylistContext, Template};
use crate::config::RunConfig;
use crate::types::{Codec, CollisionWarning, JobStatus, PlannedJob, SkipReason, SourceUnit};

/// Planning result: one job per distinct non-colliding source, plus warnings
#[derive(Debug)]
pub struct Plan {
    pub jobs: Vec<PlannedJob>,
    pub collisions: Vec<CollisionWarning>,
}

/// Computes destination paths for a batch of source units
pub struct PathPlanner<'a> {
    tag_reader: &'a dyn TagReader,
    default_template: &'a Template,
    playlist_template: &'a Template,
}

impl<'a> PathPlanner<'a> {
    pub fn new(
        tag_reader: &'a dyn TagReader,
        default_template: &'a Template,
        playlist_template: &'a Template,
    ) -> Self {
        Self {
            tag_reader,
            default_template,
            playlist_template,
        }
    }

    /// Plan jobs for all units.
    ///
    /// The number of transcode jobs never exceeds the number of distinct
    /// canonical source paths; a destination claimed by an earlier distinct
    /// source skips the later one with a collision warning and no job.
    pub fn plan(
        &self,
        units: &[SourceUnit],
        playlists: &[Playlist],
        config: &RunConfig,
    ) -> Plan {
        let mut jobs: Vec<PlannedJob> = Vec::new();
        let mut collisions: Vec<CollisionWarning> = Vec::new();
        let mut claimed: HashMap<PathBuf, usize> = HashMap::new();

        for unit in units {
            let dest = self.destination_for(unit, playlists, config);
            let codec = self.effective_codec(unit, config);

            let Some(dest) = dest else {
                tracing::warn!(
                    "No usable destination path for source {}, skipping",
                    unit.path.display()
                );
                jobs.push(PlannedJob {
                    source: unit.path.clone(),
                    dest: PathBuf::new(),
                    codec,
                    status: JobStatus::Skipped(SkipReason::NoTargetPath),
                });
                continue;
            };

            if let Some(&claimant) = claimed.get(&dest) {
                if jobs[claimant].source == unit.path {
                    // Same physical file referenced again: already planned,
                    // nothing new to transcode.
                    continue;
                }
                tracing::warn!(
                    "Naming collision between source '{}' and '{}' for target path '{}', using first source",
                    jobs[claimant].source.display(),
                    unit.path.display(),
                    dest.display()
                );
                collisions.push(CollisionWarning {
                    dest,
                    kept: jobs[claimant].source.clone(),
                    skipped: unit.path.clone(),
                });
                continue;
            }

            let status = if dest == unit.path {
                tracing::warn!(
                    "Source file '{}' has itself as target, skipping",
                    unit.path.display()
                );
                JobStatus::Skipped(SkipReason::DestinationIsSource)
            } else {
                JobStatus::Ready
            };

            claimed.insert(dest.clone(), jobs.len());
            jobs.push(PlannedJob {
                source: unit.path.clone(),
                dest,
                codec,
                status,
            });
        }

        Plan { jobs, collisions }
    }

    /// Expand the applicable template for one unit and attach the codec
    /// extension. Returns `None` when no usable relative path results.
    fn destination_for(
        &self,
        unit: &SourceUnit,
        playlists: &[Playlist],
        config: &RunConfig,
    ) -> Option<PathBuf> {
        let tags = self.tag_reader.read_tags(&unit.path);

        let (template, context) = if unit.playlist_scoped() {
            let origin = unit.origins[0];
            let context = PlaylistContext {
                name: playlists[origin.playlist].name.clone(),
                number: origin.number,
                total: origin.total,
            };
            (self.playlist_template, Some(context))
        } else {
            (self.default_template, None)
        };

        let expanded = template.apply(&tags, &unit.path, context.as_ref());
        let mut relative = sanitize_path(&expanded);

        if relative.is_empty() || relative.ends_with('/') {
            let parent = unit
                .path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = unit
                .path
                .file_stem()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            relative = sanitize_path(&format!("{}/{}", parent, stem));
            if relative.is_empty() || relative.ends_with('/') {
                return None;
            }
            tracing::warn!(
                "Template expansion resulted in bad file path for source file '{}', using fallback naming: '{}'",
                unit.path.display(),
                relative
            );
        }

        let extension = self.effective_codec(unit, config).extension(&unit.path);
        if !extension.is_empty() && !relative.ends_with(&format!(".{}", extension)) {
            relative.push('.');
            relative.push_str(&extension);
        }

        Some(config.dest_root.join(relative))
    }

    fn effective_codec(&self, unit: &SourceUnit, config: &RunConfig) -> Codec {
        match normalized_extension(&unit.path) {
            Some(ext) if config.no_transcode_for.iter().any(|t| t.eq_ignore_ascii_case(&ext)) => {
                Codec::Copy
            }
            _ => config.codec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::playlist::PlaylistFormat;
    use crate::types::TagMetadata;
    use std::collections::HashMap as TagMap;
    use std::path::Path;

    struct StubTagReader {
        tags: TagMap<PathBuf, TagMetadata>,
    }

    impl StubTagReader {
        fn new() -> Self {
            Self {
                tags: TagMap::new(),
            }
        }

        fn with(mut self, path: &str, tags: TagMetadata) -> Self {
            self.tags.insert(PathBuf::from(path), tags);
            self
        }
    }

    impl TagReader for StubTagReader {
        fn read_tags(&self, path: &Path) -> TagMetadata {
            self.tags.get(path).cloned().unwrap_or_default()
        }
    }

    fn tagged(artist: &str, album: &str, title: &str, track: u32) -> TagMetadata {
        TagMetadata {
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            title: Some(title.to_string()),
            track: Some(track),
            ..TagMetadata::default()
        }
    }

    fn direct_unit(path: &str) -> SourceUnit {
        let mut unit = SourceUnit::new(PathBuf::from(path));
        unit.direct = true;
        unit
    }

    fn templates() -> (Template, Template) {
        (
            Template::compile(crate::config::DEFAULT_TEMPLATE).unwrap(),
            Template::compile(crate::config::DEFAULT_TEMPLATE_PLAYLIST).unwrap(),
        )
    }

    fn config() -> RunConfig {
        RunConfig::new(PathBuf::from("/dest"))
    }

    #[test]
    fn tagged_album_directory_layout() {
        // Two tagged files in one album map to "<artist> - <album>/<track>. <title>"
        let reader = StubTagReader::new()
            .with("/music/a1.flac", tagged("ArtistA", "Album1", "Track1", 1))
            .with("/music/a2.flac", tagged("ArtistA", "Album1", "Track2", 2));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let units = vec![direct_unit("/music/a1.flac"), direct_unit("/music/a2.flac")];
        let plan = planner.plan(&units, &[], &config());

        assert_eq!(plan.jobs.len(), 2);
        assert!(plan.collisions.is_empty());
        assert_eq!(
            plan.jobs[0].dest,
            PathBuf::from("/dest/ArtistA - Album1/01. Track1.mp3")
        );
        assert_eq!(
            plan.jobs[1].dest,
            PathBuf::from("/dest/ArtistA - Album1/02. Track2.mp3")
        );
        assert!(plan.jobs.iter().all(|j| j.status == JobStatus::Ready));
    }

    #[test]
    fn identical_sources_merge_into_one_job() {
        let reader = StubTagReader::new()
            .with("/music/x.flac", tagged("A", "B", "T", 1));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        // Same canonical path appearing twice in the unit list
        let units = vec![direct_unit("/music/x.flac"), direct_unit("/music/x.flac")];
        let plan = planner.plan(&units, &[], &config());

        assert_eq!(plan.jobs.len(), 1);
        assert!(plan.collisions.is_empty());
    }

    #[test]
    fn distinct_sources_colliding_produce_one_job_and_one_warning() {
        // Identical tags on two different files: same destination path
        let reader = StubTagReader::new()
            .with("/music/one.flac", tagged("A", "B", "T", 1))
            .with("/music/two.flac", tagged("A", "B", "T", 1));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let units = vec![direct_unit("/music/one.flac"), direct_unit("/music/two.flac")];
        let plan = planner.plan(&units, &[], &config());

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.collisions.len(), 1);
        assert_eq!(plan.collisions[0].kept, PathBuf::from("/music/one.flac"));
        assert_eq!(plan.collisions[0].skipped, PathBuf::from("/music/two.flac"));
    }

    #[test]
    fn playlist_scoped_units_use_the_playlist_template() {
        let reader = StubTagReader::new()
            .with("/music/x.flac", tagged("ArtistA", "Album1", "Song", 1));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let mut unit = SourceUnit::new(PathBuf::from("/music/x.flac"));
        unit.origins.push(crate::types::PlaylistOrigin {
            playlist: 0,
            number: 3,
            total: 12,
        });
        let playlists = vec![Playlist {
            name: "roadtrip".to_string(),
            format: PlaylistFormat::M3u,
            path: PathBuf::from("/lists/roadtrip.m3u"),
            entries: Vec::new(),
        }];

        let plan = planner.plan(&[unit], &playlists, &config());
        assert_eq!(
            plan.jobs[0].dest,
            PathBuf::from("/dest/roadtrip/03. Song - ArtistA.mp3")
        );
    }

    #[test]
    fn direct_reference_wins_over_playlist_origin() {
        let reader = StubTagReader::new()
            .with("/music/x.flac", tagged("ArtistA", "Album1", "Song", 1));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let mut unit = SourceUnit::new(PathBuf::from("/music/x.flac"));
        unit.direct = true;
        unit.origins.push(crate::types::PlaylistOrigin {
            playlist: 0,
            number: 3,
            total: 12,
        });
        let playlists = vec![Playlist {
            name: "roadtrip".to_string(),
            format: PlaylistFormat::M3u,
            path: PathBuf::from("/lists/roadtrip.m3u"),
            entries: Vec::new(),
        }];

        let plan = planner.plan(&[unit], &playlists, &config());
        assert_eq!(
            plan.jobs[0].dest,
            PathBuf::from("/dest/ArtistA - Album1/01. Song.mp3")
        );
    }

    #[test]
    fn untagged_file_falls_back_to_parent_and_stem() {
        let reader = StubTagReader::new();
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let plan = planner.plan(&[direct_unit("/music/SomeAlbum/07 - thing.ogg")], &[], &config());
        assert_eq!(
            plan.jobs[0].dest,
            PathBuf::from("/dest/SomeAlbum/07 - thing.mp3")
        );
        assert_eq!(plan.jobs[0].status, JobStatus::Ready);
    }

    #[test]
    fn no_transcode_for_switches_to_stream_copy() {
        let reader = StubTagReader::new()
            .with("/music/a.ogg", tagged("A", "B", "T", 1))
            .with("/music/b.flac", tagged("A", "B", "U", 2));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let mut cfg = config();
        cfg.no_transcode_for = vec!["ogg".to_string()];
        let units = vec![direct_unit("/music/a.ogg"), direct_unit("/music/b.flac")];
        let plan = planner.plan(&units, &[], &cfg);

        assert_eq!(plan.jobs[0].codec, Codec::Copy);
        assert!(plan.jobs[0].dest.to_string_lossy().ends_with(".ogg"));
        assert_eq!(plan.jobs[1].codec, Codec::Mp3);
        assert!(plan.jobs[1].dest.to_string_lossy().ends_with(".mp3"));
    }

    #[test]
    fn source_equal_to_destination_is_skipped() {
        let reader = StubTagReader::new();
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let mut cfg = config();
        cfg.dest_root = PathBuf::from("/music");
        cfg.no_transcode_for = vec!["mp3".to_string()];
        // Untagged: fallback yields "<parent>/<stem>", which with dest root
        // "/music" recreates the source path itself.
        let plan = planner.plan(&[direct_unit("/music/Album/song.mp3")], &[], &cfg);

        assert_eq!(
            plan.jobs[0].status,
            JobStatus::Skipped(SkipReason::DestinationIsSource)
        );
    }

    #[test]
    fn planning_is_deterministic() {
        let reader = StubTagReader::new()
            .with("/music/a1.flac", tagged("ArtistA", "Album1", "Track1", 1));
        let (default_tpl, playlist_tpl) = templates();
        let planner = PathPlanner::new(&reader, &default_tpl, &playlist_tpl);

        let units = vec![direct_unit("/music/a1.flac")];
        let first = planner.plan(&units, &[], &config());
        let second = planner.plan(&units, &[], &config());
        assert_eq!(first.jobs[0].dest, second.jobs[0].dest);
    }
}
