//! Core value types shared across the transcoding pipeline

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Target codec for transcoding
///
/// Maps to an ffmpeg encoder plus an output container extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Codec {
    /// MPEG layer 3 via libmp3lame
    Mp3,
    /// AAC via ffmpeg's native encoder
    Aac,
    /// AAC via libfdk_aac
    Fdkaac,
    /// Ogg Vorbis via libvorbis
    Vorbis,
    /// Stream copy (remux without re-encoding)
    Copy,
}

impl Codec {
    /// Output file extension for this codec.
    ///
    /// `Copy` keeps the source file's own extension.
    pub fn extension(&self, source: &Path) -> String {
        match self {
            Codec::Mp3 => "mp3".to_string(),
            Codec::Aac | Codec::Fdkaac => "m4a".to_string(),
            Codec::Vorbis => "ogg".to_string(),
            Codec::Copy => source
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        }
    }
}

/// Destination overwrite policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverwriteMode {
    /// Always transcode, replacing any existing destination
    Overwrite,
    /// Skip jobs whose destination already exists
    NoOverwrite,
    /// Skip jobs whose destination exists and is at least as new as the source
    IfOlder,
}

/// Tag metadata for one audio file
///
/// All fields are optional; an unreadable or untagged file yields
/// `TagMetadata::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMetadata {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub albumartist: Option<String>,
    pub title: Option<String>,
    pub track: Option<u32>,
    pub tracktotal: Option<u32>,
    pub discnumber: Option<u32>,
    pub genre: Option<String>,
    pub date: Option<String>,
}

/// Where a source unit was referenced from within an input playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistOrigin {
    /// Index into the batch's input playlist list
    pub playlist: usize,
    /// 1-based position among the playlist's surviving entries
    pub number: usize,
    /// Count of the playlist's surviving entries
    pub total: usize,
}

/// One physical audio file considered for transcoding
///
/// Identity is the canonicalized absolute source path; a batch holds exactly
/// one unit per distinct physical file no matter how many inputs reference it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Canonical absolute path of the source file
    pub path: PathBuf,
    /// Playlist references to this file, in first-seen order
    pub origins: Vec<PlaylistOrigin>,
    /// True when the file was also given directly or found by directory scan
    pub direct: bool,
}

impl SourceUnit {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            origins: Vec::new(),
            direct: false,
        }
    }

    /// Playlist-scoped naming applies only to units drawn exclusively from
    /// playlists; any direct reference pins the file to its canonical
    /// metadata-derived location.
    pub fn playlist_scoped(&self) -> bool {
        !self.direct && !self.origins.is_empty()
    }
}

/// Why a planned job was not (or will not be) transcoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A different physical file already claimed this destination path
    NameCollision,
    /// Destination exists and overwrite mode is `NoOverwrite`
    DestinationExists,
    /// Destination exists and is at least as new as the source (`IfOlder`)
    DestinationNewer,
    /// Destination path resolves to the source file itself
    DestinationIsSource,
    /// Template expansion produced no usable path, even after fallback naming
    NoTargetPath,
    /// Cancelled before the job was dispatched
    Aborted,
}

impl SkipReason {
    /// Whether the destination file can still be referenced from a rewritten
    /// playlist. Overwrite skips leave a valid file in place; collision and
    /// abort skips do not produce one.
    pub fn destination_available(&self) -> bool {
        matches!(
            self,
            SkipReason::DestinationExists
                | SkipReason::DestinationNewer
                | SkipReason::DestinationIsSource
        )
    }
}

/// Per-job processing state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Planned and waiting for a worker
    Ready,
    /// Will not be transcoded
    Skipped(SkipReason),
    /// Transcode finished and destination written
    Completed,
    /// Transcode failed; source left untouched
    Failed(String),
}

/// A source unit paired with its computed destination and codec
#[derive(Debug, Clone)]
pub struct PlannedJob {
    /// Canonical source path (identity of the underlying unit)
    pub source: PathBuf,
    /// Unique destination path within the batch
    pub dest: PathBuf,
    /// Effective codec after per-filetype bypass rules
    pub codec: Codec,
    /// Ready, or pre-skipped during planning
    pub status: JobStatus,
}

/// Outcome of one job after scheduling
#[derive(Debug, Clone)]
pub struct JobResult {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub status: JobStatus,
}

impl JobResult {
    /// True when `dest` names a file a rewritten playlist may point at.
    pub fn destination_available(&self) -> bool {
        match &self.status {
            JobStatus::Completed => true,
            JobStatus::Skipped(reason) => reason.destination_available(),
            _ => false,
        }
    }
}

/// Two distinct physical files mapping to the same destination path
#[derive(Debug, Clone)]
pub struct CollisionWarning {
    pub dest: PathBuf,
    /// Source that claimed the destination first and keeps it
    pub kept: PathBuf,
    /// Source whose transcode is skipped
    pub skipped: PathBuf,
}

/// Batch-level counters for the final report
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub collisions: usize,
    pub input_errors: usize,
    pub playlists_written: usize,
    pub playlist_failures: usize,
}

impl BatchSummary {
    pub fn tally(results: &[JobResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match &result.status {
                JobStatus::Completed => summary.completed += 1,
                JobStatus::Skipped(_) => summary.skipped += 1,
                JobStatus::Failed(_) => summary.failed += 1,
                JobStatus::Ready => {}
            }
        }
        summary
    }

    /// Whether the process should exit non-zero.
    pub fn is_failure(&self) -> bool {
        self.failed > 0 || self.input_errors > 0
    }
}
