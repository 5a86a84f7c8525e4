//! Mass parallel audio transcoder, an ffmpeg frontend
//!
//! Batch-converts audio collections between formats, deriving the
//! destination file layout from tag metadata or playlist order through a
//! small naming template language. Inputs may be loose files, directories or
//! playlists; each distinct physical source file is transcoded at most once
//! per batch, and input playlists are rewritten to reference the transcoded
//! output.

pub mod config;
pub mod services;
pub mod types;

pub use crate::config::RunConfig;
pub use crate::types::{
    BatchSummary, Codec, CollisionWarning, JobResult, JobStatus, OverwriteMode, PlannedJob,
    PlaylistOrigin, SkipReason, SourceUnit, TagMetadata,
};
