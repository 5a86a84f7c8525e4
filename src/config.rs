//! Run configuration assembled from the command line

use std::path::PathBuf;

use crate::types::{Codec, OverwriteMode};

/// Default naming template for files given directly or found by directory scan
pub const DEFAULT_TEMPLATE: &str =
    "<albumartist_or_artist>< - +album+>< disc +discnumber+>/<track+. ><title>";

/// Default naming template for files drawn from playlists
pub const DEFAULT_TEMPLATE_PLAYLIST: &str =
    "<playlist_name>/<playlist_filenumber>. <title> - <artist>";

/// File extensions recognized as audio input by default
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "ogg", "flac", "m4a", "mpc", "wav", "opus", "wma", "ape", "wv", "aiff",
];

/// Everything one batch run needs, passed explicitly to the pipeline stages.
///
/// No hidden process-wide state: parallelism and the ffmpeg executable are
/// resolved by the binary and handed in here.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Destination root directory for transcoded files and rewritten playlists
    pub dest_root: PathBuf,
    /// Target codec for transcoding
    pub codec: Codec,
    /// Encoder quality setting (`-qscale:a` / `-vbr`), passed through verbatim
    pub quality: Option<String>,
    /// Target bitrate in kbit/s
    pub bitrate: Option<u32>,
    /// Naming template for non-playlist sources
    pub template: String,
    /// Naming template for playlist sources
    pub playlist_template: String,
    /// Worker pool size
    pub parallelism: usize,
    /// Destination overwrite policy
    pub overwrite: OverwriteMode,
    /// Source filetypes (extensions) that are stream-copied instead of
    /// re-encoded
    pub no_transcode_for: Vec<String>,
    /// Extra file extensions to recognize as audio input
    pub extra_audio_extensions: Vec<String>,
    /// ffmpeg executable name or path
    pub ffmpeg: String,
}

impl RunConfig {
    pub fn new(dest_root: PathBuf) -> Self {
        Self {
            dest_root,
            codec: Codec::Mp3,
            quality: None,
            bitrate: None,
            template: DEFAULT_TEMPLATE.to_string(),
            playlist_template: DEFAULT_TEMPLATE_PLAYLIST.to_string(),
            parallelism: num_cpus::get(),
            overwrite: OverwriteMode::Overwrite,
            no_transcode_for: Vec::new(),
            extra_audio_extensions: Vec::new(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}
