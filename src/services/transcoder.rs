//! External ffmpeg invocation
//!
//! One transcode is one synchronous ffmpeg run: build the argument list for
//! the target codec, spawn, wait, judge by exit status. Stderr is captured
//! for failure diagnostics only. In-flight processes are killed when the
//! batch is cancelled.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::file_types::normalized_extension;
use crate::types::Codec;

/// How many trailing stderr lines to keep in a failure report
const STDERR_TAIL_LINES: usize = 8;

/// Transcoding tool errors
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// ffmpeg executable missing or not runnable
    #[error("Missing '{0}' command in system PATH")]
    MissingExecutable(String),

    /// ffmpeg version banner did not parse
    #[error("Unable to determine ffmpeg version for executable '{0}'")]
    VersionUnknown(String),

    /// ffmpeg exited non-zero
    #[error("ffmpeg failed for '{source_file}': {detail}")]
    ExitFailure { source_file: String, detail: String },

    /// Batch cancellation interrupted the running process
    #[error("Transcode of '{0}' cancelled")]
    Cancelled(String),

    /// I/O error around the invocation (destination directory, cleanup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcode quality parameters, passed through to ffmpeg
#[derive(Debug, Clone, Default)]
pub struct TranscodeParams {
    /// Encoder quality (`-qscale:a` for lame/vorbis, `-vbr` for aac)
    pub quality: Option<String>,
    /// Target bitrate in kbit/s (`-b:a <n>k`)
    pub bitrate: Option<u32>,
}

/// ffmpeg frontend
#[derive(Debug, Clone)]
pub struct Transcoder {
    executable: String,
}

impl Transcoder {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Probe `ffmpeg -version` once upfront. Returns the version string.
    pub async fn check_version(&self) -> Result<String, TranscodeError> {
        let output = Command::new(&self.executable)
            .args(["-nostdin", "-version"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|_| TranscodeError::MissingExecutable(self.executable.clone()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("ffmpeg version "))
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_string)
            .ok_or_else(|| TranscodeError::VersionUnknown(self.executable.clone()))
    }

    /// Argument list for one transcode run.
    ///
    /// Ogg inputs carry their metadata on the audio stream rather than the
    /// container, which ffmpeg does not map by default.
    pub fn build_args(
        source: &Path,
        dest: &Path,
        codec: Codec,
        params: &TranscodeParams,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-nostdin".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-y".into(),
            "-map_chapters".into(),
            "-1".into(),
        ];

        if normalized_extension(source).as_deref() == Some("ogg") {
            args.extend(["-map_metadata".into(), "0:s:0".into()]);
        }

        match codec {
            Codec::Mp3 => {
                args.extend(["-codec:a".into(), "libmp3lame".into()]);
                if let Some(q) = &params.quality {
                    args.extend(["-qscale:a".into(), q.clone()]);
                }
                if let Some(b) = params.bitrate {
                    args.extend(["-b:a".into(), format!("{}k", b)]);
                }
                args.extend(["-id3v2_version".into(), "3".into()]);
            }
            Codec::Aac | Codec::Fdkaac => {
                let encoder = if codec == Codec::Aac { "aac" } else { "libfdk_aac" };
                // Album art copying is unreliable with ffmpeg's AAC muxing
                args.extend([
                    "-codec:v".into(),
                    "copy".into(),
                    "-codec:a".into(),
                    encoder.into(),
                ]);
                if let Some(q) = &params.quality {
                    args.extend(["-vbr".into(), q.clone()]);
                }
                if let Some(b) = params.bitrate {
                    args.extend(["-b:a".into(), format!("{}k", b)]);
                }
            }
            Codec::Vorbis => {
                args.extend(["-codec:a".into(), "libvorbis".into()]);
                if let Some(q) = &params.quality {
                    args.extend(["-qscale:a".into(), q.clone()]);
                }
                if let Some(b) = params.bitrate {
                    args.extend(["-b:a".into(), format!("{}k", b)]);
                }
            }
            Codec::Copy => {
                args.extend(["-codec".into(), "copy".into()]);
            }
        }

        args.push(dest.to_string_lossy().into_owned());
        args
    }

    /// Run one transcode, creating the destination's parent directories.
    ///
    /// A non-zero exit or cancellation removes any partially written
    /// destination file; the source is never touched.
    pub async fn transcode(
        &self,
        source: &Path,
        dest: &Path,
        codec: Codec,
        params: &TranscodeParams,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = Self::build_args(source, dest, codec, params);
        tracing::debug!("Invoking {} {}", self.executable, args.join(" "));

        let child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TranscodeError::MissingExecutable(self.executable.clone())
                }
                _ => TranscodeError::Io(e),
            })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => {
                // Dropping the wait future drops the child handle, which
                // kills the process (kill_on_drop).
                remove_partial(dest).await;
                return Err(TranscodeError::Cancelled(
                    source.to_string_lossy().into_owned(),
                ));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        remove_partial(dest).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr
            .lines()
            .rev()
            .take(STDERR_TAIL_LINES)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Err(TranscodeError::ExitFailure {
            source_file: source.to_string_lossy().into_owned(),
            detail: format!("exit status {}: {}", output.status, tail.join(" | ")),
        })
    }
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                "Could not remove partial destination {}: {}",
                dest.display(),
                e
            );
        }
    }
}
