//! mass-audio-transcoder - batch transcoding CLI
//!
//! Resolves the command line into a batch run: inputs are expanded and
//! deduplicated, destinations planned, transcode jobs dispatched across a
//! worker pool, and input playlists rewritten against the results. The exit
//! code reflects aggregate failure without hiding per-item detail already
//! logged along the way.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mass_audio_transcoder::config::{RunConfig, DEFAULT_TEMPLATE, DEFAULT_TEMPLATE_PLAYLIST};
use mass_audio_transcoder::services::{
    rewrite_playlists, AudioFileTypes, InputResolver, JobScheduler, LoftyTagReader, PathPlanner,
    Template, TranscodeParams, Transcoder,
};
use mass_audio_transcoder::types::{BatchSummary, Codec, OverwriteMode};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "mass-audio-transcoder")]
#[command(about = "Mass parallel audio transcoder ffmpeg frontend")]
#[command(version)]
struct Args {
    /// Audio files, directories or playlists (.m3u/.m3u8/.pls) to transcode
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Destination directory for transcoded files and rewritten playlists
    #[arg(short, long)]
    dest: PathBuf,

    /// Target codec
    #[arg(short, long, value_enum, default_value_t = Codec::Mp3)]
    codec: Codec,

    /// Encoder quality setting, passed through to ffmpeg
    #[arg(short, long)]
    quality: Option<String>,

    /// Target bitrate in kbit/s
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// Naming template for files given directly or found in directories
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Naming template for files drawn from playlists
    #[arg(long, default_value = DEFAULT_TEMPLATE_PLAYLIST)]
    playlist_template: String,

    /// Worker count (defaults to the number of available CPUs)
    #[arg(short, long, env = "MAT_PARALLEL")]
    parallel: Option<usize>,

    /// Overwrite policy for existing destination files
    #[arg(long, value_enum, default_value_t = OverwriteMode::Overwrite)]
    overwrite_mode: OverwriteMode,

    /// Source filetypes to stream-copy instead of re-encoding
    #[arg(long, value_delimiter = ',')]
    no_transcode_for: Vec<String>,

    /// Extra file extensions to recognize as audio input
    #[arg(long, value_delimiter = ',')]
    extra_audio_ext: Vec<String>,

    /// ffmpeg executable to use
    #[arg(long, env = "FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,

    /// Only log errors
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "error" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Templates and ffmpeg are validated once, before any job is scheduled
    let default_template =
        Template::compile(&args.template).context("Invalid naming template")?;
    let playlist_template = Template::compile(&args.playlist_template)
        .context("Invalid playlist naming template")?;

    let transcoder = Transcoder::new(args.ffmpeg.clone());
    let version = transcoder.check_version().await?;
    info!("Using ffmpeg {} ({})", version, args.ffmpeg);

    std::fs::create_dir_all(&args.dest)
        .with_context(|| format!("Failed to create destination root {}", args.dest.display()))?;
    let dest_root = std::fs::canonicalize(&args.dest)
        .with_context(|| format!("Failed to resolve destination root {}", args.dest.display()))?;

    let config = RunConfig {
        dest_root,
        codec: args.codec,
        quality: args.quality,
        bitrate: args.bitrate,
        template: args.template,
        playlist_template: args.playlist_template,
        parallelism: args.parallel.unwrap_or_else(num_cpus::get),
        overwrite: args.overwrite_mode,
        no_transcode_for: args.no_transcode_for,
        extra_audio_extensions: args.extra_audio_ext,
        ffmpeg: args.ffmpeg,
    };

    let file_types = AudioFileTypes::with_extra(&config.extra_audio_extensions);
    let resolver = InputResolver::new(file_types);
    let resolved = resolver.resolve(&args.inputs);
    info!(
        "Resolved {} distinct source files from {} inputs ({} playlists, {} entries dropped)",
        resolved.units.len(),
        args.inputs.len(),
        resolved.playlists.len(),
        resolved.dropped_entries
    );

    let tag_reader = LoftyTagReader;
    let planner = PathPlanner::new(&tag_reader, &default_template, &playlist_template);
    let plan = planner.plan(&resolved.units, &resolved.playlists, &config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, terminating in-flight jobs");
                cancel.cancel();
            }
        });
    }

    let scheduler = JobScheduler::new(config.parallelism, config.overwrite);
    let params = TranscodeParams {
        quality: config.quality.clone(),
        bitrate: config.bitrate,
    };
    let results = scheduler
        .run(&plan.jobs, &transcoder, &params, &cancel)
        .await;

    let report = rewrite_playlists(&resolved.playlists, &results, &config.dest_root);

    let mut summary = BatchSummary::tally(&results);
    summary.collisions = plan.collisions.len();
    summary.input_errors = resolved.input_errors.len();
    summary.playlists_written = report.written.len();
    summary.playlist_failures = report.failures;

    info!(
        "Batch finished: {} transcoded, {} skipped, {} failed, {} naming collisions",
        summary.completed, summary.skipped, summary.failed, summary.collisions
    );
    if !resolved.playlists.is_empty() {
        info!(
            "Playlists: {} written, {} failed",
            summary.playlists_written, summary.playlist_failures
        );
    }
    for error in &resolved.input_errors {
        warn!("Input error: {}", error);
    }

    if summary.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
