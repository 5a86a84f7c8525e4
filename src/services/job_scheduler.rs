//! Bounded-parallel job dispatch
//!
//! A fixed-size pool of workers pulls jobs from a shared queue and runs one
//! ffmpeg invocation at a time, reporting outcomes back to the coordinator
//! over a channel. Workers never touch shared state besides the queue; the
//! coordinator owns the result collection, so no per-job locking exists.
//! Job order carries no meaning for execution, but results are returned in
//! planning order so reporting and playlist rewriting stay deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::transcoder::{TranscodeError, TranscodeParams, Transcoder};
use crate::types::{JobResult, JobStatus, OverwriteMode, PlannedJob, SkipReason};

/// Dispatches planned jobs across a worker pool
#[derive(Debug)]
pub struct JobScheduler {
    parallelism: usize,
    overwrite: OverwriteMode,
}

impl JobScheduler {
    /// Pool size is an explicit parameter; the binary decides the default
    /// (one worker per available CPU).
    pub fn new(parallelism: usize, overwrite: OverwriteMode) -> Self {
        Self {
            parallelism: parallelism.max(1),
            overwrite,
        }
    }

    /// Run all jobs, returning exactly one result per planned job, in
    /// planning order. Individual failures never abort the batch; once
    /// `cancel` fires, queued jobs are drained as skipped and in-flight
    /// processes are terminated.
    pub async fn run(
        &self,
        jobs: &[PlannedJob],
        transcoder: &Transcoder,
        params: &TranscodeParams,
        cancel: &CancellationToken,
    ) -> Vec<JobResult> {
        let mut results: Vec<Option<JobResult>> = vec![None; jobs.len()];

        let mut queue = VecDeque::new();
        for (i, job) in jobs.iter().enumerate() {
            match &job.status {
                JobStatus::Ready => queue.push_back((i, job.clone())),
                status => {
                    // Pre-skipped during planning: pass straight through
                    results[i] = Some(JobResult {
                        source: job.source.clone(),
                        dest: job.dest.clone(),
                        status: status.clone(),
                    });
                }
            }
        }

        let pending = queue.len();
        if pending == 0 {
            return results.into_iter().flatten().collect();
        }

        tracing::info!(
            "Dispatching {} transcode jobs across {} workers",
            pending,
            self.parallelism
        );

        let queue = Arc::new(Mutex::new(queue));
        let (tx, mut rx) = mpsc::channel::<(usize, JobResult)>(self.parallelism);
        let mut workers = JoinSet::new();

        for _ in 0..self.parallelism {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let transcoder = transcoder.clone();
            let params = params.clone();
            let cancel = cancel.clone();
            let overwrite = self.overwrite;

            workers.spawn(async move {
                loop {
                    let next = queue.lock().expect("job queue poisoned").pop_front();
                    let Some((index, job)) = next else {
                        break;
                    };
                    let result = if cancel.is_cancelled() {
                        // Stop submitting new work; report what never ran
                        JobResult {
                            source: job.source.clone(),
                            dest: job.dest.clone(),
                            status: JobStatus::Skipped(SkipReason::Aborted),
                        }
                    } else {
                        execute_job(&job, &transcoder, &params, overwrite, &cancel).await
                    };
                    if tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Some((index, result)) = rx.recv().await {
            results[index] = Some(result);
        }
        while workers.join_next().await.is_some() {}

        results.into_iter().flatten().collect()
    }
}

async fn execute_job(
    job: &PlannedJob,
    transcoder: &Transcoder,
    params: &TranscodeParams,
    overwrite: OverwriteMode,
    cancel: &CancellationToken,
) -> JobResult {
    if let Some(reason) = overwrite_skip(job, overwrite) {
        tracing::warn!(
            "Target path '{}' already exists{}, skipping '{}'",
            job.dest.display(),
            match reason {
                SkipReason::DestinationNewer => " and is newer",
                _ => "",
            },
            job.source.display()
        );
        return JobResult {
            source: job.source.clone(),
            dest: job.dest.clone(),
            status: JobStatus::Skipped(reason),
        };
    }

    tracing::info!(
        "Transcoding '{}' -> '{}'",
        job.source.display(),
        job.dest.display()
    );

    let status = match transcoder
        .transcode(&job.source, &job.dest, job.codec, params, cancel)
        .await
    {
        Ok(()) => JobStatus::Completed,
        Err(TranscodeError::Cancelled(_)) => {
            tracing::warn!("Transcode of '{}' aborted", job.source.display());
            JobStatus::Failed("aborted by cancellation".to_string())
        }
        Err(e) => {
            tracing::error!("Transcode of '{}' failed: {}", job.source.display(), e);
            JobStatus::Failed(e.to_string())
        }
    };

    JobResult {
        source: job.source.clone(),
        dest: job.dest.clone(),
        status,
    }
}

/// Overwrite-avoidance check, performed without invoking the external tool.
fn overwrite_skip(job: &PlannedJob, overwrite: OverwriteMode) -> Option<SkipReason> {
    match overwrite {
        OverwriteMode::Overwrite => None,
        OverwriteMode::NoOverwrite => job
            .dest
            .exists()
            .then_some(SkipReason::DestinationExists),
        OverwriteMode::IfOlder => {
            let dest_mtime = mtime(&job.dest)?;
            let source_mtime = mtime(&job.source)?;
            (dest_mtime >= source_mtime).then_some(SkipReason::DestinationNewer)
        }
    }
}

fn mtime(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
