use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use crate::ffmpeg::{self, ConvertJob, FfmpegError, VolumeReport};

/// Fixed-size worker pool. Probes and transcodes are mutually independent
/// units; results come back over plain mpsc channels the UI thread drains.
pub struct JobPool {
    pool: rayon::ThreadPool,
}

impl JobPool {
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("loudlab-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Fan `items` out as independent jobs. Results arrive on the returned
    /// receiver in completion order; no ordering is guaranteed.
    pub fn run_batch<I, T, F>(&self, items: Vec<I>, work: F) -> Receiver<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> T + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let work = Arc::new(work);
        for item in items {
            let tx = tx.clone();
            let work = Arc::clone(&work);
            self.pool.spawn(move || {
                // The receiver may already be gone (directory switched away).
                let _ = tx.send(work(item));
            });
        }
        rx
    }
}

/// A file picked up by the directory scan, waiting for its probe.
#[derive(Clone, Debug)]
pub struct ScanTarget {
    pub stem: String,
    pub ext: String,
}

pub struct ProbeOutcome {
    pub stem: String,
    pub ext: String,
    pub result: Result<VolumeReport, FfmpegError>,
}

pub fn spawn_probe_batch(
    pool: &JobPool,
    dir: &Path,
    targets: Vec<ScanTarget>,
) -> Receiver<ProbeOutcome> {
    let dir = dir.to_path_buf();
    pool.run_batch(targets, move |t| {
        let path = dir.join(format!("{}.{}", t.stem, t.ext));
        let result = ffmpeg::probe(&path);
        if let Err(e) = &result {
            warn!("probe failed: {e}");
        }
        ProbeOutcome {
            stem: t.stem,
            ext: t.ext,
            result,
        }
    })
}

pub struct ConvertOutcome {
    pub source: PathBuf,
    pub result: Result<(), FfmpegError>,
}

pub fn spawn_convert_batch(pool: &JobPool, jobs: Vec<ConvertJob>) -> Receiver<ConvertOutcome> {
    pool.run_batch(jobs, |job| {
        let result = ffmpeg::run_transcode(&job);
        match &result {
            Ok(()) => info!("{} complete", job.source.display()),
            Err(e) => warn!("transcode failed: {e}"),
        }
        ConvertOutcome {
            source: job.source,
            result,
        }
    })
}
