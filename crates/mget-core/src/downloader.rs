//! One download job: metadata discovery, segmentation, merge, notification.

use crate::listener::{DownloadListener, ListenerSlot};
use crate::pool::WorkerPool;
use crate::progress::{DownloadStatus, ProgressCounter};
use crate::retry::RetryPolicy;
use crate::segmenter::{plan_ranges, ByteRange};
use crate::transport::Transport;
use crate::url_model::derive_filename;
use crate::worker::SegmentWorker;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};

/// Job lifecycle. Terminal states are final; a job object is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// One end-to-end download and its lifecycle.
///
/// Created by the manager, driven to completion by `start()` on a pool
/// thread. All fields queried from other threads (status, cancellation) use
/// interior mutability, so the job is shared as `Arc<Downloader>`.
pub struct Downloader {
    process_id: String,
    url: String,
    download_dir: PathBuf,
    connections: usize,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    listener: ListenerSlot,
    state: Mutex<JobState>,
    file_name: Mutex<Option<String>>,
    file_size: AtomicU64,
    accepts_ranges: AtomicBool,
    cancel: Arc<AtomicBool>,
    progress: Arc<ProgressCounter>,
}

impl Downloader {
    pub(crate) fn new(
        process_id: String,
        url: String,
        download_dir: PathBuf,
        connections: usize,
        retry: RetryPolicy,
        transport: Arc<dyn Transport>,
        listener: ListenerSlot,
    ) -> Self {
        Self {
            process_id,
            url,
            download_dir,
            connections: connections.max(1),
            retry,
            transport,
            listener,
            state: Mutex::new(JobState::NotStarted),
            file_name: Mutex::new(None),
            file_size: AtomicU64::new(0),
            accepts_ranges: AtomicBool::new(false),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(ProgressCounter::new()),
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the source advertised byte-range support. Meaningful once
    /// metadata discovery has run.
    pub fn accepts_ranges(&self) -> bool {
        self.accepts_ranges.load(Ordering::Relaxed)
    }

    /// Point-in-time snapshot of the job's queryable fields.
    pub fn status(&self) -> DownloadStatus {
        let state = *self.state.lock().unwrap();
        DownloadStatus {
            process_id: self.process_id.clone(),
            file_name: self.file_name.lock().unwrap().clone(),
            file_size: self.file_size.load(Ordering::Relaxed),
            downloaded: self.progress.get(),
            ran: state != JobState::NotStarted,
            finished: matches!(state, JobState::Succeeded | JobState::Failed),
            success: state == JobState::Succeeded,
        }
    }

    /// Request cooperative cancellation. Running segments observe the flag at
    /// their next chunk boundary; the job then unwinds into `Failed`. Safe to
    /// call from any thread, any number of times.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Drive the job to a terminal state. Blocks the calling thread until
    /// every segment has resolved and the merge (or cleanup) is done.
    pub fn start(&self) {
        *self.state.lock().unwrap() = JobState::Running;
        tracing::info!(process_id = %self.process_id, url = %self.url, "download started");

        let success = self.run();

        *self.state.lock().unwrap() = if success {
            JobState::Succeeded
        } else {
            JobState::Failed
        };

        let status = self.status();
        if let Some(listener) = self.listener() {
            if success {
                listener.on_download_finished(&status);
            } else {
                listener.on_download_failed(&status);
            }
        }
        tracing::info!(
            process_id = %self.process_id,
            success,
            downloaded = status.downloaded,
            "download finished"
        );
    }

    fn run(&self) -> bool {
        let meta = match self.transport.probe(&self.url) {
            Ok(meta) => meta,
            Err(e) => {
                // Discovery failed before any status was known: the started
                // notification is skipped, only the failed one fires.
                tracing::warn!(url = %self.url, error = %e, "metadata discovery failed");
                return false;
            }
        };

        let size = meta.content_length.unwrap_or(0);
        let name = derive_filename(&self.url, meta.content_disposition.as_deref());
        self.file_size.store(size, Ordering::Relaxed);
        self.accepts_ranges.store(meta.accept_ranges, Ordering::Relaxed);
        *self.file_name.lock().unwrap() = name.clone();

        if let Some(listener) = self.listener() {
            listener.on_download_started(&self.status());
        }

        let Some(name) = name else {
            tracing::warn!(url = %self.url, "no usable filename from URL or Content-Disposition");
            return false;
        };
        if size == 0 {
            tracing::warn!(url = %self.url, "missing or invalid content length");
            return false;
        }

        if let Err(e) = fs::create_dir_all(&self.download_dir) {
            tracing::error!(dir = %self.download_dir.display(), error = %e, "cannot create download dir");
            return false;
        }
        let final_path = self.download_dir.join(&name);

        let connections = if meta.accept_ranges { self.connections } else { 1 };
        if connections > 1 {
            self.run_segmented(&final_path, size, connections)
        } else {
            self.run_single(&final_path, size)
        }
    }

    /// Multi-connection path: one part file and one worker per range, merged
    /// in ascending segment order once every worker succeeded.
    fn run_segmented(&self, final_path: &Path, size: u64, connections: usize) -> bool {
        let ranges = plan_ranges(size, connections);
        let parts: Vec<PathBuf> = (1..=ranges.len())
            .map(|i| part_path(final_path, i))
            .collect();

        let pool = WorkerPool::new("segment", connections);
        let (tx, rx) = mpsc::channel();
        for (part, range) in parts.iter().zip(&ranges) {
            let worker = SegmentWorker::new(
                self.url.clone(),
                part.clone(),
                *range,
                Arc::clone(&self.transport),
                Arc::clone(&self.progress),
                Arc::clone(&self.cancel),
                self.retry,
            );
            let tx = tx.clone();
            pool.execute(move || {
                let _ = tx.send(worker.run());
            });
        }
        drop(tx);

        let mut success = true;
        for _ in 0..ranges.len() {
            success &= rx.recv().unwrap_or(false);
        }
        drop(pool); // joins the segment threads

        if success {
            if let Err(e) = merge_parts(&parts, final_path) {
                tracing::error!(error = %e, "failed to merge part files");
                success = false;
            }
        }
        if !success {
            for part in &parts {
                remove_quietly(part);
            }
            remove_quietly(final_path);
        }
        success
    }

    /// Single-connection path: one worker writing the final path directly.
    fn run_single(&self, final_path: &Path, size: u64) -> bool {
        let worker = SegmentWorker::new(
            self.url.clone(),
            final_path.to_path_buf(),
            ByteRange::new(0, size),
            Arc::clone(&self.transport),
            Arc::clone(&self.progress),
            Arc::clone(&self.cancel),
            self.retry,
        );
        let success = worker.run();
        if !success {
            remove_quietly(final_path);
        }
        success
    }

    fn listener(&self) -> Option<Arc<dyn DownloadListener>> {
        self.listener.read().unwrap().clone()
    }
}

/// Part-file path for 1-based segment `index`: `<final>.partN`.
pub(crate) fn part_path(final_path: &Path, index: usize) -> PathBuf {
    let mut os = final_path.as_os_str().to_owned();
    os.push(format!(".part{}", index));
    PathBuf::from(os)
}

/// Concatenate part files in segment order into `final_path`, then delete them.
fn merge_parts(parts: &[PathBuf], final_path: &Path) -> Result<()> {
    let mut out = fs::File::create(final_path)
        .with_context(|| format!("failed to create {}", final_path.display()))?;
    for part in parts {
        let mut input = fs::File::open(part)
            .with_context(|| format!("failed to open part {}", part.display()))?;
        io::copy(&mut input, &mut out)
            .with_context(|| format!("failed to append part {}", part.display()))?;
    }
    out.sync_all().context("failed to sync merged file")?;
    drop(out);

    for part in parts {
        fs::remove_file(part)
            .with_context(|| format!("failed to remove part {}", part.display()))?;
    }
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "cleanup failed");
        }
    }
}
