//! Download manager: job registry, bounded job pool, notification fan-out.

use crate::config::MgetConfig;
use crate::downloader::Downloader;
use crate::listener::{DownloadListener, ListenerSlot};
use crate::pool::WorkerPool;
use crate::progress::DownloadStatus;
use crate::retry::RetryPolicy;
use crate::transport::{CurlTransport, Transport};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Process-wide identifier source: starts at 1, never reused.
static PROCESS_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_process_id() -> String {
    PROCESS_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// A cancel (or similar lookup) named a process id that was never registered.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown process id: {0}")]
pub struct UnknownProcessId(pub String);

/// Accepts download requests and runs each job on a bounded pool.
///
/// Finished jobs stay registered so their terminal status remains queryable;
/// nothing is garbage-collected. Peak worker usage is
/// `max_concurrent_jobs * connections` since every running job owns its own
/// segment pool.
pub struct DownloadManager {
    download_dir: PathBuf,
    connections: usize,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    listener: ListenerSlot,
    registry: RwLock<HashMap<String, Arc<Downloader>>>,
    pool: WorkerPool,
}

impl DownloadManager {
    /// Manager with the default libcurl transport.
    pub fn new(config: &MgetConfig) -> Self {
        Self::with_transport(config, Arc::new(CurlTransport::new()))
    }

    /// Manager with a caller-supplied transport (tests, instrumentation).
    pub fn with_transport(config: &MgetConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            download_dir: config.download_dir(),
            connections: config.connections.max(1),
            retry: config.retry_policy(),
            transport,
            listener: Arc::new(RwLock::new(None)),
            registry: RwLock::new(HashMap::new()),
            pool: WorkerPool::new("job", config.max_concurrent_jobs),
        }
    }

    /// Accept a download request: register a job and schedule it. Returns the
    /// job's process id immediately; the download runs when a pool slot frees.
    pub fn download(&self, url: &str) -> String {
        let downloader = Arc::new(Downloader::new(
            next_process_id(),
            url.to_string(),
            self.download_dir.clone(),
            self.connections,
            self.retry,
            Arc::clone(&self.transport),
            Arc::clone(&self.listener),
        ));
        let process_id = downloader.process_id().to_string();
        self.registry
            .write()
            .unwrap()
            .insert(process_id.clone(), Arc::clone(&downloader));
        tracing::info!(process_id = %process_id, url, "download accepted");

        self.pool.execute(move || downloader.start());
        process_id
    }

    /// Status snapshot for a job; `None` if the id was never registered.
    pub fn status(&self, process_id: &str) -> Option<DownloadStatus> {
        self.registry
            .read()
            .unwrap()
            .get(process_id)
            .map(|d| d.status())
    }

    /// Request cooperative cancellation of a job.
    pub fn cancel(&self, process_id: &str) -> Result<(), UnknownProcessId> {
        match self.registry.read().unwrap().get(process_id) {
            Some(downloader) => {
                tracing::info!(process_id, "cancellation requested");
                downloader.request_cancel();
                Ok(())
            }
            None => Err(UnknownProcessId(process_id.to_string())),
        }
    }

    /// Install the observer that receives every job's lifecycle events,
    /// including events from jobs submitted before the call.
    pub fn set_listener(&self, listener: Arc<dyn DownloadListener>) {
        *self.listener.write().unwrap() = Some(listener);
    }

    /// Snapshot of every registered job, running or finished.
    pub fn list(&self) -> Vec<DownloadStatus> {
        self.registry
            .read()
            .unwrap()
            .values()
            .map(|d| d.status())
            .collect()
    }
}
