//! `mget get` – download URLs and render progress.

use anyhow::{bail, Result};
use mget_core::config;
use mget_core::listener::DownloadListener;
use mget_core::manager::DownloadManager;
use mget_core::progress::DownloadStatus;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Forwards terminal job events onto a channel the command loop drains.
struct TerminalEvents {
    tx: Mutex<Sender<DownloadStatus>>,
}

impl DownloadListener for TerminalEvents {
    fn on_download_finished(&self, status: &DownloadStatus) {
        let _ = self.tx.lock().unwrap().send(status.clone());
    }
    fn on_download_failed(&self, status: &DownloadStatus) {
        let _ = self.tx.lock().unwrap().send(status.clone());
    }
}

pub fn run_get(
    urls: Vec<String>,
    dir: Option<PathBuf>,
    connections: Option<usize>,
    jobs: Option<usize>,
) -> Result<()> {
    let mut cfg = config::load_or_init()?;
    if let Some(dir) = dir {
        cfg.download_dir = Some(dir);
    }
    if let Some(n) = connections {
        cfg.connections = n.max(1);
    }
    if let Some(n) = jobs {
        cfg.max_concurrent_jobs = n.max(1);
    }

    let manager = DownloadManager::new(&cfg);
    let (tx, rx) = mpsc::channel();
    manager.set_listener(Arc::new(TerminalEvents { tx: Mutex::new(tx) }));

    let ids: Vec<String> = urls.iter().map(|url| manager.download(url)).collect();
    tracing::info!(jobs = ids.len(), "downloads submitted");
    println!(
        "downloading {} file(s) to {}",
        ids.len(),
        cfg.download_dir().display()
    );

    let mut remaining = ids.len();
    let mut failed = 0usize;
    while remaining > 0 {
        match rx.recv_timeout(PROGRESS_INTERVAL) {
            Ok(status) => {
                remaining -= 1;
                let name = status
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "<unknown>".to_string());
                if status.success {
                    println!("done    {} ({} bytes)", name, status.downloaded);
                } else {
                    println!("failed  {} (job {})", name, status.process_id);
                    failed += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) => print_progress(&manager, &ids),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, ids.len());
    }
    Ok(())
}

fn print_progress(manager: &DownloadManager, ids: &[String]) {
    for id in ids {
        let Some(status) = manager.status(id) else {
            continue;
        };
        if status.ran && !status.finished && status.file_size > 0 {
            let done_mib = status.downloaded as f64 / 1_048_576.0;
            let total_mib = status.file_size as f64 / 1_048_576.0;
            println!(
                "  [{}] {:.1} / {:.1} MiB ({:.1}%)",
                id,
                done_mib,
                total_mib,
                status.fraction() * 100.0
            );
        }
    }
}
