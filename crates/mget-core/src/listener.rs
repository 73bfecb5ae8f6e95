//! Download event notifications.

use crate::progress::DownloadStatus;
use std::sync::{Arc, RwLock};

/// Observer for job lifecycle events.
///
/// Per job, `on_download_started` fires at most once (it is skipped when
/// metadata discovery itself fails before any status is known), followed by
/// exactly one of `on_download_finished` or `on_download_failed`. Callbacks
/// run on the job's own thread; implementations should return promptly.
pub trait DownloadListener: Send + Sync {
    fn on_download_started(&self, _status: &DownloadStatus) {}
    fn on_download_finished(&self, _status: &DownloadStatus) {}
    fn on_download_failed(&self, _status: &DownloadStatus) {}
}

/// Shared listener slot owned by the manager and read by every job, so a
/// listener installed after jobs were submitted still receives their events.
pub(crate) type ListenerSlot = Arc<RwLock<Option<Arc<dyn DownloadListener>>>>;
