//! Bounded-concurrency batch upload coordinator.
//!
//! Fans a batch out over per-file upload tasks, at most
//! `max_concurrent_files` at a time. Bulk folder imports can carry
//! thousands of files; the semaphore is what keeps them from opening
//! thousands of connections. Within one file, chunks stay strictly
//! sequential (see [`session`](crate::session)).

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wellsite_transfer::{FileTransfer, ProgressTracker};

use crate::client::UploadClient;
use crate::dedup::{UploadBatch, UploadItem};
use crate::error::UploadError;
use crate::session::FileUpload;

/// Callback invoked when one file has been fully stored (chunks uploaded
/// and the session finalized), with the server's session id.
pub type FileUploadedCallback = Box<dyn Fn(&UploadItem, &str) + Send + Sync>;

/// Callback invoked once after every file in the batch has settled.
pub type BatchCompleteCallback = Box<dyn Fn(&BatchReport) + Send + Sync>;

/// Optional completion callbacks for a batch upload.
#[derive(Default)]
pub struct UploadCallbacks {
    pub on_file_uploaded: Option<FileUploadedCallback>,
    pub on_batch_complete: Option<BatchCompleteCallback>,
}

/// Outcome of one file in a batch: the session id, or why it failed.
#[derive(Debug)]
pub struct FileOutcome {
    pub item: UploadItem,
    pub result: Result<String, UploadError>,
}

/// Batch summary. Outcomes are in input order regardless of which file
/// finished first.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Uploads many files with bounded concurrency.
///
/// One file's failure never aborts its siblings: every file settles and
/// the report carries all outcomes.
pub struct BatchUploader {
    client: Arc<UploadClient>,
    cancel: CancellationToken,
    progress: Option<Arc<ProgressTracker>>,
}

impl BatchUploader {
    pub fn new(client: UploadClient) -> Self {
        Self {
            client: Arc::new(client),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Attaches a progress tracker; every file's transfer is tracked for
    /// the duration of its upload and notified once when it settles.
    pub fn with_progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// Token for cancelling the batch: queued files are abandoned, files
    /// in flight stop at their next chunk boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads every item in `batch` and reports all outcomes.
    pub async fn upload(&self, batch: UploadBatch, callbacks: UploadCallbacks) -> BatchReport {
        let limit = self.client.config().max_concurrent_files;
        let semaphore = Arc::new(Semaphore::new(limit));
        let callbacks = Arc::new(callbacks);

        let mut handles = Vec::with_capacity(batch.len());
        for item in &batch {
            let item = item.clone();
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let callbacks = Arc::clone(&callbacks);
            let progress = self.progress.clone();
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(UploadError::Cancelled),
                };
                if cancel.is_cancelled() {
                    return Err(UploadError::Cancelled);
                }

                let transfer = Arc::new(FileTransfer::new(item.path.clone(), item.size));
                if let Some(tracker) = &progress {
                    tracker.track(Arc::clone(&transfer));
                }

                let upload = FileUpload::new(client, item.clone(), Arc::clone(&transfer), cancel);
                let result = upload.run().await;

                match &result {
                    Ok(upload_id) => {
                        if let Some(cb) = &callbacks.on_file_uploaded {
                            cb(&item, upload_id);
                        }
                    }
                    Err(UploadError::Cancelled) => transfer.cancel(),
                    Err(e) => {
                        warn!(file = %item.path.display(), error = %e, "file upload failed");
                        transfer.fail(&e.to_string());
                    }
                }

                if let Some(tracker) = &progress {
                    let id = transfer.id();
                    tracker.notify(&id);
                    tracker.untrack(&id);
                }

                result
            }));
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for (item, handle) in batch.into_iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(UploadError::Protocol(format!("upload task failed: {e}"))),
            };
            outcomes.push(FileOutcome { item, result });
        }

        let report = BatchReport { outcomes };
        info!(
            total = report.outcomes.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch upload settled"
        );

        if let Some(cb) = &callbacks.on_batch_complete {
            cb(&report);
        }
        report
    }
}
