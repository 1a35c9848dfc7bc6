use std::path::PathBuf;
use std::sync::RwLock;

use uuid::Uuid;

/// Lifecycle of one file's upload.
///
/// Sequential chunk uploads give each file a simple state machine: the
/// session id arrives with the first chunk response, chunks flow while
/// `Uploading`, and the finalize round trip closes the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Queued, waiting for a concurrency slot.
    Pending,
    /// First chunk sent, no session id from the server yet.
    AwaitingSession,
    /// Session open, chunks in flight.
    Uploading,
    /// All chunks accepted, finalize request in flight.
    Finalizing,
    /// Finalize succeeded; the file is fully stored.
    Completed,
    Failed,
    Cancelled,
}

/// Point-in-time progress snapshot for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub transfer_id: String,
    pub path: PathBuf,
    pub state: TransferState,
    pub total_bytes: u64,
    pub sent_bytes: u64,
    pub upload_id: Option<String>,
    pub error: String,
    /// Filled in by [`ProgressTracker`](crate::ProgressTracker); a raw
    /// snapshot reports 0.
    pub bytes_per_second: f64,
}

/// Thread-safe handle tracking one file's upload.
pub struct FileTransfer {
    inner: RwLock<TransferInner>,
}

struct TransferInner {
    id: String,
    path: PathBuf,
    state: TransferState,
    total_bytes: u64,
    sent_bytes: u64,
    upload_id: Option<String>,
    error: String,
}

impl FileTransfer {
    /// Creates a pending transfer for `path`.
    pub fn new(path: PathBuf, total_bytes: u64) -> Self {
        Self {
            inner: RwLock::new(TransferInner {
                id: Uuid::new_v4().to_string(),
                path,
                state: TransferState::Pending,
                total_bytes,
                sent_bytes: 0,
                upload_id: None,
                error: String::new(),
            }),
        }
    }

    /// Client-side transfer id (distinct from the server's session id).
    pub fn id(&self) -> String {
        self.inner.read().unwrap().id.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.inner.read().unwrap().path.clone()
    }

    /// Marks the first chunk as sent, session id pending.
    pub fn await_session(&self) {
        self.inner.write().unwrap().state = TransferState::AwaitingSession;
    }

    /// Records the server-issued session id and moves to `Uploading`.
    pub fn session_opened(&self, upload_id: &str) {
        let mut t = self.inner.write().unwrap();
        t.upload_id = Some(upload_id.to_string());
        t.state = TransferState::Uploading;
    }

    /// Adds bytes accepted by the server.
    pub fn add_sent(&self, bytes: u64) {
        self.inner.write().unwrap().sent_bytes += bytes;
    }

    /// All chunks accepted; finalize request in flight.
    pub fn finalizing(&self) {
        self.inner.write().unwrap().state = TransferState::Finalizing;
    }

    pub fn complete(&self) {
        self.inner.write().unwrap().state = TransferState::Completed;
    }

    pub fn fail(&self, error: &str) {
        let mut t = self.inner.write().unwrap();
        t.state = TransferState::Failed;
        t.error = error.to_string();
    }

    pub fn cancel(&self) {
        self.inner.write().unwrap().state = TransferState::Cancelled;
    }

    pub fn state(&self) -> TransferState {
        self.inner.read().unwrap().state
    }

    pub fn sent_bytes(&self) -> u64 {
        self.inner.read().unwrap().sent_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.read().unwrap().total_bytes
    }

    pub fn upload_id(&self) -> Option<String> {
        self.inner.read().unwrap().upload_id.clone()
    }

    /// `true` until the transfer settles (completed, failed, or cancelled).
    pub fn is_active(&self) -> bool {
        !matches!(
            self.inner.read().unwrap().state,
            TransferState::Completed | TransferState::Failed | TransferState::Cancelled
        )
    }

    pub fn snapshot(&self) -> TransferProgress {
        let t = self.inner.read().unwrap();
        TransferProgress {
            transfer_id: t.id.clone(),
            path: t.path.clone(),
            state: t.state,
            total_bytes: t.total_bytes,
            sent_bytes: t.sent_bytes,
            upload_id: t.upload_id.clone(),
            error: t.error.clone(),
            bytes_per_second: 0.0,
        }
    }
}
