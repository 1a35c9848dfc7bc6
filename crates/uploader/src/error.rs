//! Upload pipeline error types.

use wellsite_transfer::TransferError;

/// A single failed HTTP exchange: transport-level error or non-2xx status.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors produced by the upload pipeline.
///
/// Chunk, finalize, and existence-check failures are distinct variants so
/// callers can react differently: a failed finalize leaves an assembled
/// session server-side and only the completion call needs repeating, while
/// a failed chunk aborts that file's upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("read error: {0}")]
    Read(#[from] TransferError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chunk {index} upload failed: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: HttpError,
    },

    #[error("finalize failed for session {upload_id}: {source}")]
    Finalize {
        upload_id: String,
        #[source]
        source: HttpError,
    },

    #[error("upload existence check failed: {0}")]
    Check(#[source] HttpError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("cancelled")]
    Cancelled,
}
