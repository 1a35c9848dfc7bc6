//! Local file machinery for chunked uploads.
//!
//! Everything that touches the disk before a byte goes on the wire lives
//! here: splitting files into fixed-size chunk spans, reading them in
//! order, streaming content hashes, and tracking per-file transfer
//! progress for the caller's UI.

mod chunked;
mod hash;
mod progress;
mod types;

pub use chunked::{Chunk, ChunkReader, ChunkSpan, chunk_spans};
pub use hash::{hash_bytes, hash_file, hash_files};
pub use progress::{ProgressCallback, ProgressTracker, SpeedCalculator};
pub use types::{FileTransfer, TransferProgress, TransferState};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
