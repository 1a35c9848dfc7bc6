//! Wire contract for the wellsite chunked-upload API.
//!
//! The upload server exposes three endpoints under `/api`:
//!
//! - `POST /chunkedUpload/start`: one multipart request per chunk; the
//!   server opens a session on the first chunk and returns its id.
//! - `POST /chunkedUpload/complete`: assembles a session's chunks into a
//!   stored file under its real name.
//! - `POST /chunkedUpload/check_uploads`: bulk existence check by content
//!   hash, used for deduplication.
//!
//! This crate holds the payload types, the `Content-Range` formatter, and
//! the contract constants. It knows nothing about HTTP transport.

pub mod messages;

pub use messages::{CheckUploadsRequest, CheckUploadsResponse, ChunkResponse};

/// Upload chunk size: 8 MiB. Each chunk is one multipart POST.
pub const CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Read block size for content hashing: 2 MiB.
pub const HASH_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// Default number of files uploading simultaneously.
///
/// Bulk imports can carry thousands of files; the bound keeps them from
/// opening thousands of connections at once.
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 2;

/// Chunk upload endpoint, relative to the API base URL.
pub const CHUNK_START_PATH: &str = "/chunkedUpload/start";

/// Session finalize endpoint, relative to the API base URL.
pub const COMPLETE_PATH: &str = "/chunkedUpload/complete";

/// Bulk existence-check endpoint, relative to the API base URL.
pub const CHECK_UPLOADS_PATH: &str = "/chunkedUpload/check_uploads";

/// Formats the `Content-Range` value sent with one chunk.
///
/// `start` is inclusive, `end` exclusive (`start + chunk length`), and
/// `total` is the full file size in bytes.
pub fn content_range(start: u64, end: u64, total: u64) -> String {
    format!("bytes {start}-{end}/{total}")
}
