//! Chunked upload pipeline for well-data files.
//!
//! The caller hands over a list of local files; the pipeline deduplicates
//! them by content hash against the server, splits each remaining file
//! into 8 MiB chunks, uploads the chunks sequentially under a
//! server-issued session id, finalizes each session under the file's real
//! name, and reports per-file and batch completion.
//!
//! [`upload_files`] is the one-call entry point; the pieces
//! ([`UploadClient`], [`filter_already_uploaded`], [`BatchUploader`]) are
//! public for callers that need finer control.

mod batch;
mod client;
mod config;
mod dedup;
mod error;
mod session;
#[cfg(test)]
mod testutil;

pub use batch::{
    BatchCompleteCallback, BatchReport, BatchUploader, FileOutcome, FileUploadedCallback,
    UploadCallbacks,
};
pub use client::UploadClient;
pub use config::{RetryConfig, UploadConfig};
pub use dedup::{UploadBatch, UploadItem, filter_already_uploaded};
pub use error::{HttpError, UploadError};

use std::path::PathBuf;

/// Uploads `paths` to the configured server.
///
/// Runs the whole pipeline: hash every file, drop the ones the server
/// already stores (unless `skip_check`), then upload the rest with
/// bounded concurrency, invoking `callbacks` as files settle.
pub async fn upload_files(
    config: UploadConfig,
    paths: &[PathBuf],
    skip_check: bool,
    callbacks: UploadCallbacks,
) -> Result<BatchReport, UploadError> {
    let client = UploadClient::new(config)?;
    let batch = filter_already_uploaded(&client, paths, skip_check).await?;
    Ok(BatchUploader::new(client).upload(batch, callbacks).await)
}
