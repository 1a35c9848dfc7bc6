//! Deduplication against already-uploaded content.
//!
//! Well crews re-export the same logging runs over and over; hashing before
//! upload and asking the server what it already stores avoids shipping
//! identical files twice.

use std::path::PathBuf;

use tracing::debug;

use wellsite_transfer::{TransferError, hash_file};

use crate::client::UploadClient;
use crate::error::UploadError;

/// One file scheduled for upload, paired with its content hash.
///
/// File and hash travel together so the batch can never go out of
/// alignment, no matter how it is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub path: PathBuf,
    pub size: u64,
    pub hash: String,
}

/// Files that still need uploading, in caller-supplied order.
pub type UploadBatch = Vec<UploadItem>;

/// Hashes every file and drops the ones the server already stores.
///
/// Hashing runs sequentially over the input, preserving order. With
/// `skip_check` the server round trip is skipped entirely and every file
/// is kept. A failed existence check fails the whole batch, since partial
/// filtering would silently re-upload or silently drop files.
pub async fn filter_already_uploaded(
    client: &UploadClient,
    paths: &[PathBuf],
    skip_check: bool,
) -> Result<UploadBatch, UploadError> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(TransferError::from)?
            .len();
        let hash = hash_file(path).await?;
        items.push(UploadItem {
            path: path.clone(),
            size,
            hash,
        });
    }

    if skip_check {
        return Ok(items);
    }

    let hashes: Vec<String> = items.iter().map(|i| i.hash.clone()).collect();
    let flags = client
        .check_uploads(&hashes)
        .await
        .map_err(UploadError::Check)?;

    if flags.len() != items.len() {
        return Err(UploadError::Protocol(format!(
            "existence check returned {} flags for {} hashes",
            flags.len(),
            items.len()
        )));
    }

    let total = items.len();
    let kept: UploadBatch = items
        .into_iter()
        .zip(flags)
        .filter(|(_, already_uploaded)| !already_uploaded)
        .map(|(item, _)| item)
        .collect();

    debug!(total, kept = kept.len(), "existence check complete");
    Ok(kept)
}
