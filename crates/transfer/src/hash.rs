use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::TransferError;
use wellsite_protocol::HASH_BLOCK_SIZE;

/// Computes SHA-256 of `data` and returns the lowercase hex digest.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes a file's content digest by streaming 2 MiB blocks through an
/// incremental SHA-256.
///
/// Blocks are absorbed in strictly increasing offset order; the next block
/// is not read until the previous one has been fed to the hasher. The
/// digest depends only on the byte content, never on the name or on the
/// chunk size used for upload. A failed read aborts with no digest.
pub async fn hash_file(path: &Path) -> Result<String, TransferError> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let n = file.read(&mut block).await?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hashes `paths` one after another, preserving input order.
pub async fn hash_files(paths: &[PathBuf]) -> Result<Vec<String>, TransferError> {
    let mut hashes = Vec::with_capacity(paths.len());
    for path in paths {
        hashes.push(hash_file(path).await?);
    }
    Ok(hashes)
}
