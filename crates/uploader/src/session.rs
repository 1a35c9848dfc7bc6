//! Per-file sequential chunk upload.
//!
//! One file is one server session. The session id only exists after the
//! first chunk's response, and the server assembles chunks by arrival
//! order, so chunks are strictly sequential within a file: chunk `k+1` is
//! not sent before chunk `k`'s response has been received. Concurrency
//! happens across files, never inside one.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wellsite_protocol::ChunkResponse;
use wellsite_transfer::{ChunkReader, ChunkSpan, FileTransfer};

use crate::client::UploadClient;
use crate::dedup::UploadItem;
use crate::error::{HttpError, UploadError};

/// Drives one file through its upload session.
pub(crate) struct FileUpload {
    client: Arc<UploadClient>,
    item: UploadItem,
    transfer: Arc<FileTransfer>,
    cancel: CancellationToken,
}

impl FileUpload {
    pub(crate) fn new(
        client: Arc<UploadClient>,
        item: UploadItem,
        transfer: Arc<FileTransfer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            item,
            transfer,
            cancel,
        }
    }

    /// Uploads all chunks in order, then finalizes the session.
    ///
    /// Returns the server's session id. The transfer handle is kept
    /// current throughout for progress reporting.
    pub(crate) async fn run(&self) -> Result<String, UploadError> {
        let file_name = self
            .item
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.item.path.to_string_lossy().into_owned());

        let mut reader =
            ChunkReader::open(&self.item.path, self.client.config().chunk_size).await?;
        let file_size = reader.file_size();

        self.transfer.await_session();
        let mut upload_id = String::new();

        if file_size == 0 {
            // A zero-byte file has no chunks, but the server only opens a
            // session on receipt of a chunk. Send a single empty one so
            // there is something to finalize.
            let span = ChunkSpan {
                index: 0,
                start: 0,
                end: 0,
            };
            let resp = self
                .send_with_retry(&file_name, span, Vec::new(), 0, &upload_id)
                .await?;
            self.adopt_session(&mut upload_id, resp);
        }

        while let Some(chunk) = reader.next_chunk().await? {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let sent = chunk.span.len() as u64;
            let resp = self
                .send_with_retry(&file_name, chunk.span, chunk.data, file_size, &upload_id)
                .await?;
            self.adopt_session(&mut upload_id, resp);
            self.transfer.add_sent(sent);
        }

        if upload_id.is_empty() {
            return Err(UploadError::Protocol(
                "server never issued an upload session id".into(),
            ));
        }

        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        self.transfer.finalizing();
        self.client
            .complete(&upload_id, &file_name)
            .await
            .map_err(|source| UploadError::Finalize {
                upload_id: upload_id.clone(),
                source,
            })?;
        self.transfer.complete();

        info!(file = %file_name, session = %upload_id, "file upload complete");
        Ok(upload_id)
    }

    /// Adopts the session id from a chunk response, if one was issued.
    fn adopt_session(&self, upload_id: &mut String, resp: ChunkResponse) {
        if let Some(id) = resp.upload_id {
            if upload_id.is_empty() {
                debug!(file = %self.item.path.display(), session = %id, "session opened");
            }
            self.transfer.session_opened(&id);
            *upload_id = id;
        }
    }

    /// Sends one chunk, retrying transient failures with backoff.
    async fn send_with_retry(
        &self,
        file_name: &str,
        span: ChunkSpan,
        data: Vec<u8>,
        file_size: u64,
        upload_id: &str,
    ) -> Result<ChunkResponse, UploadError> {
        let retry = &self.client.config().retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self
                .client
                .send_chunk(
                    file_name,
                    span,
                    data.clone(),
                    file_size,
                    upload_id,
                    &self.item.hash,
                )
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < retry.attempts && is_transient(&e) => {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        file = %file_name,
                        chunk = span.index,
                        attempt,
                        error = %e,
                        "chunk upload failed, retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(source) => {
                    return Err(UploadError::Chunk {
                        index: span.index,
                        source,
                    });
                }
            }
        }
    }
}

/// Transient failures are worth retrying: transport errors and 5xx
/// responses. 4xx means the request itself is wrong and will not improve.
fn is_transient(err: &HttpError) -> bool {
    match err {
        HttpError::Transport(_) => true,
        HttpError::Status { status, .. } => *status >= 500,
    }
}
