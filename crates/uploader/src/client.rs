//! HTTP client for the chunked-upload endpoints.
//!
//! Thin request/response layer: one method per endpoint, status checking,
//! and payload parsing. Sequencing, retries, and concurrency live in
//! [`session`](crate::session) and [`batch`](crate::batch).

use reqwest::header::CONTENT_RANGE;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use wellsite_protocol::{CheckUploadsRequest, CheckUploadsResponse, ChunkResponse, content_range};
use wellsite_transfer::ChunkSpan;

use crate::config::UploadConfig;
use crate::error::{HttpError, UploadError};

/// Client over the three upload endpoints of a configured server.
pub struct UploadClient {
    http: reqwest::Client,
    config: UploadConfig,
}

impl UploadClient {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Uploads one chunk as a multipart POST.
    ///
    /// `upload_id` is the running session id, or the empty string on the
    /// first chunk when no session exists yet. The `Content-Range` header
    /// carries the chunk's byte range against the full file size.
    pub async fn send_chunk(
        &self,
        file_name: &str,
        span: ChunkSpan,
        data: Vec<u8>,
        file_size: u64,
        upload_id: &str,
        hash: &str,
    ) -> Result<ChunkResponse, HttpError> {
        debug!(
            file = %file_name,
            chunk = span.index,
            start = span.start,
            end = span.end,
            "sending chunk"
        );

        let part = Part::bytes(data).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("upload_id", upload_id.to_string())
            .text("hash", hash.to_string());

        let resp = self
            .http
            .post(self.config.chunk_start_url())
            .header(CONTENT_RANGE, content_range(span.start, span.end, file_size))
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<ChunkResponse>().await?)
    }

    /// Finalizes a session: the server assembles its chunks and stores the
    /// result under `realname`. The response body is implementation-defined;
    /// any 2xx status counts as success.
    pub async fn complete(&self, upload_id: &str, realname: &str) -> Result<(), HttpError> {
        debug!(session = %upload_id, file = %realname, "finalizing upload");

        let form = Form::new()
            .text("upload_id", upload_id.to_string())
            .text("realname", realname.to_string());

        let resp = self
            .http
            .post(self.config.complete_url())
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Asks the server which content hashes it already stores.
    ///
    /// Returns one flag per hash, same order (`true` = already uploaded).
    pub async fn check_uploads(&self, hashes: &[String]) -> Result<Vec<bool>, HttpError> {
        let req = CheckUploadsRequest {
            hashes: hashes.to_vec(),
        };

        let resp = self
            .http
            .post(self.config.check_uploads_url())
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body: CheckUploadsResponse = resp.json().await?;
        Ok(body.hashes)
    }
}
