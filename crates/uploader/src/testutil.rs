//! Minimal HTTP mock server for upload pipeline tests.
//!
//! One request per connection: the server reads the full request, records
//! it, and answers with whatever the test's responder closure returns.
//! Handles both `Content-Length` and chunked request bodies so tests don't
//! depend on how the client chooses to frame a body.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub content_range: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Extracts a multipart text field by name. Test payloads are ASCII,
    /// so a lossy scan of the raw body is good enough.
    pub fn multipart_field(&self, name: &str) -> Option<String> {
        let text = String::from_utf8_lossy(&self.body);
        let marker = format!("name=\"{name}\"");
        let at = text.find(&marker)?;
        let rest = &text[at + marker.len()..];
        let start = rest.find("\r\n\r\n")? + 4;
        let end = rest[start..].find("\r\n")? + start;
        Some(rest[start..end].to_string())
    }

    pub fn body_contains(&self, needle: &[u8]) -> bool {
        self.body.windows(needle.len()).any(|w| w == needle)
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Chooses the `(status, json_body)` answer for a recorded request; the
/// second argument is the request's arrival index.
pub(crate) type Responder = Arc<dyn Fn(&RecordedRequest, usize) -> (u16, String) + Send + Sync>;

pub(crate) fn json_responder(
    f: impl Fn(&RecordedRequest, usize) -> (u16, String) + Send + Sync + 'static,
) -> Responder {
    Arc::new(f)
}

pub(crate) struct MockServer {
    /// Base URL ending in `/api`, ready for `UploadConfig::new`.
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    high_water: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start(responder: Responder) -> Self {
        Self::start_with_delay(responder, None).await
    }

    /// Starts the server; `delay` holds every response open for that long,
    /// which makes concurrent requests observable via [`high_water`](Self::high_water).
    pub async fn start_with_delay(responder: Responder, delay: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{port}/api");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));
        let next_index = Arc::new(AtomicUsize::new(0));

        let handle = {
            let requests = Arc::clone(&requests);
            let concurrent = Arc::clone(&concurrent);
            let high_water = Arc::clone(&high_water);
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let responder = Arc::clone(&responder);
                    let requests = Arc::clone(&requests);
                    let concurrent = Arc::clone(&concurrent);
                    let high_water = Arc::clone(&high_water);
                    let next_index = Arc::clone(&next_index);
                    tokio::spawn(async move {
                        let _ = handle_connection(
                            stream, responder, requests, next_index, concurrent, high_water,
                            delay,
                        )
                        .await;
                    });
                }
            })
        };

        Self {
            base_url,
            requests,
            high_water,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    mut stream: TcpStream,
    responder: Responder,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    next_index: Arc<AtomicUsize>,
    concurrent: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
    delay: Option<Duration>,
) -> std::io::Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };
    let index = next_index.fetch_add(1, Ordering::SeqCst);
    requests.lock().unwrap().push(request.clone());

    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
    high_water.fetch_max(now, Ordering::SeqCst);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = responder(&request, index);
    concurrent.fetch_sub(1, Ordering::SeqCst);

    let response = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    // Headers.
    let header_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let header_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    let mut content_length: Option<usize> = None;
    let mut content_range = None;
    let mut chunked = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => content_length = value.parse().ok(),
            "content-range" => content_range = Some(value.to_string()),
            "transfer-encoding" if value.eq_ignore_ascii_case("chunked") => chunked = true,
            _ => {}
        }
    }

    let rest = buf.split_off(header_end + 4);
    let body = if chunked {
        read_chunked_body(stream, rest).await?
    } else {
        let len = content_length.unwrap_or(0);
        let mut body = rest;
        while body.len() < len {
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&tmp[..n]);
        }
        body.truncate(len);
        body
    };

    Ok(Some(RecordedRequest {
        path,
        content_range,
        body,
    }))
}

async fn read_chunked_body(
    stream: &mut TcpStream,
    mut pending: Vec<u8>,
) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut tmp = [0u8; 8192];
    loop {
        // Chunk size line.
        let line_end = loop {
            if let Some(pos) = find_subslice(&pending, b"\r\n") {
                break pos;
            }
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Ok(body);
            }
            pending.extend_from_slice(&tmp[..n]);
        };
        let size_line = String::from_utf8_lossy(&pending[..line_end]).into_owned();
        let size_hex = size_line.split(';').next().unwrap_or("0").trim();
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);
        pending.drain(..line_end + 2);

        if size == 0 {
            return Ok(body);
        }
        while pending.len() < size + 2 {
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Ok(body);
            }
            pending.extend_from_slice(&tmp[..n]);
        }
        body.extend_from_slice(&pending[..size]);
        pending.drain(..size + 2); // data + trailing CRLF
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_field_extraction() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"upload_id\"\r\n\r\nabc-123\r\n--b\r\nContent-Disposition: form-data; name=\"realname\"\r\n\r\nrun-4.las\r\n--b--\r\n";
        let req = RecordedRequest {
            path: "/api/chunkedUpload/complete".into(),
            content_range: None,
            body: body.to_vec(),
        };
        assert_eq!(req.multipart_field("upload_id").as_deref(), Some("abc-123"));
        assert_eq!(req.multipart_field("realname").as_deref(), Some("run-4.las"));
        assert!(req.multipart_field("missing").is_none());
    }

    #[test]
    fn empty_multipart_field_is_empty_string() {
        let body =
            b"--b\r\nContent-Disposition: form-data; name=\"upload_id\"\r\n\r\n\r\n--b--\r\n";
        let req = RecordedRequest {
            path: "/api/chunkedUpload/start".into(),
            content_range: None,
            body: body.to_vec(),
        };
        assert_eq!(req.multipart_field("upload_id").as_deref(), Some(""));
    }
}
