use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chunk upload
// ---------------------------------------------------------------------------

/// Response to a chunk POST.
///
/// The server assigns `upload_id` when it opens a session for the first
/// chunk; responses to later chunks of the same session may omit it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Existence check
// ---------------------------------------------------------------------------

/// Bulk existence check: which of these content hashes are already stored?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckUploadsRequest {
    pub hashes: Vec<String>,
}

/// Existence-check answer: one flag per requested hash, same order.
/// `true` means the content is already on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckUploadsResponse {
    pub hashes: Vec<bool>,
}
