use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::TransferError;
use wellsite_protocol::CHUNK_SIZE;

/// A byte range of a source file, scheduled as one chunk POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Zero-based chunk index (`start / chunk_size`).
    pub index: usize,
    /// Inclusive start offset.
    pub start: u64,
    /// Exclusive end offset: `min(start + chunk_size, file_size)`.
    pub end: u64,
}

impl ChunkSpan {
    /// Number of bytes covered by this span.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A materialized chunk: its span plus the bytes read from disk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub span: ChunkSpan,
    pub data: Vec<u8>,
}

/// Computes the chunk spans for a file of `file_size` bytes.
///
/// Spans are contiguous, non-overlapping, and cover `[0, file_size)`
/// exactly; the last span is short when the size is not a multiple of
/// `chunk_size`. A zero-byte file has no spans. If `chunk_size` is 0,
/// [`CHUNK_SIZE`] is used.
pub fn chunk_spans(file_size: u64, chunk_size: u64) -> Vec<ChunkSpan> {
    let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };
    let count = file_size.div_ceil(chunk_size) as usize;
    let mut spans = Vec::with_capacity(count);
    for index in 0..count {
        let start = index as u64 * chunk_size;
        let end = (start + chunk_size).min(file_size);
        spans.push(ChunkSpan { index, start, end });
    }
    spans
}

/// Reads a file sequentially in fixed-size chunks.
///
/// Chunks come back in strictly increasing offset order; the caller drives
/// the pace, so a chunk is not read from disk before the previous one has
/// been consumed.
pub struct ChunkReader {
    file: File,
    chunk_size: u64,
    file_size: u64,
    offset: u64,
    index: usize,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`CHUNK_SIZE`] (8 MiB) is used.
    pub async fn open(path: &Path, chunk_size: u64) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };
        Ok(Self {
            file,
            chunk_size,
            file_size,
            offset: 0,
            index: 0,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.file_size.saturating_sub(self.offset);
        if remaining == 0 {
            return Ok(None);
        }

        let len = remaining.min(self.chunk_size) as usize;
        let mut data = vec![0u8; len];
        self.file.read_exact(&mut data).await?;

        let span = ChunkSpan {
            index: self.index,
            start: self.offset,
            end: self.offset + len as u64,
        };
        self.offset = span.end;
        self.index += 1;
        Ok(Some(Chunk { span, data }))
    }

    /// Total file size in bytes, as observed at open time.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}
