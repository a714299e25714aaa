//! Greedy chunk packing.
//!
//! When a submission does not fit in one request, files are grouped into
//! chunks that each fit a per-chunk capacity. Files are placed largest first
//! so that big files claim room before an accumulation of small files
//! fragments the remaining space.

use super::TokenizedFile;
use serde::Serialize;

/// A group of files assigned to one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    /// Paths of the files in this chunk, in placement order.
    pub files: Vec<String>,
    /// Sum of the token counts of the files in this chunk.
    pub estimated_token_count: usize,
    /// 1-based creation order; chunks are consumed in ascending priority.
    pub priority: usize,
}

impl FileChunk {
    fn new(priority: usize) -> Self {
        Self {
            files: Vec::new(),
            estimated_token_count: 0,
            priority,
        }
    }

    fn push(&mut self, file: &TokenizedFile) {
        self.files.push(file.path.clone());
        self.estimated_token_count = self.estimated_token_count.saturating_add(file.token_count);
    }

    /// Returns `true` if no files were placed in this chunk.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The plan handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingRecommendation {
    /// Whether the submission must be split into multiple passes.
    pub chunking_recommended: bool,
    /// Chunks in ascending priority order. Never empty.
    pub chunks: Vec<FileChunk>,
    /// Human-readable explanation, including any warnings.
    pub reason: String,
    /// Degraded-input notes collected during analysis.
    pub warnings: Vec<String>,
}

/// A file too large for any chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OversizedFile {
    /// Path of the file.
    pub path: String,
    /// Its token count.
    pub token_count: usize,
}

/// Result of [`pack_chunks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedChunks {
    /// Chunks in priority order.
    pub chunks: Vec<FileChunk>,
    /// Files that exceed the capacity on their own. Each sits alone in its
    /// chunk.
    pub oversized: Vec<OversizedFile>,
}

/// Places every file in a single chunk with priority 1.
#[must_use]
pub fn single_chunk(files: &[TokenizedFile]) -> FileChunk {
    let mut chunk = FileChunk::new(1);
    for file in files {
        chunk.push(file);
    }
    chunk
}

/// Packs files into chunks of at most `capacity` tokens.
///
/// Files are sorted by token count, largest first; equal counts keep their
/// input order. Each file is appended to the open chunk unless that would
/// push it past `capacity`, in which case the chunk is closed and a new one
/// opened. A file larger than `capacity` still gets a chunk of its own and is
/// reported in [`PackedChunks::oversized`].
///
/// Always returns at least one chunk.
#[must_use]
pub fn pack_chunks(files: &[TokenizedFile], capacity: usize) -> PackedChunks {
    let mut ordered: Vec<&TokenizedFile> = files.iter().collect();
    ordered.sort_by(|a, b| b.token_count.cmp(&a.token_count));

    let mut chunks = Vec::new();
    let mut oversized = Vec::new();
    let mut current = FileChunk::new(1);

    for file in ordered {
        if !current.is_empty()
            && current.estimated_token_count.saturating_add(file.token_count) > capacity
        {
            let next = FileChunk::new(chunks.len() + 2);
            chunks.push(std::mem::replace(&mut current, next));
        }

        if file.token_count > capacity {
            tracing::warn!(
                path = %file.path,
                token_count = file.token_count,
                capacity,
                "File exceeds chunk capacity, placing it alone"
            );
            oversized.push(OversizedFile {
                path: file.path.clone(),
                token_count: file.token_count,
            });
        }

        current.push(file);
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    PackedChunks { chunks, oversized }
}
