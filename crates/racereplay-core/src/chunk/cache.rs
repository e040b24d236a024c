//! Chunk Cache - in-memory store of fetched telemetry chunks
//!
//! Entries are write-once and never evicted while a car is selected. The
//! whole cache is dropped on car or race change, which bounds it by the
//! length of one session.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::telemetry::TelemetryRecord;

/// Telemetry records covering one chunk, shared between the cache and readers
pub type Chunk = Arc<Vec<TelemetryRecord>>;

/// Inclusive range of timeline positions covered by one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey {
    pub start: usize,
    pub end: usize,
}

impl ChunkKey {
    /// Key of the chunk owning `position`
    ///
    /// Boundaries depend only on the chunk size and timeline length, never
    /// on the exact position, so nearby seeks share cache entries.
    pub fn for_position(position: usize, chunk_size: usize, timeline_len: usize) -> Option<Self> {
        if position >= timeline_len {
            return None;
        }
        let size = chunk_size.max(1);
        let start = (position / size) * size;
        let end = (start + size - 1).min(timeline_len - 1);
        Some(Self { start, end })
    }

    /// The chunk starting right after this one, if the timeline continues
    pub fn next(&self, chunk_size: usize, timeline_len: usize) -> Option<Self> {
        Self::for_position(self.end + 1, chunk_size, timeline_len)
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..=self.end).contains(&position)
    }

    /// Number of timeline points covered
    pub fn points(&self) -> usize {
        self.end - self.start + 1
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// Holds every chunk fetched for the current car
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: BTreeMap<ChunkKey, Chunk>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ChunkKey) -> Option<Chunk> {
        self.chunks.get(key).cloned()
    }

    /// Store a chunk
    ///
    /// An existing entry is kept; the stored chunk is returned either way.
    pub fn put(&mut self, key: ChunkKey, records: Chunk) -> Chunk {
        self.chunks.entry(key).or_insert(records).clone()
    }

    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.chunks.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Number of cached chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total records held across all chunks
    pub fn record_count(&self) -> usize {
        self.chunks.values().map(|c| c.len()).sum()
    }
}
