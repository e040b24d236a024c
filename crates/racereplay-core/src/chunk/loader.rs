//! Chunk Loader
//!
//! Maps a playback position to its chunk, serves it from the cache or the
//! API and warms the cache for the chunks that follow.
//!
//! A chunk whose prefetch failed is not prefetched again until the loader
//! is invalidated; only a foreground request for one of its positions
//! retries it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use super::cache::{Chunk, ChunkCache, ChunkKey};
use crate::api::{FetchError, TelemetrySource};
use crate::lock;
use crate::timeline::TimelineIndex;

/// Why a chunk request was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// A position the caller is waiting on
    Foreground,
    /// Speculative warm-up of an upcoming chunk
    Prefetch,
}

/// Counters describing loader activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub foreground_fetches: u64,
    pub prefetches: u64,
    pub failures: u64,
    /// Responses dropped because the loader was invalidated meanwhile
    pub stale_drops: u64,
}

#[derive(Debug)]
enum LoadFailure {
    Fetch(FetchError),
    Stale,
}

/// Chunk request shared by every caller waiting on the same key
type PendingChunk = Arc<OnceCell<Chunk>>;

struct LoaderInner {
    source: Arc<dyn TelemetrySource>,
    race_id: String,
    vehicle_id: String,
    timeline: Arc<TimelineIndex>,
    chunk_size: usize,
    preload_ahead: usize,
    cache: Mutex<ChunkCache>,
    pending: Mutex<HashMap<ChunkKey, PendingChunk>>,
    /// Chunks whose prefetch failed in the current generation
    failed_prefetches: Mutex<HashSet<ChunkKey>>,
    generation: AtomicU64,
    stats: Mutex<LoaderStats>,
}

/// Loads telemetry chunks for one car
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct ChunkLoader {
    inner: Arc<LoaderInner>,
}

impl ChunkLoader {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        race_id: impl Into<String>,
        vehicle_id: impl Into<String>,
        timeline: Arc<TimelineIndex>,
        chunk_size: usize,
        preload_ahead: usize,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                source,
                race_id: race_id.into(),
                vehicle_id: vehicle_id.into(),
                timeline,
                chunk_size: chunk_size.max(1),
                preload_ahead,
                cache: Mutex::new(ChunkCache::new()),
                pending: Mutex::new(HashMap::new()),
                failed_prefetches: Mutex::new(HashSet::new()),
                generation: AtomicU64::new(0),
                stats: Mutex::new(LoaderStats::default()),
            }),
        }
    }

    /// Timeline points per chunk
    pub fn chunk_size(&self) -> usize {
        self.inner.chunk_size
    }

    pub fn timeline(&self) -> &Arc<TimelineIndex> {
        &self.inner.timeline
    }

    /// Key of the chunk owning a position
    pub fn chunk_key_for(&self, position: usize) -> Option<ChunkKey> {
        ChunkKey::for_position(position, self.inner.chunk_size, self.inner.timeline.len())
    }

    /// Whether the chunk owning `position` is already cached
    pub fn is_cached(&self, position: usize) -> bool {
        self.chunk_key_for(position)
            .is_some_and(|key| lock(&self.inner.cache).contains(&key))
    }

    /// Number of chunks in the cache
    pub fn cached_chunks(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn stats(&self) -> LoaderStats {
        *lock(&self.inner.stats)
    }

    /// Current cache generation
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Drop every cached chunk and disown requests still in flight
    ///
    /// Late responses from before the call are discarded instead of cached.
    pub fn invalidate(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.inner.cache).clear();
        lock(&self.inner.pending).clear();
        lock(&self.inner.failed_prefetches).clear();
        tracing::debug!(
            "chunk cache for {}/{} invalidated (generation {})",
            self.inner.race_id,
            self.inner.vehicle_id,
            generation
        );
    }

    /// Get the chunk covering `position`, fetching it if needed
    ///
    /// Returns `None` for an empty timeline, an out-of-range position or a
    /// failed fetch. Upcoming chunks are prefetched in the background
    /// whatever the outcome.
    pub async fn ensure_loaded(&self, position: usize) -> Option<Chunk> {
        let key = self.chunk_key_for(position)?;

        self.prefetch_after(key);

        if let Some(chunk) = lock(&self.inner.cache).get(&key) {
            tracing::trace!("chunk {key} served from cache");
            return Some(chunk);
        }

        let generation = self.generation();
        match self.inner.clone().load(key, FetchOrigin::Foreground, generation).await {
            Ok(chunk) => Some(chunk),
            Err(LoadFailure::Fetch(e)) => {
                tracing::warn!("failed to load chunk {key} for position {position}: {e}");
                None
            }
            Err(LoadFailure::Stale) => None,
        }
    }

    /// Spawn detached fetches for the chunks following `key`
    fn prefetch_after(&self, key: ChunkKey) {
        let len = self.inner.timeline.len();
        let mut next = key;
        for _ in 0..self.inner.preload_ahead {
            let Some(upcoming) = next.next(self.inner.chunk_size, len) else {
                break;
            };
            next = upcoming;

            if lock(&self.inner.cache).contains(&upcoming)
                || lock(&self.inner.failed_prefetches).contains(&upcoming)
            {
                continue;
            }
            {
                // Claim the slot now so a request arriving before the task
                // runs joins it instead of fetching again
                let mut pending = lock(&self.inner.pending);
                if pending.contains_key(&upcoming) {
                    continue;
                }
                pending.insert(upcoming, PendingChunk::default());
            }

            let inner = self.inner.clone();
            let generation = self.generation();
            tokio::spawn(async move {
                match inner.clone().load(upcoming, FetchOrigin::Prefetch, generation).await {
                    Ok(chunk) => {
                        tracing::debug!("prefetched chunk {upcoming} ({} records)", chunk.len())
                    }
                    Err(LoadFailure::Fetch(e)) => {
                        tracing::warn!("prefetch of chunk {upcoming} failed: {e}");
                        inner.remember_failed_prefetch(upcoming, generation);
                    }
                    Err(LoadFailure::Stale) => {}
                }
            });
        }
    }
}

impl LoaderInner {
    fn remember_failed_prefetch(&self, key: ChunkKey, generation: u64) {
        let mut failed = lock(&self.failed_prefetches);
        // `invalidate` bumps the generation before clearing this set
        if self.generation.load(Ordering::SeqCst) == generation {
            failed.insert(key);
        }
    }

    /// Load a chunk, sharing one network request between concurrent callers
    async fn load(
        self: Arc<Self>,
        key: ChunkKey,
        origin: FetchOrigin,
        generation: u64,
    ) -> Result<Chunk, LoadFailure> {
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(LoadFailure::Stale);
        }

        if let Some(chunk) = lock(&self.cache).get(&key) {
            return Ok(chunk);
        }

        let cell = lock(&self.pending).entry(key).or_default().clone();
        let result = cell
            .get_or_try_init(|| self.fetch(key, origin, generation))
            .await
            .cloned();

        let mut pending = lock(&self.pending);
        if pending.get(&key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            pending.remove(&key);
        }
        result
    }

    async fn fetch(
        &self,
        key: ChunkKey,
        origin: FetchOrigin,
        generation: u64,
    ) -> Result<Chunk, LoadFailure> {
        let (Some(first), Some(last)) = (self.timeline.get(key.start), self.timeline.get(key.end))
        else {
            return Err(LoadFailure::Fetch(FetchError::NotFound(format!(
                "chunk {key} outside timeline"
            ))));
        };

        {
            let mut stats = lock(&self.stats);
            match origin {
                FetchOrigin::Foreground => stats.foreground_fetches += 1,
                FetchOrigin::Prefetch => stats.prefetches += 1,
            }
        }
        tracing::debug!(
            "fetching chunk {key} [{} .. {}] ({origin:?})",
            first.timestamp,
            last.timestamp
        );

        let response = self
            .source
            .chunk(&self.race_id, &self.vehicle_id, &first.timestamp, &last.timestamp)
            .await
            .map_err(|e| {
                lock(&self.stats).failures += 1;
                LoadFailure::Fetch(e)
            })?;

        if self.generation.load(Ordering::SeqCst) != generation {
            lock(&self.stats).stale_drops += 1;
            tracing::debug!("dropping chunk {key} from generation {generation}");
            return Err(LoadFailure::Stale);
        }

        let chunk: Chunk = Arc::new(response.data);
        Ok(lock(&self.cache).put(key, chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticSource;
    use crate::resolver::PositionResolver;
    use crate::telemetry::TelemetryRecord;
    use crate::timestamp::Timestamp;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn source() -> Arc<StaticSource> {
        let records = [(0, 1), (100, 1), (5000, 2)]
            .into_iter()
            .map(|(ms, lap)| TelemetryRecord::new(Timestamp::from_millis(ms), lap))
            .collect();
        Arc::new(StaticSource::new().with_car("R1", "car-7", records))
    }

    async fn loader(source: &Arc<StaticSource>, chunk_size: usize) -> ChunkLoader {
        let timeline = TimelineIndex::load(source.as_ref(), "R1", "car-7")
            .await
            .unwrap();
        ChunkLoader::new(
            source.clone(),
            "R1",
            "car-7",
            Arc::new(timeline),
            chunk_size,
            2,
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn loads_chunk_and_prefetches_the_next() {
        let source = source();
        let loader = loader(&source, 2).await;

        let chunk = loader.ensure_loaded(1).await.unwrap();
        let millis: Vec<i64> = chunk.iter().map(|r| r.timestamp.millis()).collect();
        assert_eq!(millis, vec![0, 100]);

        settle().await;
        assert!(loader.is_cached(2));
        assert_eq!(loader.cached_chunks(), 2);
        assert_eq!(loader.stats().prefetches, 1);

        let resolver = PositionResolver::new(loader.clone(), Duration::from_secs(1));
        let record = resolver.resolve(2).await.unwrap();
        assert_eq!(record.timestamp.millis(), 5000);
        assert_eq!(record.lap, Some(2));
        assert_eq!(loader.stats().foreground_fetches, 1);
        assert_eq!(source.chunk_requests(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_requests_fetch_once() {
        let source = source();
        let loader = loader(&source, 2).await;

        loader.ensure_loaded(0).await.unwrap();
        loader.ensure_loaded(1).await.unwrap();
        settle().await;

        assert_eq!(loader.stats().foreground_fetches, 1);
        assert_eq!(source.chunk_requests(), 2);
    }

    #[tokio::test]
    async fn empty_timeline_returns_none() {
        let source = source();
        let loader = ChunkLoader::new(
            source.clone(),
            "R1",
            "car-7",
            Arc::new(TimelineIndex::empty()),
            2,
            2,
        );
        assert!(loader.ensure_loaded(0).await.is_none());
        assert_eq!(source.chunk_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_clears_cache_and_bumps_generation() {
        let source = source();
        let loader = loader(&source, 2).await;
        loader.ensure_loaded(0).await.unwrap();
        settle().await;

        loader.invalidate();
        assert_eq!(loader.cached_chunks(), 0);
        assert_eq!(loader.generation(), 1);
        assert!(!loader.is_cached(0));
    }
}
