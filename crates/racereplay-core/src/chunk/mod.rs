//! Chunked telemetry loading
//!
//! The full telemetry of a race is far too large to pull into memory at
//! once. It is fetched in chunks of consecutive timeline positions and kept
//! for the rest of the session.

mod cache;
mod loader;

pub use cache::{Chunk, ChunkCache, ChunkKey};
pub use loader::{ChunkLoader, FetchOrigin, LoaderStats};
