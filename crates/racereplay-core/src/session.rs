//! Replay sessions
//!
//! A [`ReplaySession`] bundles everything that belongs to one car
//! selection: its timeline, chunk cache and playback scheduler. Selecting
//! another car through [`ReplayViewer`] tears the old session down and
//! builds a fresh one, so nothing leaks from one selection into the next.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::types::LapTiming;
use crate::api::{CarSummary, HttpSource, RaceSummary, TelemetrySource};
use crate::chunk::ChunkLoader;
use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::laps::LapTable;
use crate::playback::PlaybackScheduler;
use crate::resolver::PositionResolver;
use crate::telemetry::TelemetryRecord;
use crate::timeline::{TimelineEntry, TimelineIndex};

/// Playback state for one car of one race
pub struct ReplaySession {
    id: Uuid,
    race_id: String,
    vehicle_id: String,
    timeline: Arc<TimelineIndex>,
    loader: ChunkLoader,
    resolver: PositionResolver,
    scheduler: PlaybackScheduler,
    laps: LapTable,
}

impl ReplaySession {
    /// Load the timeline and lap table of a car and set up playback
    ///
    /// A failed timeline request is an error; without laps the session
    /// still works and the lap table stays empty.
    pub async fn open(
        source: Arc<dyn TelemetrySource>,
        config: &ReplayConfig,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<Self, ReplayError> {
        let timeline = TimelineIndex::load(source.as_ref(), race_id, vehicle_id).await?;

        let laps = if timeline.is_empty() {
            LapTable::default()
        } else {
            match LapTable::load(source.as_ref(), race_id, vehicle_id).await {
                Ok(laps) => laps,
                Err(e) => {
                    tracing::warn!("no lap timing for {race_id}/{vehicle_id}: {e}");
                    LapTable::default()
                }
            }
        };

        Ok(Self::with_timeline(source, config, race_id, vehicle_id, timeline).with_laps(laps))
    }

    /// Set up playback over an already loaded timeline
    pub fn with_timeline(
        source: Arc<dyn TelemetrySource>,
        config: &ReplayConfig,
        race_id: &str,
        vehicle_id: &str,
        timeline: TimelineIndex,
    ) -> Self {
        let timeline = Arc::new(timeline);
        let chunk_size = config.chunking.points(timeline.sample_interval());
        let loader = ChunkLoader::new(
            source,
            race_id,
            vehicle_id,
            timeline.clone(),
            chunk_size,
            config.preload_ahead,
        );
        let resolver = PositionResolver::new(loader.clone(), config.match_tolerance());
        let scheduler = PlaybackScheduler::new(resolver.clone(), config.tick_interval());

        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            race = race_id,
            vehicle = vehicle_id,
            points = timeline.len(),
            chunk_size,
            "replay session opened"
        );

        Self {
            id,
            race_id: race_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            timeline,
            loader,
            resolver,
            scheduler,
            laps: LapTable::default(),
        }
    }

    fn with_laps(mut self, laps: LapTable) -> Self {
        self.laps = laps;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn race_id(&self) -> &str {
        &self.race_id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn timeline(&self) -> &TimelineIndex {
        &self.timeline
    }

    pub fn loader(&self) -> &ChunkLoader {
        &self.loader
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn laps(&self) -> &LapTable {
        &self.laps
    }

    /// Whether there is anything to play
    pub fn can_play(&self) -> bool {
        !self.timeline.is_empty()
    }

    /// Timeline entry at a position
    pub fn entry_at(&self, position: usize) -> Result<&TimelineEntry, ReplayError> {
        self.timeline.entry(position)
    }

    /// Resolve a position directly, outside of playback
    pub async fn record_at(&self, position: usize) -> Option<TelemetryRecord> {
        self.resolver.resolve(position).await
    }

    /// Timing of a lap
    pub fn lap_timing(&self, lap: u32) -> Result<&LapTiming, ReplayError> {
        self.laps
            .lap(lap)
            .ok_or_else(|| ReplayError::NotFound(format!("lap {lap}")))
    }

    /// Stop playback and drop every cached chunk
    pub fn shutdown(&self) {
        self.scheduler.pause();
        self.loader.invalidate();
        tracing::info!(session = %self.id, "replay session closed");
    }
}

/// Entry point for browsing races and replaying one car at a time
pub struct ReplayViewer {
    source: Arc<dyn TelemetrySource>,
    config: ReplayConfig,
    session: Option<ReplaySession>,
}

impl ReplayViewer {
    /// Create a viewer over any telemetry source
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        config: ReplayConfig,
    ) -> Result<Self, ReplayError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            session: None,
        })
    }

    /// Create a viewer talking to the HTTP API named in the config
    pub fn connect(config: ReplayConfig) -> Result<Self, ReplayError> {
        let source = HttpSource::new(&config.api)?;
        Self::new(Arc::new(source), config)
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub async fn races(&self) -> Result<Vec<RaceSummary>, ReplayError> {
        Ok(self.source.races().await?)
    }

    pub async fn cars(&self, race_id: &str) -> Result<Vec<CarSummary>, ReplayError> {
        Ok(self.source.cars(race_id).await?)
    }

    /// Switch to another car
    ///
    /// The previous session is shut down before any request for the new
    /// car goes out. On error no session is selected.
    pub async fn select_car(
        &mut self,
        race_id: &str,
        vehicle_id: &str,
    ) -> Result<&ReplaySession, ReplayError> {
        self.close();
        let session =
            ReplaySession::open(self.source.clone(), &self.config, race_id, vehicle_id).await?;
        Ok(&*self.session.insert(session))
    }

    /// The current session
    pub fn session(&self) -> Result<&ReplaySession, ReplayError> {
        self.session.as_ref().ok_or(ReplayError::NoSession)
    }

    /// Tear down the current session, if any
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
        }
    }
}

impl Drop for ReplayViewer {
    fn drop(&mut self) {
        self.close();
    }
}
