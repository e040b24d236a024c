//! Playback Scheduler
//!
//! Owns the playback position. Position changes are applied synchronously;
//! resolving them to telemetry is asynchronous, so every resolve is tagged
//! with a request number and only the newest one may reach subscribers.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{PlaybackEvent, PlaybackState, PlaybackStatus, ResolvedFrame};
use crate::lock;
use crate::resolver::PositionResolver;
use crate::telemetry::{TelemetryDisplay, TelemetryRecord};
use crate::timeline::TimelineIndex;

struct SchedulerState {
    position: usize,
    status: PlaybackStatus,
    /// Incremented on every `play()`; a timer only acts for its own run
    run_id: u64,
    ticker: Option<JoinHandle<()>>,
    /// Number of the most recent resolve request
    latest_request: u64,
    display: TelemetryDisplay,
    subscribers: Vec<UnboundedSender<PlaybackEvent>>,
}

impl SchedulerState {
    fn emit(&mut self, event: PlaybackEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status != status {
            self.status = status;
            self.emit(PlaybackEvent::StatusChanged(status));
        }
    }
}

struct Shared {
    timeline: Arc<TimelineIndex>,
    resolver: PositionResolver,
    tick_interval: Duration,
    state: Mutex<SchedulerState>,
}

/// Timer-driven playback over a timeline
pub struct PlaybackScheduler {
    shared: Arc<Shared>,
}

impl PlaybackScheduler {
    pub fn new(resolver: PositionResolver, tick_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                timeline: resolver.loader().timeline().clone(),
                resolver,
                tick_interval,
                state: Mutex::new(SchedulerState {
                    position: 0,
                    status: PlaybackStatus::Stopped,
                    run_id: 0,
                    ticker: None,
                    latest_request: 0,
                    display: TelemetryDisplay::new(),
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    /// Receive every event from now on
    pub fn subscribe(&self) -> UnboundedReceiver<PlaybackEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.shared.state).subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> PlaybackState {
        let state = lock(&self.shared.state);
        self.shared.snapshot(&state)
    }

    pub fn position(&self) -> usize {
        lock(&self.shared.state).position
    }

    pub fn status(&self) -> PlaybackStatus {
        lock(&self.shared.state).status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Current display values
    pub fn display(&self) -> TelemetryDisplay {
        lock(&self.shared.state).display.clone()
    }

    pub fn timeline(&self) -> &Arc<TimelineIndex> {
        &self.shared.timeline
    }

    pub fn tick_interval(&self) -> Duration {
        self.shared.tick_interval
    }

    /// Start playback from the current position
    ///
    /// Does nothing when the timeline is empty or playback is already
    /// running. Returns whether playback was started.
    pub fn play(&self) -> bool {
        let mut state = lock(&self.shared.state);
        if self.shared.timeline.is_empty() || state.status == PlaybackStatus::Playing {
            return false;
        }

        state.run_id += 1;
        let run_id = state.run_id;
        state.set_status(PlaybackStatus::Playing);

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let period = self.shared.tick_interval;
        state.ticker = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.tick(run_id) {
                    break;
                }
            }
        }));
        tracing::debug!("playback started at position {}", state.position);
        true
    }

    /// Stop the timer; in-flight chunk fetches keep running
    pub fn pause(&self) {
        let mut state = lock(&self.shared.state);
        if let Some(handle) = state.ticker.take() {
            handle.abort();
        }
        if state.status == PlaybackStatus::Playing {
            tracing::debug!("playback paused at position {}", state.position);
        }
        state.set_status(PlaybackStatus::Stopped);
    }

    /// Jump to a position, clamped to the timeline
    pub fn seek_absolute(&self, position: usize) {
        let mut state = lock(&self.shared.state);
        self.shared.seek_locked(&mut state, position);
    }

    /// Jump by a wall-clock offset from the current timestamp
    ///
    /// Lands on the timeline entry closest to the target time. Returns the
    /// new position.
    pub fn seek_relative_time(&self, delta_seconds: f64) -> Option<usize> {
        if !delta_seconds.is_finite() {
            return None;
        }
        let mut state = lock(&self.shared.state);
        let current = self.shared.timeline.get(state.position)?;
        // Saturates at either end; the closest entry is then the first or last
        let offset = (delta_seconds * 1000.0).round() as i64;
        let target = current.timestamp.millis().saturating_add(offset);
        let position = self.shared.timeline.closest_position(target)?;
        self.shared.seek_locked(&mut state, position);
        Some(position)
    }

    /// Jump to the first position of a lap
    ///
    /// Unknown laps leave the position untouched.
    pub fn seek_to_lap(&self, lap: u32) -> Option<usize> {
        let Some(position) = self.shared.timeline.first_position_of_lap(lap) else {
            tracing::warn!("lap {lap} not found in timeline");
            return None;
        };
        let mut state = lock(&self.shared.state);
        self.shared.seek_locked(&mut state, position);
        Some(position)
    }

    /// Move one position forward
    pub fn step_forward(&self) {
        let mut state = lock(&self.shared.state);
        let next = state.position.saturating_add(1);
        self.shared.seek_locked(&mut state, next);
    }

    /// Move one position back
    pub fn step_back(&self) {
        let mut state = lock(&self.shared.state);
        let previous = state.position.saturating_sub(1);
        self.shared.seek_locked(&mut state, previous);
    }

    /// Resolve the current position again, e.g. after subscribing
    pub fn refresh(&self) {
        let mut state = lock(&self.shared.state);
        let position = state.position;
        self.shared.seek_locked(&mut state, position);
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.shared.state).ticker.take() {
            handle.abort();
        }
    }
}

impl Shared {
    fn snapshot(&self, state: &SchedulerState) -> PlaybackState {
        PlaybackState {
            current_position: state.position,
            is_playing: state.status == PlaybackStatus::Playing,
            current_lap: self.timeline.get(state.position).map(|e| e.lap),
        }
    }

    /// One timer tick; returns whether the timer should keep running
    fn tick(self: &Arc<Self>, run_id: u64) -> bool {
        let mut state = lock(&self.state);
        if state.status != PlaybackStatus::Playing || state.run_id != run_id {
            return false;
        }

        let Some(last) = self.timeline.last_index() else {
            self.finish(&mut state);
            return false;
        };
        if state.position >= last {
            self.finish(&mut state);
            return false;
        }

        state.position += 1;
        self.position_changed(&mut state);

        if state.position >= last {
            self.finish(&mut state);
            return false;
        }
        true
    }

    /// End of the race reached while playing
    fn finish(&self, state: &mut SchedulerState) {
        // Called from the timer task itself, so the handle is dropped, not aborted
        state.ticker = None;
        state.set_status(PlaybackStatus::Stopped);
        tracing::debug!("playback reached the end at position {}", state.position);
    }

    fn seek_locked(self: &Arc<Self>, state: &mut SchedulerState, position: usize) {
        let Some(target) = self.timeline.clamp(position) else {
            tracing::debug!("seek to {position} ignored: timeline is empty");
            return;
        };
        if target != position {
            tracing::debug!("seek to {position} clamped to {target}");
        }
        state.position = target;
        self.position_changed(state);
    }

    /// Announce the new position and start resolving it
    fn position_changed(self: &Arc<Self>, state: &mut SchedulerState) {
        state.latest_request += 1;
        let request = state.latest_request;
        let position = state.position;

        let snapshot = self.snapshot(state);
        state.emit(PlaybackEvent::PositionChanged(snapshot));

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let record = shared.resolver.resolve(position).await;
            shared.deliver(request, position, record);
        });
    }

    fn deliver(&self, request: u64, position: usize, record: Option<TelemetryRecord>) {
        let mut state = lock(&self.state);
        if request != state.latest_request {
            tracing::trace!(
                "dropping stale resolution of position {position} (request {request}, latest {})",
                state.latest_request
            );
            return;
        }
        let Some(entry) = self.timeline.get(position) else {
            return;
        };

        if let Some(ref record) = record {
            state.display.apply(record);
        }
        let frame = ResolvedFrame {
            position,
            timestamp: entry.timestamp.clone(),
            record,
            display: state.display.clone(),
        };
        state.emit(PlaybackEvent::Frame(frame));
    }
}
