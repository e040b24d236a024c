//! Playback scheduling end to end: timer, seeks and frame delivery

mod common;

use common::{race_records, ScriptedSource};
use pretty_assertions::assert_eq;
use racereplay_core::api::StaticSource;
use racereplay_core::chunk::ChunkLoader;
use racereplay_core::playback::{PlaybackEvent, PlaybackScheduler, PlaybackStatus, ResolvedFrame};
use racereplay_core::resolver::PositionResolver;
use racereplay_core::telemetry::TelemetryRecord;
use racereplay_core::timeline::TimelineIndex;
use racereplay_core::timestamp::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const TICK: Duration = Duration::from_millis(100);

async fn scheduler_over(source: Arc<ScriptedSource>, chunk_size: usize) -> PlaybackScheduler {
    let timeline = TimelineIndex::load(source.as_ref(), "R1", "car-7")
        .await
        .unwrap();
    let loader = ChunkLoader::new(source, "R1", "car-7", Arc::new(timeline), chunk_size, 0);
    PlaybackScheduler::new(PositionResolver::new(loader, Duration::from_secs(1)), TICK)
}

fn scripted(records: Vec<TelemetryRecord>) -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::new(StaticSource::new().with_car("R1", "car-7", records)))
}

async fn next_frame(events: &mut UnboundedReceiver<PlaybackEvent>) -> ResolvedFrame {
    loop {
        match events.recv().await {
            Some(PlaybackEvent::Frame(frame)) => return frame,
            Some(_) => continue,
            None => panic!("scheduler dropped"),
        }
    }
}

fn drain(events: &mut UnboundedReceiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn frame_positions(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Frame(frame) => Some(frame.position),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_seek_never_reaches_observers() {
    let source = scripted(race_records(100, 100, 25));
    source.delay_chunk(0, Duration::from_millis(500));
    let scheduler = scheduler_over(source.clone(), 10).await;
    let mut events = scheduler.subscribe();

    scheduler.seek_absolute(5);
    scheduler.seek_absolute(50);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let events = drain(&mut events);
    assert_eq!(frame_positions(&events), vec![50]);

    let positions: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::PositionChanged(state) => Some(state.current_position),
            _ => None,
        })
        .collect();
    assert_eq!(positions, vec![5, 50]);

    // The slow chunk was still fetched, just never shown
    assert_eq!(source.calls_starting_at(0), 1);
    assert_eq!(scheduler.display().speed, Some(150.0));
}

#[tokio::test(start_paused = true)]
async fn display_keeps_last_value_through_dropouts() {
    let mut records = race_records(10, 100, 10);
    records[3].speed = None;
    records[3].gear = Some(4.0);
    let scheduler = scheduler_over(scripted(records), 10).await;
    let mut events = scheduler.subscribe();

    scheduler.seek_absolute(2);
    let frame = next_frame(&mut events).await;
    assert_eq!(frame.display.speed, Some(102.0));

    scheduler.step_forward();
    let frame = next_frame(&mut events).await;
    assert_eq!(frame.position, 3);
    assert_eq!(frame.record.unwrap().speed, None);
    assert_eq!(frame.display.speed, Some(102.0));
    assert_eq!(frame.display.gear, Some(4.0));
}

#[tokio::test(start_paused = true)]
async fn ticks_advance_until_the_last_position() {
    let scheduler = scheduler_over(scripted(race_records(20, 100, 10)), 5).await;
    let mut events = scheduler.subscribe();

    scheduler.seek_absolute(3);
    assert!(scheduler.play());
    tokio::time::sleep(TICK * 4 + TICK / 2).await;
    assert_eq!(scheduler.position(), 7);

    tokio::time::sleep(TICK * 30).await;
    assert_eq!(scheduler.position(), 19);
    assert_eq!(scheduler.status(), PlaybackStatus::Stopped);

    let events = drain(&mut events);
    let statuses: Vec<PlaybackStatus> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::StatusChanged(status) => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![PlaybackStatus::Playing, PlaybackStatus::Stopped]);
    assert_eq!(frame_positions(&events).last(), Some(&19));
}

#[tokio::test(start_paused = true)]
async fn failed_chunk_does_not_stop_playback() {
    let source = scripted(race_records(30, 100, 10));
    source.fail_chunk(1000);
    let scheduler = scheduler_over(source, 10).await;
    let mut events = scheduler.subscribe();

    scheduler.seek_absolute(8);
    let frame = next_frame(&mut events).await;
    assert_eq!(frame.display.speed, Some(108.0));

    scheduler.play();
    tokio::time::sleep(TICK * 4 + TICK / 2).await;
    assert_eq!(scheduler.position(), 12);
    assert!(scheduler.is_playing());

    let frames: Vec<ResolvedFrame> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            PlaybackEvent::Frame(frame) => Some(frame),
            _ => None,
        })
        .collect();
    let positions: Vec<usize> = frames.iter().map(|f| f.position).collect();
    assert_eq!(positions, vec![9, 10, 11, 12]);

    assert!(frames[0].record.is_some());
    for frame in &frames[1..] {
        assert!(frame.record.is_none());
        assert_eq!(frame.display.speed, Some(109.0));
    }
}

#[tokio::test(start_paused = true)]
async fn lap_seek_lands_on_first_sample_of_the_lap() {
    let records = vec![
        TelemetryRecord::new(Timestamp::from_millis(0), 1),
        TelemetryRecord::new(Timestamp::from_millis(100), 1),
        TelemetryRecord::new(Timestamp::from_millis(5000), 2),
    ];
    let scheduler = scheduler_over(scripted(records), 2).await;

    assert_eq!(scheduler.seek_to_lap(2), Some(2));
    assert_eq!(scheduler.state().current_lap, Some(2));
    assert!(!scheduler.is_playing());
}

#[tokio::test(start_paused = true)]
async fn pause_keeps_position_and_late_frames_still_arrive() {
    let source = scripted(race_records(30, 100, 10));
    source.delay_chunk(1000, Duration::from_millis(250));
    let scheduler = scheduler_over(source, 10).await;
    let mut events = scheduler.subscribe();

    scheduler.seek_absolute(9);
    scheduler.play();
    tokio::time::sleep(TICK + TICK / 2).await;
    scheduler.pause();
    assert_eq!(scheduler.position(), 10);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(scheduler.position(), 10);
    assert_eq!(frame_positions(&drain(&mut events)), vec![9, 10]);
}
