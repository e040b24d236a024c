//! Replay one car against a running telemetry API and print each frame.
//!
//! ```sh
//! RUST_LOG=racereplay_core=debug cargo run --example headless_replay -- R1 GR86-002-2
//! ```

use racereplay_core::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let race_id = args.next().unwrap_or_else(|| "R1".to_string());
    let vehicle_id = args.next().unwrap_or_else(|| "GR86-002-2".to_string());

    let config = match std::env::var("RACEREPLAY_CONFIG") {
        Ok(path) => ReplayConfig::from_file(path.as_ref())?,
        Err(_) => ReplayConfig::default(),
    };

    let mut viewer = ReplayViewer::connect(config)?;
    let session = viewer.select_car(&race_id, &vehicle_id).await?;
    if !session.can_play() {
        anyhow::bail!("no telemetry for {race_id}/{vehicle_id}");
    }
    println!(
        "{race_id}/{vehicle_id}: {} points, laps {:?}",
        session.timeline().len(),
        session.timeline().laps()
    );

    let scheduler = session.scheduler();
    let mut events = scheduler.subscribe();
    scheduler.refresh();
    scheduler.play();

    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::Frame(frame) => println!(
                "#{:<6} {} lap {:?} speed {:?} gear {:?}",
                frame.position,
                frame.timestamp,
                frame.display.lap,
                frame.display.speed,
                frame.display.gear
            ),
            PlaybackEvent::StatusChanged(PlaybackStatus::Stopped) => break,
            _ => {}
        }
    }

    Ok(())
}
