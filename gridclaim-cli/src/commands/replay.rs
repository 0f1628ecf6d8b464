//! Replay command - run a recorded walk through a full session.
//!
//! A track is a JSON file of timestamped steps:
//!
//! ```json
//! {
//!   "steps": [
//!     { "at_ms": 0,    "type": "position", "lat": 51.5007, "lon": -0.1246 },
//!     { "at_ms": 500,  "type": "start" },
//!     { "at_ms": 1500, "type": "position", "lat": 51.5008, "lon": -0.1246 },
//!     { "at_ms": 1800, "type": "lost", "reason": "unavailable" },
//!     { "at_ms": 2500, "type": "view", "zoom": 20, "width": 400, "height": 400 },
//!     { "at_ms": 3000, "type": "finish" }
//!   ]
//! }
//! ```
//!
//! Steps run in file order, spaced by their `at_ms` offsets divided by the
//! replay speed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;
use gridclaim::coord::Coordinate;
use gridclaim::grid::{MapEvent, ViewportState};
use gridclaim::map::RecordingSurface;
use gridclaim::position::{ChannelPositionSource, LocationError, PositionFeed};
use gridclaim::session::{SessionHandle, SessionService, SessionSnapshot};
use serde::Deserialize;
use tracing::debug;

use super::common::{write_geojson, ProviderType};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Time allowed for outstanding resolutions after the last step.
const DRAIN_DELAY: Duration = Duration::from_millis(500);

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub track: PathBuf,
    pub speed: f64,
    pub provider: Option<ProviderType>,
    pub geojson: Option<PathBuf>,
    pub debug: bool,
}

/// Why the position was lost.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LostReason {
    Denied,
    Unavailable,
    Timeout,
}

impl From<LostReason> for LocationError {
    fn from(reason: LostReason) -> Self {
        match reason {
            LostReason::Denied => LocationError::PermissionDenied,
            LostReason::Unavailable => LocationError::PositionUnavailable,
            LostReason::Timeout => LocationError::Timeout,
        }
    }
}

/// One recorded input.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackEvent {
    Position { lat: f64, lon: f64 },
    Lost { reason: LostReason },
    View { zoom: f64, width: u32, height: u32 },
    Start,
    Finish,
}

/// A track step with its time offset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackStep {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: TrackEvent,
}

/// A recorded walk.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Track {
    pub steps: Vec<TrackStep>,
}

impl Track {
    /// Parse and validate a track.
    pub fn parse(text: &str) -> Result<Self, CliError> {
        let track: Track =
            serde_json::from_str(text).map_err(|e| CliError::Track(e.to_string()))?;
        let mut last = 0;
        for (i, step) in track.steps.iter().enumerate() {
            if step.at_ms < last {
                return Err(CliError::Track(format!(
                    "step {} goes back in time ({} ms after {} ms)",
                    i, step.at_ms, last
                )));
            }
            last = step.at_ms;
            if let TrackEvent::Position { lat, lon } = step.event {
                Coordinate::new(lat, lon)
                    .map_err(|e| CliError::Track(format!("step {}: {}", i, e)))?;
            }
        }
        Ok(track)
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CliError::Track(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text)
    }
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(CliError::Argument(format!("speed must be positive, got {}", args.speed)));
    }
    let track = Track::load(&args.track)?;

    let runner = CliRunner::new(args.debug)?;
    runner.log_startup("replay");
    let resolver = runner.resolver(args.provider.map(Into::into))?;
    let config = runner.config().to_session_config();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Session(format!("Failed to start runtime: {}", e)))?;

    let surface = RecordingSurface::new();
    let source = ChannelPositionSource::default();
    let feed = source.feed();
    let final_snapshot = rt.block_on(async {
        let handle = SessionService::start(config, resolver, &source, Box::new(surface.clone()))?;
        let result = play(&track, args.speed, &feed, &handle).await;
        let snapshot = handle.snapshot();
        handle.shutdown().await;
        result.map(|_| snapshot)
    })?;

    print_summary(&final_snapshot);
    if let Some(path) = args.geojson {
        write_geojson(&surface, &path)?;
    }
    Ok(())
}

async fn play(
    track: &Track,
    speed: f64,
    feed: &PositionFeed,
    handle: &SessionHandle,
) -> Result<(), CliError> {
    let start = tokio::time::Instant::now();
    let mut last = handle.snapshot();
    let mut position: Option<Coordinate> = None;

    for step in &track.steps {
        let due = start + Duration::from_secs_f64(step.at_ms as f64 / 1000.0 / speed);
        tokio::time::sleep_until(due).await;
        debug!(at_ms = step.at_ms, event = ?step.event, "Replaying step");

        match step.event {
            TrackEvent::Position { lat, lon } => {
                let coordinate = Coordinate::new(lat, lon)?;
                position = Some(coordinate);
                feed.send(Ok(coordinate)).await;
            }
            TrackEvent::Lost { reason } => {
                feed.send(Err(reason.into())).await;
            }
            TrackEvent::View { zoom, width, height } => {
                let center = position
                    .ok_or_else(|| CliError::Track("view step before any position".to_string()))?;
                let viewport = ViewportState::new(center, zoom, width, height)?;
                handle.map_event(MapEvent::MoveStart).await?;
                handle.map_event(MapEvent::Settled(viewport)).await?;
            }
            TrackEvent::Start => {
                handle.start_tracking().await?;
            }
            TrackEvent::Finish => {
                handle.finish_tracking().await?;
            }
        }

        tokio::task::yield_now().await;
        let now = handle.snapshot();
        report_transition(step.at_ms, &last, &now);
        last = now;
    }

    // Let outstanding resolutions and the last redraw land.
    tokio::time::sleep(DRAIN_DELAY).await;
    let now = handle.snapshot();
    report_transition(track.steps.last().map_or(0, |s| s.at_ms), &last, &now);
    Ok(())
}

/// Print what changed between two snapshots.
fn report_transition(at_ms: u64, before: &SessionSnapshot, after: &SessionSnapshot) {
    let stamp = style(format!("[{:>7} ms]", at_ms)).dim();
    if before.location_status != after.location_status {
        println!("{} location {}", stamp, after.location_status);
    }
    if before.mode != after.mode {
        println!("{} mode {}", stamp, style(after.mode).cyan().bold());
    }
    if before.current_cell != after.current_cell {
        if let Some(cell) = &after.current_cell {
            println!("{} in cell {}", stamp, style(cell).green());
        }
    }
    if before.selection != after.selection && !after.selection.is_empty() {
        println!("{} selection: {}", stamp, join(&after.selection));
    }
}

fn print_summary(snapshot: &SessionSnapshot) {
    println!();
    println!("Final state");
    println!("  Mode:      {}", snapshot.mode);
    println!("  Location:  {}", snapshot.location_status);
    println!(
        "  Current:   {}",
        snapshot
            .current_cell
            .as_ref()
            .map_or_else(|| "(none)".to_string(), |c| c.to_string())
    );
    if snapshot.stale_discarded > 0 {
        println!("  Stale resolutions discarded: {}", snapshot.stale_discarded);
    }
    match &snapshot.last_claim {
        Some(claim) => {
            let secs = claim.finished_at().duration_since(claim.started_at()).as_secs_f64();
            println!(
                "  Claimed:   {} cell(s) in {:.1}s",
                style(claim.len()).bold(),
                secs
            );
            for cell in claim.cells() {
                println!("    {}", cell);
            }
        }
        None => println!("  Claimed:   (no claim finished)"),
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
