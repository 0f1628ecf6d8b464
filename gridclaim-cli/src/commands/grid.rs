//! Grid command - render the cell grid for a viewport.

use std::path::PathBuf;

use gridclaim::coord::Coordinate;
use gridclaim::grid::{GridRenderer, ViewportState};
use gridclaim::map::RecordingSurface;

use super::common::write_geojson;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the grid command.
pub struct GridArgs {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
    pub width: u32,
    pub height: u32,
    pub geojson: Option<PathBuf>,
    pub debug: bool,
}

/// Run the grid command.
pub fn run(args: GridArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.debug)?;
    runner.log_startup("grid");

    let center = Coordinate::new(args.lat, args.lon)?;
    let viewport = ViewportState::new(center, args.zoom, args.width, args.height)?;
    let config = runner.config().to_session_config().renderer;
    let max_cells = config.max_cells;

    let mut renderer = GridRenderer::new(runner.grid()?, config);
    let mut surface = RecordingSurface::new();
    let stats = renderer.render(&viewport, &mut surface);

    let bounds = viewport.bounds();
    println!("Viewport: {} @ z{} ({}x{} px)", center, args.zoom, args.width, args.height);
    println!(
        "  Bounds:  S {:.6} W {:.6} N {:.6} E {:.6}",
        bounds.south, bounds.west, bounds.north, bounds.east
    );
    if stats.suppressed {
        println!(
            "  {}",
            console::style(format!(
                "Grid hidden: more than {} cells visible, zoom in",
                max_cells
            ))
            .yellow()
        );
    } else {
        println!("  Cells:   {}", stats.visible);
    }

    if let Some(path) = args.geojson {
        write_geojson(&surface, &path)?;
    }
    Ok(())
}
