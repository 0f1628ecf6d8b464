//! GridClaim CLI - command-line interface
//!
//! Resolves cells, renders grids and replays recorded walks through a full
//! claiming session using the gridclaim library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use commands::cell::CellArgs;
use commands::common::ProviderType;
use commands::grid::GridArgs;
use commands::replay::ReplayArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "gridclaim")]
#[command(version, about = "Claim map cells by walking through them", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or update ~/.gridclaim/config.ini
    Init,

    /// Resolve a coordinate to its cell address
    Cell {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Resolver to use (overrides config)
        #[arg(long, value_enum)]
        provider: Option<ProviderType>,
    },

    /// Render the cell grid for a viewport
    Grid {
        /// Viewport centre latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Viewport centre longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Web-mercator zoom level
        #[arg(long, default_value = "19")]
        zoom: f64,

        /// Viewport width in pixels
        #[arg(long, default_value = "800")]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "600")]
        height: u32,

        /// Write the drawn layers as GeoJSON ("-" for stdout)
        #[arg(long)]
        geojson: Option<PathBuf>,
    },

    /// Replay a recorded walk through a claiming session
    Replay {
        /// Track file (JSON)
        track: PathBuf,

        /// Playback speed multiplier
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Resolver to use (overrides config)
        #[arg(long, value_enum)]
        provider: Option<ProviderType>,

        /// Write the final map layers as GeoJSON ("-" for stdout)
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let debug = cli.debug;
    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Cell { lat, lon, provider } => commands::cell::run(CellArgs {
            lat,
            lon,
            provider,
            debug,
        }),
        Commands::Grid {
            lat,
            lon,
            zoom,
            width,
            height,
            geojson,
        } => commands::grid::run(GridArgs {
            lat,
            lon,
            zoom,
            width,
            height,
            geojson,
            debug,
        }),
        Commands::Replay {
            track,
            speed,
            provider,
            geojson,
        } => commands::replay::run(ReplayArgs {
            track,
            speed,
            provider,
            geojson,
            debug,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_longitude() {
        let cli = Cli::try_parse_from(["gridclaim", "cell", "--lat", "51.5", "--lon", "-0.12"])
            .unwrap();
        match cli.command {
            Commands::Cell { lon, .. } => assert_eq!(lon, -0.12),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_grid_defaults() {
        let cli = Cli::try_parse_from(["gridclaim", "--debug", "grid", "--lat", "1", "--lon", "2"])
            .unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Grid {
                zoom, width, height, ..
            } => {
                assert_eq!(zoom, 19.0);
                assert_eq!((width, height), (800, 600));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
