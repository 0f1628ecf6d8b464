//! Cell command - resolve a coordinate to its cell.

use gridclaim::coord::Coordinate;

use super::common::ProviderType;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the cell command.
pub struct CellArgs {
    pub lat: f64,
    pub lon: f64,
    pub provider: Option<ProviderType>,
    pub debug: bool,
}

/// Run the cell command.
pub fn run(args: CellArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.debug)?;
    runner.log_startup("cell");

    let coordinate = Coordinate::new(args.lat, args.lon)?;
    let grid = runner.grid()?;
    let resolver = runner.resolver(args.provider.map(Into::into))?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Session(format!("Failed to start runtime: {}", e)))?;

    let (cell_id, centroid) = rt.block_on(async {
        let cell_id = resolver.resolve_to_cell(coordinate).await?;
        let centroid = resolver.resolve_to_coordinate(&cell_id).await?;
        Ok::<_, CliError>((cell_id, centroid))
    })?;

    let cell = grid.cell_of(&centroid);
    let boundary = grid.boundary(&cell);

    println!("{}", console::style(&cell_id).bold());
    println!();
    println!("  Resolver:   {}", resolver.name());
    println!("  Position:   {}", coordinate);
    println!("  Centre:     {}", centroid);
    println!("  Grid cell:  {} ({} m)", cell, grid.cell_size_m());
    println!("  Boundary:");
    for vertex in boundary.vertices() {
        println!("    {}", vertex);
    }
    Ok(())
}
