//! Init command - write the configuration file.

use gridclaim::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
///
/// Existing settings are kept; missing keys are filled with defaults.
pub fn run() -> Result<(), CliError> {
    let path = config_file_path();
    let existed = path.exists();

    let config = ConfigFile::load().unwrap_or_default();
    config.save()?;

    if existed {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Set [resolver] provider = what3words and api_key to use what3words addresses.");
    println!("The default local provider works offline with synthetic addresses.");
    Ok(())
}
