//! RAS CI Command-Line Interface
//!
//! Main entry point for running RAS CI calculations with YAML configuration.

use color_eyre::eyre::Result;
use rasci::app::RasciApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    RasciApplication::from_cli()?.run()
}
