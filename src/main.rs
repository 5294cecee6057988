use anyhow::Result;
use tracing::info;

use ember_uci::UciEngine;

fn main() -> Result<()> {
    // stdout carries the UCI protocol; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("ember starting");
    UciEngine::new().run()?;
    Ok(())
}
