//! tarbridge CLI: `unpack` archives to JSON lines, `pack` JSON lines into archives.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tarbridge::engine::{Cli, handle_run};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
