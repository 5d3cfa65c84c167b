use std::path::Path;

use anyhow::Result;
use clap::Parser;

mod args;
use args::Args;

mod core;

/// Longest prefix worth trying before concluding the input has duplicate
/// lines.
const MAX_PREFIX_LEN: usize = 4096;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let prefix_len = core::solve(
        &args.input,
        Path::new("output"),
        args.mappers,
        args.reducers,
        MAX_PREFIX_LEN,
    )?;
    println!("Minimal prefix len = {prefix_len}");

    Ok(())
}
