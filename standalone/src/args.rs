use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The line-oriented input file.
    pub input: PathBuf,

    /// Number of map worker threads (one block per mapper).
    pub mappers: usize,

    /// Number of reduce worker threads (one partition per reducer).
    pub reducers: usize,
}
