use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tracing::info;

use engine::MapReduce;
use workload::prefix;

/// Find the minimal prefix length that identifies every input line
/// uniquely, re-running the engine with a growing prefix until no reducer
/// reports a repeat.
///
/// `max_len` bounds the search: an input containing duplicate lines has no
/// identifying prefix at any length, and the bound turns that into an
/// error instead of an endless loop.
pub fn solve(
    input: &Path,
    output: &Path,
    mappers: usize,
    reducers: usize,
    max_len: usize,
) -> Result<usize> {
    for prefix_len in 1..=max_len {
        let engine = MapReduce::new(mappers, reducers, prefix::workload())?
            .with_aux(Bytes::from(prefix_len.to_string()));
        engine.run(input, output)?;

        if unique(output)? {
            return Ok(prefix_len);
        }
        info!(prefix_len, "repeats found, growing the prefix");
    }
    Err(anyhow!(
        "no prefix of length up to {max_len} is unique; the input likely contains duplicate lines"
    ))
}

/// Every reducer summarized `"1"`: no repeats anywhere.
fn unique(output: &Path) -> Result<bool> {
    let contents = fs::read_to_string(output)
        .with_context(|| format!("failed to read run output `{}`", output.display()))?;
    Ok(contents.lines().all(|line| line == "1"))
}
