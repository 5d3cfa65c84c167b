//! Line-aligned block planning over the raw input file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use tracing::debug;

/// A contiguous byte range of the input file, assigned to one map worker.
///
/// Half-open: the block covers bytes `[from, to)`. Blocks are contiguous
/// (`block[i].to == block[i + 1].from`) and every boundary sits immediately
/// after a newline, so no line is ever shared by two blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    pub from: u64,
    pub to: u64,
    pub ordinal: usize,
}

impl Block {
    pub fn len(&self) -> u64 {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Split the input file into `count` contiguous, line-aligned blocks
/// covering it exactly once.
///
/// Deterministic given the file size and newline positions, and reads only
/// bytes near the tentative boundaries. The byte-size remainder widens the
/// first span; each interior boundary then snaps backward to the nearest
/// line start. A block can come out empty when the worker count exceeds
/// the line count or a single line swallows a whole span.
pub fn plan(path: &Path, count: usize) -> Result<Vec<Block>> {
    ensure!(count > 0, "block count must be positive");

    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to stat input file `{}`", path.display()))?
        .len();
    let mut file = File::open(path)
        .with_context(|| format!("failed to open input file `{}`", path.display()))?;

    let span = size / count as u64;
    let remainder = size % count as u64;

    let mut blocks = Vec::with_capacity(count);
    let mut from = 0u64;
    for ordinal in 0..count {
        let to = if ordinal == count - 1 {
            size
        } else {
            let tentative = span * (ordinal as u64 + 1) + remainder;
            snap_to_line_start(&mut file, tentative.max(from), from, size)?
        };
        blocks.push(Block { from, to, ordinal });
        from = to;
    }

    debug!(blocks = blocks.len(), file_size = size, "planned input blocks");
    Ok(blocks)
}

/// Walk backward from `tentative` (inclusive) looking for a newline, and
/// place the boundary right after it. Bottoms out at `floor` (the previous
/// boundary), yielding an empty block, when the whole span sits inside one
/// line.
fn snap_to_line_start(file: &mut File, tentative: u64, floor: u64, size: u64) -> Result<u64> {
    let mut boundary = (tentative + 1).min(size);
    let mut byte = [0u8; 1];
    while boundary > floor {
        file.seek(SeekFrom::Start(boundary - 1))?;
        file.read_exact(&mut byte)
            .context("failed reading near block boundary")?;
        if byte[0] == b'\n' {
            return Ok(boundary);
        }
        boundary -= 1;
    }
    Ok(floor)
}
