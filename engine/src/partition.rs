//! The shuffle step: carving the merged stream into balanced, key-aligned
//! partition files for the reduce phase.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::record::{RecordReader, RecordWriter};

/// Split the merged stream into `count` partition files.
///
/// Balancing targets are `total_lines / count` records per partition, with
/// the remainder absorbed by the first. A partition closes only at a key
/// boundary: when its target falls inside a key-group the partition is
/// extended until the group ends, so every key lives in exactly one file
/// and the imbalance stays bounded by one key-group. Keeping a key-group
/// whole always wins over exact balance. The last partition absorbs
/// whatever remains, and partitions past the end of the data are created
/// empty so each reducer still has an input.
pub fn split(
    merged: &Path,
    total_lines: u64,
    count: usize,
    work_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let span = total_lines / count as u64;
    let remainder = total_lines % count as u64;
    let target = |index: usize| if index == 0 { span + remainder } else { span };

    let paths: Vec<PathBuf> = (0..count)
        .map(|index| work_dir.join(format!("part-{index}")))
        .collect();

    let mut reader = RecordReader::open(merged)?;
    let mut writer = RecordWriter::create(&paths[0])?;
    let mut index = 0usize;
    let mut written = 0u64;
    let mut last_key: Option<String> = None;

    while let Some(record) = reader.next_record()? {
        let key_changed = last_key.as_deref() != Some(record.key.as_str());
        if index + 1 < count && written >= target(index) && key_changed {
            writer.finish()?;
            index += 1;
            writer = RecordWriter::create(&paths[index])?;
            written = 0;
        }
        writer.write_record(&record)?;
        written += 1;
        last_key = Some(record.key);
    }
    writer.finish()?;

    for path in &paths[index + 1..] {
        RecordWriter::create(path)?.finish()?;
    }

    debug!(partitions = count, total_lines, "partitioned merged stream");
    Ok(paths)
}
