//! The parallel map phase: one worker per block, joined at a barrier.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tracing::debug;

use common::MapFn;

use crate::block::Block;
use crate::cancel::{CancelToken, Cancelled};
use crate::record::RecordWriter;

/// What one map worker hands back across the barrier.
///
/// Line counts come back by value rather than through shared state; the
/// coordinator aggregates them after the join.
#[derive(Debug)]
pub struct MapResult {
    pub shard: PathBuf,
    pub line_count: u64,
}

/// Run one map worker per block and wait for all of them.
///
/// Workers are independent: each reads only its own byte range and writes
/// its own shard file, so completion order cannot affect the result. The
/// first failure cancels the remaining workers and is reported once, after
/// the barrier.
pub fn run_pool(
    input: &Path,
    blocks: &[Block],
    map_fn: MapFn,
    aux: &Bytes,
    work_dir: &Path,
) -> Result<Vec<MapResult>> {
    let token = CancelToken::new();
    let results: Vec<Result<MapResult>> = thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .iter()
            .map(|block| {
                let token = token.clone();
                scope.spawn(move || {
                    let result = map_block(input, block, map_fn, aux, work_dir, &token);
                    if result.is_err() {
                        token.cancel();
                    }
                    result
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("map worker panicked")))
            })
            .collect()
    });
    crate::first_error(results)
}

/// Read one block, map every line, sort by `(key, value)` and write the
/// worker's shard file.
fn map_block(
    input: &Path,
    block: &Block,
    map_fn: MapFn,
    aux: &Bytes,
    work_dir: &Path,
    token: &CancelToken,
) -> Result<MapResult> {
    let mut file = File::open(input).with_context(|| {
        format!(
            "map worker {} failed to open `{}`",
            block.ordinal,
            input.display()
        )
    })?;
    file.seek(SeekFrom::Start(block.from))?;
    let reader = BufReader::new(file.take(block.len()));

    let mut records = Vec::new();
    for line in reader.lines() {
        if token.is_cancelled() {
            return Err(Cancelled.into());
        }
        let line = line.with_context(|| {
            format!("map worker {} failed reading its block", block.ordinal)
        })?;
        if line.is_empty() {
            continue;
        }
        let record = map_fn(&line, aux)
            .with_context(|| format!("map function failed on line `{line}`"))?;
        records.push(record);
    }

    // sorted on (key, value): equal keys stay colocated and comparably
    // ordered across shards during the merge
    records.sort();

    let shard = work_dir.join(format!("map-{}", block.ordinal));
    let mut writer = RecordWriter::create(&shard)?;
    for record in &records {
        writer.write_record(record)?;
    }
    writer.finish()?;

    debug!(
        worker = block.ordinal,
        records = records.len(),
        "map worker wrote shard"
    );
    Ok(MapResult {
        shard,
        line_count: records.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;
    use crate::record::RecordReader;
    use common::KeyValue;

    fn first_word_map(line: &str, _aux: &Bytes) -> Result<KeyValue> {
        let key = line.split_whitespace().next().unwrap_or_default();
        Ok(KeyValue::new(key, "1"))
    }

    fn failing_map(line: &str, _aux: &Bytes) -> Result<KeyValue> {
        if line.contains('!') {
            return Err(anyhow!("bad line"));
        }
        Ok(KeyValue::new(line, "1"))
    }

    fn read_all(path: &Path) -> Vec<KeyValue> {
        let mut reader = RecordReader::open(path).unwrap();
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn shards_are_sorted_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::write(&input, "cherry\napple\nbanana\n").unwrap();

        let blocks = block::plan(&input, 1).unwrap();
        let results =
            run_pool(&input, &blocks, first_word_map, &Bytes::new(), dir.path()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line_count, 3);
        let records = read_all(&results[0].shard);
        assert_eq!(
            records,
            vec![
                KeyValue::new("apple", "1"),
                KeyValue::new("banana", "1"),
                KeyValue::new("cherry", "1"),
            ]
        );
    }

    #[test]
    fn workers_only_see_their_block() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::write(&input, "banana\napple\ncherry\napple\n").unwrap();

        let blocks = block::plan(&input, 3).unwrap();
        let results =
            run_pool(&input, &blocks, first_word_map, &Bytes::new(), dir.path()).unwrap();

        let total: u64 = results.iter().map(|r| r.line_count).sum();
        assert_eq!(total, 4);

        // union of shard records equals the mapped input, no loss or overlap
        let mut all: Vec<KeyValue> = results.iter().flat_map(|r| read_all(&r.shard)).collect();
        all.sort();
        assert_eq!(
            all,
            vec![
                KeyValue::new("apple", "1"),
                KeyValue::new("apple", "1"),
                KeyValue::new("banana", "1"),
                KeyValue::new("cherry", "1"),
            ]
        );
    }

    #[test]
    fn map_function_failure_fails_the_pool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::write(&input, "fine\nbad!\nfine\n").unwrap();

        let blocks = block::plan(&input, 2).unwrap();
        let err = run_pool(&input, &blocks, failing_map, &Bytes::new(), dir.path());
        assert!(err.is_err());
        // the reported error is the map fault, not a cancellation
        assert!(!err.unwrap_err().is::<Cancelled>());
    }

    #[test]
    fn empty_block_writes_empty_shard() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        std::fs::write(&input, "a\n").unwrap();

        let blocks = block::plan(&input, 4).unwrap();
        let results =
            run_pool(&input, &blocks, first_word_map, &Bytes::new(), dir.path()).unwrap();
        assert_eq!(results.iter().map(|r| r.line_count).sum::<u64>(), 1);
        assert!(results.iter().filter(|r| r.line_count == 0).count() >= 3);
    }
}
