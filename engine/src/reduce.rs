//! The parallel reduce phase: one worker per partition file, joined at a
//! barrier, each producing a one-line summary.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tracing::debug;

use common::ReduceFn;

use crate::cancel::{CancelToken, Cancelled};
use crate::record::RecordReader;

/// Run one reduce worker per partition and wait for all of them, returning
/// the summary file paths in partition order.
pub fn run_pool(partitions: &[PathBuf], reduce_fn: ReduceFn, aux: &Bytes) -> Result<Vec<PathBuf>> {
    let token = CancelToken::new();
    let results: Vec<Result<PathBuf>> = thread::scope(|scope| {
        let handles: Vec<_> = partitions
            .iter()
            .enumerate()
            .map(|(ordinal, partition)| {
                let token = token.clone();
                scope.spawn(move || {
                    let result = reduce_partition(partition, ordinal, reduce_fn, aux, &token);
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
                    .unwrap_or_else(|_| Err(anyhow!("reduce worker panicked")))
            })
            .collect()
    });
    crate::first_error(results)
}

/// Stream one partition through the reduce function in sorted order,
/// threading the previous record's key, and write `"1"` if every
/// invocation returned true, `"0"` otherwise.
///
/// The first record sees an empty previous key; an empty partition means
/// no failures were observed and summarizes as `"1"`.
fn reduce_partition(
    partition: &Path,
    ordinal: usize,
    reduce_fn: ReduceFn,
    aux: &Bytes,
    token: &CancelToken,
) -> Result<PathBuf> {
    let mut reader = RecordReader::open(partition)?;
    let mut previous_key = String::new();
    let mut all_passed = true;

    while let Some(record) = reader.next_record()? {
        if token.is_cancelled() {
            return Err(Cancelled.into());
        }
        let passed = reduce_fn(&previous_key, &record, aux)
            .with_context(|| format!("reduce function failed in worker {ordinal}"))?;
        all_passed &= passed;
        previous_key = record.key;
    }

    let summary = partition.with_extension("out");
    std::fs::write(&summary, if all_passed { "1" } else { "0" })
        .with_context(|| format!("failed to write summary `{}`", summary.display()))?;

    debug!(worker = ordinal, passed = all_passed, "reduce worker finished");
    Ok(summary)
}
