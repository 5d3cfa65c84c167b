//! A MapReduce-compatible application that checks whether fixed-length
//! line prefixes identify every line uniquely.
//!
//! The map side extracts the first `n` characters of each line, with `n`
//! riding in the auxiliary argument, and pairs the prefix with a count of
//! one. The reduce side sees the records in sorted order and flags a
//! prefix that repeats. A driver grows `n` until no reducer reports a
//! repeat, which gives the minimal uniquely identifying prefix length.

use anyhow::{Context, Result};
use bytes::Bytes;

use common::{KeyValue, Workload};

fn prefix_len(aux: &Bytes) -> Result<usize> {
    let s = std::str::from_utf8(aux).context("auxiliary argument is not UTF-8")?;
    s.trim()
        .parse()
        .with_context(|| format!("invalid prefix length `{s}`"))
}

/// Pair each line's prefix with a count of one. Lines shorter than the
/// prefix length contribute themselves whole.
pub fn map(line: &str, aux: &Bytes) -> Result<KeyValue> {
    let len = prefix_len(aux)?;
    let prefix: String = line.chars().take(len).collect();
    Ok(KeyValue::new(prefix, "1"))
}

/// A prefix repeats when it equals the previous record's key or carries a
/// count above one.
pub fn reduce(previous_key: &str, record: &KeyValue, _aux: &Bytes) -> Result<bool> {
    let count: u64 = record
        .value
        .parse()
        .with_context(|| format!("invalid repeat count `{}`", record.value))?;
    Ok(record.key != previous_key && count <= 1)
}

pub fn workload() -> Workload {
    Workload {
        map_fn: map,
        reduce_fn: reduce,
    }
}
