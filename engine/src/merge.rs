//! External k-way merge of the sorted map shards.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use common::KeyValue;

use crate::record::{RecordReader, RecordWriter};

/// One heap entry: the smallest unconsumed record of shard `source`.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Frontier {
    record: KeyValue,
    source: usize,
}

/// Merge `k` sorted shard files into one totally ordered stream, returning
/// the number of records written.
///
/// The min-heap holds at most one record per still-active shard, so memory
/// stays O(k) regardless of data size: pop the minimum, emit it, refill
/// from the same source shard, stop when the heap runs dry. An exhausted
/// shard simply contributes no further entries. This stage runs
/// single-threaded after the map barrier; it is the only one that observes
/// a global order, and with k bounded by the mapper count there is nothing
/// to parallelize.
pub fn merge_shards(shards: &[PathBuf], output: &Path) -> Result<u64> {
    let mut readers = Vec::with_capacity(shards.len());
    for shard in shards {
        readers.push(RecordReader::open(shard)?);
    }

    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (source, reader) in readers.iter_mut().enumerate() {
        if let Some(record) = reader.next_record()? {
            heap.push(Reverse(Frontier { record, source }));
        }
    }

    let mut writer = RecordWriter::create(output)?;
    let mut written = 0u64;
    while let Some(Reverse(Frontier { record, source })) = heap.pop() {
        writer.write_record(&record)?;
        written += 1;
        if let Some(next) = readers[source].next_record()? {
            heap.push(Reverse(Frontier {
                record: next,
                source,
            }));
        }
    }
    writer.finish()?;

    debug!(shards = shards.len(), records = written, "merged shards");
    Ok(written)
}
