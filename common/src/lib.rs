//! Users specify a map and a reduce function, and the engine applies them
//! to partitions of a line-oriented input file across worker threads. Each
//! thread stands in for a node in a real cluster, and intermediate data is
//! kept on the local filesystem standing in for network transfer.

use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;

use anyhow::anyhow;
use bytes::Bytes;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// A map function takes one input line and the run's auxiliary argument.
///
/// It returns the key-value pair the line maps to. The auxiliary argument
/// carries opaque per-run parameters set by the application driver; the
/// engine never inspects it.
pub type MapFn = fn(line: &str, aux: &Bytes) -> anyhow::Result<KeyValue>;

/// A reduce function takes the key of the previously seen record within the
/// partition (empty for the first record), the current record, and the
/// auxiliary argument.
///
/// It returns `false` to flag the record; what a flag means is up to the
/// application.
pub type ReduceFn =
    fn(previous_key: &str, record: &KeyValue, aux: &Bytes) -> anyhow::Result<bool>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
///
/// The derived ordering is lexicographic on `(key, value)`; every
/// intermediate file in the pipeline is sorted by it, which keeps equal
/// keys colocated and comparably ordered across shards.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: String,

    /// The value.
    pub value: String,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.key, self.value)
    }
}

impl FromStr for KeyValue {
    type Err = anyhow::Error;

    /// Parse one record line. The key must not contain a space; everything
    /// after the first space is the value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once(' ')
            .ok_or_else(|| anyhow!("malformed record `{s}`: missing separator"))?;
        Ok(Self::new(key, value))
    }
}
