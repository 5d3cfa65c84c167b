//! A single-machine simulation of a distributed batch-computation engine
//! following the map/shuffle/reduce model.
//!
//! Each worker thread stands in for a node in a real cluster and file
//! boundaries stand in for network transfer: no partition is ever loaded
//! into memory as a whole, and no worker inspects another worker's input.
//! The phases run in strict sequence: parallel map up to a join barrier,
//! then a single-threaded k-way merge of the sorted shards, a
//! single-threaded key-aware partitioning of the merged stream, a parallel
//! reduce up to a second barrier, and finally the ordered collection of
//! the reducer summaries.

pub mod block;
pub mod cancel;
pub mod map;
pub mod merge;
pub mod partition;
pub mod record;
pub mod reduce;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tracing::info;

use common::Workload;

use crate::cancel::Cancelled;

/// The engine. Construct it with worker counts and a workload, then call
/// [`MapReduce::run`] as many times as the application needs; runs are
/// idempotent for a given input and configuration.
pub struct MapReduce {
    mappers_count: usize,
    reducers_count: usize,
    workload: Workload,
    aux: Bytes,
    work_dir: PathBuf,
}

impl MapReduce {
    /// Create an engine with one map worker per input block and one reduce
    /// worker per partition. Zero worker counts are configuration errors,
    /// reported before anything starts.
    pub fn new(mappers_count: usize, reducers_count: usize, workload: Workload) -> Result<Self> {
        if mappers_count == 0 {
            return Err(anyhow!("mapper count must be positive"));
        }
        if reducers_count == 0 {
            return Err(anyhow!("reducer count must be positive"));
        }
        // distinct default work dirs keep engines in one process from
        // clobbering each other's intermediates
        static INSTANCE: AtomicU64 = AtomicU64::new(0);
        let instance = INSTANCE.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            mappers_count,
            reducers_count,
            workload,
            aux: Bytes::new(),
            work_dir: std::env::temp_dir()
                .join(format!("mapred-{}-{instance}", std::process::id())),
        })
    }

    /// Set the opaque auxiliary argument handed to every map and reduce
    /// invocation of subsequent runs.
    pub fn with_aux(mut self, aux: Bytes) -> Self {
        self.aux = aux;
        self
    }

    /// Override where intermediate files are kept. The directory is
    /// created on each run and removed afterwards.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Execute one full map -> shuffle -> reduce pass. On success `output`
    /// holds one line per reducer, in partition order, each line being that
    /// reducer's scalar summary. On failure no output file is promised and
    /// the intermediates are discarded either way.
    pub fn run(&self, input: &Path, output: &Path) -> Result<()> {
        fs::create_dir_all(&self.work_dir).with_context(|| {
            format!("failed to create work dir `{}`", self.work_dir.display())
        })?;
        let result = self.run_pipeline(input, output);
        let _ = fs::remove_dir_all(&self.work_dir);
        result
    }

    fn run_pipeline(&self, input: &Path, output: &Path) -> Result<()> {
        info!(
            mappers = self.mappers_count,
            reducers = self.reducers_count,
            input = %input.display(),
            "starting map reduce run"
        );

        let blocks = block::plan(input, self.mappers_count)?;

        let map_results = map::run_pool(
            input,
            &blocks,
            self.workload.map_fn,
            &self.aux,
            &self.work_dir,
        )?;
        let total_lines: u64 = map_results.iter().map(|result| result.line_count).sum();
        let shards: Vec<PathBuf> = map_results.into_iter().map(|result| result.shard).collect();

        let merged = self.work_dir.join("merged");
        let merged_count = merge::merge_shards(&shards, &merged)?;
        if merged_count != total_lines {
            return Err(anyhow!(
                "merge produced {merged_count} records, mappers produced {total_lines}"
            ));
        }

        let partitions = partition::split(&merged, total_lines, self.reducers_count, &self.work_dir)?;

        let summaries = reduce::run_pool(&partitions, self.workload.reduce_fn, &self.aux)?;

        collect(&summaries, output)?;
        info!(output = %output.display(), total_lines, "run complete");
        Ok(())
    }
}

/// Concatenate the one-line reducer summaries, newline-joined, in
/// partition order. The meaning of each summary is opaque to the engine.
fn collect(summaries: &[PathBuf], output: &Path) -> Result<()> {
    let mut lines = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let line = fs::read_to_string(summary)
            .with_context(|| format!("failed to read summary `{}`", summary.display()))?;
        lines.push(line);
    }
    fs::write(output, lines.join("\n"))
        .with_context(|| format!("failed to write output `{}`", output.display()))?;
    Ok(())
}

/// Collapse per-worker results into the phase's outcome, keeping every
/// success and preferring the first real fault over workers that merely
/// observed the cancellation token.
pub(crate) fn first_error<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(results.len());
    let mut fault: Option<anyhow::Error> = None;
    let mut cancelled: Option<anyhow::Error> = None;

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) if err.is::<Cancelled>() => {
                if cancelled.is_none() {
                    cancelled = Some(err);
                }
            }
            Err(err) => {
                if fault.is_none() {
                    fault = Some(err);
                }
            }
        }
    }

    match fault.or(cancelled) {
        Some(err) => Err(err),
        None => Ok(values),
    }
}
