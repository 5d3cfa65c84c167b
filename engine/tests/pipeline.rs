//! End-to-end runs of the engine with the prefix-uniqueness workload.

use std::fs;
use std::path::Path;

use anyhow::Result;
use bytes::Bytes;

use common::{KeyValue, Workload};
use engine::MapReduce;

fn engine_with(
    mappers: usize,
    reducers: usize,
    workload: Workload,
    aux: &str,
    work_dir: &Path,
) -> MapReduce {
    MapReduce::new(mappers, reducers, workload)
        .unwrap()
        .with_aux(Bytes::from(aux.to_string()))
        .with_work_dir(work_dir)
}

fn output_lines(output: &Path) -> Vec<String> {
    fs::read_to_string(output)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn repeated_prefix_is_flagged_under_any_split() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "banana\napple\ncherry\napple\n").unwrap();

    // 1-character prefixes: the two `a` records share a key, so exactly
    // one partition must flag a repeat, whatever the worker split
    for (mappers, reducers) in [(1, 1), (2, 2), (3, 2), (4, 4), (1, 3)] {
        let output = dir.path().join(format!("out-{mappers}-{reducers}"));
        let work = dir.path().join(format!("work-{mappers}-{reducers}"));
        engine_with(mappers, reducers, workload::prefix::workload(), "1", &work)
            .run(&input, &output)
            .unwrap();

        let lines = output_lines(&output);
        assert_eq!(lines.len(), reducers);
        assert!(
            lines.iter().any(|line| line == "0"),
            "split {mappers}x{reducers} missed the repeat"
        );
    }
}

#[test]
fn distinct_keys_pass_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let words = "alpha\nbravo\ncharlie\ndelta\necho\nfoxtrot\ngolf\nhotel\nindia\njuliet\n";
    fs::write(&input, words).unwrap();

    let output = dir.path().join("out");
    let work = dir.path().join("work");
    engine_with(1, 1, workload::prefix::workload(), "1", &work)
        .run(&input, &output)
        .unwrap();

    assert_eq!(output_lines(&output), vec!["1"]);
}

#[test]
fn more_reducers_than_lines_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "x\ny\n").unwrap();

    let output = dir.path().join("out");
    let work = dir.path().join("work");
    engine_with(2, 7, workload::prefix::workload(), "1", &work)
        .run(&input, &output)
        .unwrap();

    let lines = output_lines(&output);
    assert_eq!(lines.len(), 7);
    // empty partitions observed no failures
    assert!(lines.iter().all(|line| line == "1"));
}

#[test]
fn runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "pear\npeach\nplum\npomelo\npapaya\nfig\n").unwrap();

    let first = dir.path().join("out-1");
    let second = dir.path().join("out-2");
    for (round, output) in [(1, &first), (2, &second)] {
        let work = dir.path().join(format!("work-{round}"));
        engine_with(3, 2, workload::prefix::workload(), "2", &work)
            .run(&input, output)
            .unwrap();
    }

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn verdict_is_independent_of_worker_counts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "stone\nsteel\nslate\nbrick\n").unwrap();

    // "st" repeats at length 2; every configuration must agree
    for (mappers, reducers) in [(1, 1), (2, 3), (4, 2), (3, 4)] {
        let output = dir.path().join(format!("out-{mappers}-{reducers}"));
        let work = dir.path().join(format!("work-{mappers}-{reducers}"));
        engine_with(mappers, reducers, workload::prefix::workload(), "2", &work)
            .run(&input, &output)
            .unwrap();
        assert!(
            output_lines(&output).iter().any(|line| line == "0"),
            "split {mappers}x{reducers} disagreed"
        );
    }
}

#[test]
fn map_fault_fails_the_run_and_produces_no_output() {
    fn bad_map(line: &str, _aux: &Bytes) -> Result<KeyValue> {
        anyhow::bail!("refusing to map `{line}`")
    }
    fn pass_reduce(_prev: &str, _record: &KeyValue, _aux: &Bytes) -> Result<bool> {
        Ok(true)
    }

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "a\nb\nc\n").unwrap();

    let output = dir.path().join("out");
    let work = dir.path().join("work");
    let workload = Workload {
        map_fn: bad_map,
        reduce_fn: pass_reduce,
    };
    let result = engine_with(2, 2, workload, "1", &work).run(&input, &output);

    assert!(result.is_err());
    assert!(!output.exists());
    assert!(!work.exists(), "intermediates are discarded on failure");
}

#[test]
fn empty_input_yields_all_clear_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    fs::write(&input, "").unwrap();

    let output = dir.path().join("out");
    let work = dir.path().join("work");
    engine_with(3, 3, workload::prefix::workload(), "1", &work)
        .run(&input, &output)
        .unwrap();

    assert_eq!(output_lines(&output), vec!["1", "1", "1"]);
}
