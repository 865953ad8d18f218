//! End-to-end pipeline runs against the real analyzer binary.

use slicer_rs::events::VecEventSink;
use slicer_rs::orchestrator::{run, RunConfig};
use slicer_rs::{FatalError, MapError};

use crate::support;

fn config(input: std::path::PathBuf, socket_dir: &std::path::Path) -> RunConfig {
    let mut cfg = RunConfig::new(input);
    cfg.analyzer = support::echo_analyzer();
    cfg.socket_dir = socket_dir.to_path_buf();
    cfg
}

#[test]
fn identity_round_trip_tallies_one_header_per_chunk() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(
        tmp.path(),
        "sensors.csv",
        b"id|device\n1|A\n2|B\n3|A\n4|C\n5|A\n6|B\n",
    );

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(2);
    // The identity analyzer re-emits the header of every chunk; keep
    // them so the expected total is exact: 6 data rows + 2 headers.
    cfg.strip_response_header = false;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");

    assert_eq!(summary.data_lines, 6);
    assert_eq!(summary.devices, 3);
    assert_eq!(summary.workers, 2);
    assert_eq!(summary.total_tally, 6 + 2);

    // Every data row comes back exactly once, across all workers.
    let mut rows: Vec<Vec<u8>> = summary
        .outcomes
        .iter()
        .flat_map(|o| {
            o.output
                .split(|&b| b == b'\n')
                .filter(|l| !l.is_empty())
                .map(<[u8]>::to_vec)
        })
        .collect();
    rows.sort();
    let mut expected: Vec<Vec<u8>> = [
        &b"id|device"[..],
        b"id|device",
        b"1|A",
        b"2|B",
        b"3|A",
        b"4|C",
        b"5|A",
        b"6|B",
    ]
    .iter()
    .map(|l| l.to_vec())
    .collect();
    expected.sort();
    assert_eq!(rows, expected);

    assert!(support::leftover_sockets(tmp.path()).is_empty());

    let text = String::from_utf8(events.take()).unwrap();
    assert!(text.contains("\"type\":\"summary\""));
    assert!(text.contains("\"stage\":\"partition\""));
}

#[test]
fn strip_header_compensation_yields_data_line_total() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(tmp.path(), "sensors.csv", b"id|device\n1|A\n2|B\n3|A\n");

    // One worker makes the per-result compensation exact: one response
    // buffer, one re-emitted header.
    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(1);
    cfg.strip_response_header = true;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");
    assert_eq!(summary.total_tally, 3);
}

#[test]
fn dropped_header_analyzer_returns_exactly_the_data_rows() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(
        tmp.path(),
        "sensors.csv",
        b"id|device\n1|A\n2|B\n3|A\n4|C\n5|A\n6|B\n",
    );
    let wrapper = support::echo_wrapper(tmp.path(), "drop_header.sh", &["--drop-header"]);

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(3);
    cfg.analyzer = wrapper;
    // The analyzer already dropped the header, so no compensation.
    cfg.strip_response_header = false;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");
    assert_eq!(summary.total_tally, 6);
}

#[test]
fn header_only_input_produces_zero_tally() {
    let tmp = tempfile::tempdir().expect("temp dir");
    // No trailing LF on the header.
    let input = support::write_csv(tmp.path(), "sensors.csv", b"id|device");
    let wrapper = support::echo_wrapper(tmp.path(), "drop_header.sh", &["--drop-header"]);

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(2);
    cfg.analyzer = wrapper;
    cfg.strip_response_header = false;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");

    assert_eq!(summary.data_lines, 0);
    assert_eq!(summary.devices, 0);
    assert_eq!(summary.total_tally, 0);
    // Empty chunks are still dispatched, one per worker.
    let processed: u64 = summary
        .outcomes
        .iter()
        .map(|o| o.stats.chunks_processed)
        .sum();
    assert_eq!(processed, 2);
}

#[test]
fn final_row_without_newline_is_terminated_in_the_response() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(tmp.path(), "sensors.csv", b"id|device\nx|Q");

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(1);
    cfg.strip_response_header = false;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");

    assert_eq!(summary.data_lines, 1);
    // header + repaired row, echoed verbatim.
    assert_eq!(summary.outcomes[0].output, b"id|device\nx|Q\n");
    assert_eq!(summary.total_tally, 2);
}

#[test]
fn failing_analyzer_drops_chunks_but_completes_the_run() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(tmp.path(), "sensors.csv", b"id|device\n1|A\n2|B\n");
    let wrapper = support::echo_wrapper(tmp.path(), "fail.sh", &["--fail"]);

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(2);
    cfg.analyzer = wrapper;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run completes despite failures");

    assert_eq!(summary.total_tally, 0);
    let failed: u64 = summary.outcomes.iter().map(|o| o.stats.chunks_failed).sum();
    assert_eq!(failed, 2);
    let io_errors: u64 = summary.outcomes.iter().map(|o| o.stats.io_errors).sum();
    assert_eq!(io_errors, 2);
    assert!(summary.outcomes.iter().all(|o| o.output.is_empty()));
    assert!(support::leftover_sockets(tmp.path()).is_empty());
}

#[test]
fn missing_analyzer_counts_spawn_errors() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(tmp.path(), "sensors.csv", b"id|device\n1|A\n");

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(1);
    cfg.analyzer = tmp.path().join("does-not-exist");

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run completes");

    assert_eq!(summary.total_tally, 0);
    assert_eq!(summary.outcomes[0].stats.spawn_errors, 1);
    assert_eq!(summary.outcomes[0].stats.chunks_failed, 1);
    assert!(support::leftover_sockets(tmp.path()).is_empty());
}

#[test]
fn empty_file_fails_before_any_worker_starts() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let input = support::write_csv(tmp.path(), "sensors.csv", b"");

    let cfg = config(input, tmp.path());
    let events = VecEventSink::new();
    let err = run(&cfg, &events).expect_err("empty input");
    assert!(matches!(err, FatalError::Map(MapError::EmptyFile)));
    assert!(support::leftover_sockets(tmp.path()).is_empty());
}

#[test]
fn many_devices_balance_across_workers() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let mut content = b"id|device|temp\n".to_vec();
    // 40 devices with 1..=40 rows each: 820 rows total.
    for dev in 0..40u32 {
        for row in 0..=dev {
            content.extend_from_slice(format!("{row}|sensor_{dev:02}|21.5\n").as_bytes());
        }
    }
    let input = support::write_csv(tmp.path(), "sensors.csv", &content);
    let wrapper = support::echo_wrapper(tmp.path(), "drop_header.sh", &["--drop-header"]);

    let mut cfg = config(input, tmp.path());
    cfg.workers = Some(4);
    cfg.analyzer = wrapper;
    cfg.strip_response_header = false;

    let events = VecEventSink::new();
    let summary = run(&cfg, &events).expect("run");

    assert_eq!(summary.data_lines, 820);
    assert_eq!(summary.devices, 40);
    assert_eq!(summary.total_tally, 820);
}
