//! End-to-end tests driving the compiled `membench` binary against a
//! scratch directory, in the style of the teacher's own
//! `tests/integration_tests.rs` (process-level rather than in-process
//! since this crate is a binary with no library target).

use std::process::Command;

#[test]
fn short_run_writes_rate_log_and_result_row() {
    let dir = tempfile::tempdir().expect("failed to create scratch dir");
    let rate_log = dir.path().join("rate.csv");
    let result_csv = dir.path().join("result.csv");

    let status = Command::new(env!("CARGO_BIN_EXE_membench"))
        .args([
            "-d", "1",
            "-t", "2",
            "-a", "8",
            "-s", "1",
            "-m", "1",
            "-b", rate_log.to_str().unwrap(),
            "-l", result_csv.to_str().unwrap(),
        ])
        .status()
        .expect("failed to spawn membench binary");
    assert!(status.success(), "membench exited with {status}");

    let rate_contents = std::fs::read_to_string(&rate_log).expect("rate log not written");
    assert!(rate_contents.lines().count() > 0, "expected at least one rate sample line");
    assert!(rate_contents.lines().all(|line| line.split(", ").count() == 2));

    let result_contents = std::fs::read_to_string(&result_csv).expect("result row not written");
    let row = result_contents.lines().next().expect("expected one result row");
    assert!(row.ends_with(','));
    assert_eq!(row.trim_end_matches(',').split(", ").count(), 10);
}

#[test]
fn invalid_configuration_exits_nonzero() {
    let dir = tempfile::tempdir().expect("failed to create scratch dir");
    let result_csv = dir.path().join("result.csv");

    let status = Command::new(env!("CARGO_BIN_EXE_membench"))
        .args(["-t", "0", "-l", result_csv.to_str().unwrap()])
        .status()
        .expect("failed to spawn membench binary");
    assert!(!status.success(), "expected zero-thread config to be rejected");
}
