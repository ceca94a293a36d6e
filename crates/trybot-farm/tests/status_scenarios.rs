use std::path::{Path, PathBuf};

use serde::Deserialize;
use trybot_core::{CorrelationKey, PollOutcome};
use trybot_farm::{evaluate, parse_status_report};

#[derive(Debug, Deserialize)]
struct Expected {
    scenario_id: String,
    key: String,
    expect: String,
    #[serde(default)]
    number: Option<u64>,
}

fn scenario_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/status").join(name)
}

fn run(name: &str) -> (Expected, PollOutcome) {
    let dir = scenario_dir(name);
    let exp: Expected =
        serde_yaml::from_str(&std::fs::read_to_string(dir.join("expected.yaml")).unwrap()).unwrap();
    assert_eq!(exp.scenario_id, name);
    let report = std::fs::read_to_string(dir.join("report.txt")).unwrap();
    let records = parse_status_report(&report);
    let outcome = evaluate(&CorrelationKey::from_raw(exp.key.clone()), &records);
    (exp, outcome)
}

fn expected_outcome(exp: &Expected) -> PollOutcome {
    match exp.expect.as_str() {
        "found" => PollOutcome::Found(exp.number.unwrap()),
        "failed_only" => PollOutcome::FailedOnly,
        "pending" => PollOutcome::Pending,
        other => panic!("unknown expectation {other}"),
    }
}

#[test]
fn scenario_st01_success_after_failure() {
    let (exp, out) = run("ST-01-success-after-failure");
    assert_eq!(out, expected_outcome(&exp));
}

#[test]
fn scenario_st02_failed_only() {
    let (exp, out) = run("ST-02-failed-only");
    assert_eq!(out, expected_outcome(&exp));
    assert_eq!(out.sentinel(), 0);
}

#[test]
fn scenario_st03_failed_with_retry_running() {
    let (exp, out) = run("ST-03-failed-with-retry-running");
    assert_eq!(out, expected_outcome(&exp));
    assert_eq!(out.sentinel(), -1);
}

#[test]
fn scenario_st04_no_matching_build() {
    let (exp, out) = run("ST-04-no-matching-build");
    assert_eq!(out, expected_outcome(&exp));
}

#[test]
fn scenario_st05_patched_internal_key() {
    let (exp, out) = run("ST-05-patched-internal-key");
    assert_eq!(out, expected_outcome(&exp));
}
