//! Build-farm status report parsing.
//!
//! The report is line oriented. Each line is `key: value`. The first line is
//! the header of the first record and carries nothing else. A record ends on a
//! line whose key contains `Build` (the next record's header) or at the end of
//! input. Only `number`, `completed`, `result` and `reason` are used.

use std::collections::HashMap;

use tracing::{debug, warn};
use trybot_core::{BuildRecord, CorrelationKey, PollOutcome};

const RECORD_HEADER: &str = "Build";

pub fn parse_status_report(text: &str) -> Vec<BuildRecord> {
    let mut records = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    for line in text.lines().skip(1) {
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (line.trim(), ""),
        };
        if key.is_empty() {
            continue;
        }
        fields.insert(key.to_string(), value.to_string());
        if key.contains(RECORD_HEADER) {
            if let Some(r) = to_record(&fields) {
                records.push(r);
            }
            fields.clear();
        }
    }
    if !fields.is_empty() {
        if let Some(r) = to_record(&fields) {
            records.push(r);
        }
    }
    records
}

fn to_record(fields: &HashMap<String, String>) -> Option<BuildRecord> {
    let (Some(completed), Some(reason)) = (fields.get("completed"), fields.get("reason")) else {
        debug!(?fields, "status record without completed/reason");
        return None;
    };
    let number = match fields.get("number").map(|n| n.parse::<u64>()) {
        Some(Ok(n)) => n,
        _ => {
            warn!(reason = %reason, "status record without a build number");
            return None;
        }
    };
    // Running builds report `None`; anything but a literal 0 is a failure.
    let result = match fields.get("result").map(String::as_str) {
        Some("0") => 0,
        Some(r) => r.parse().ok().filter(|v| *v != 0).unwrap_or(-1),
        None => -1,
    };
    Some(BuildRecord { number, completed: completed.contains("True"), result, reason: reason.clone() })
}

/// Judges one snapshot for `key`.
///
/// The first completed success wins. Failures only become final when no
/// build with the same key is still running, since the farm may be retrying.
pub fn evaluate(key: &CorrelationKey, records: &[BuildRecord]) -> PollOutcome {
    let mut running = false;
    let mut failed = false;
    for r in records.iter().filter(|r| r.matches(key)) {
        if !r.completed {
            running = true;
            continue;
        }
        if r.succeeded() {
            return PollOutcome::Found(r.number);
        }
        failed = true;
    }
    if failed && !running {
        PollOutcome::FailedOnly
    } else {
        PollOutcome::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "master_NO_PATCH_lumpy-release";

    fn rec(number: u64, completed: bool, result: i64, reason: &str) -> BuildRecord {
        BuildRecord { number, completed, result, reason: reason.to_string() }
    }

    #[test]
    fn parses_records_between_headers() {
        let text = "Build 12:\n  number: 12\n  completed: True\n  result: 0\n  reason: 'master_NO_PATCH_lumpy-release'\n\
                    Build 11:\n  number: 11\n  completed: False\n  result: None\n  reason: other: with colon\n";
        let recs = parse_status_report(text);
        assert_eq!(
            recs,
            vec![
                rec(12, true, 0, "'master_NO_PATCH_lumpy-release'"),
                rec(11, false, -1, "other: with colon"),
            ]
        );
    }

    #[test]
    fn skips_incomplete_records() {
        let text = "Build 3:\n  number: 3\n  reason: x\nBuild 2:\n  completed: True\n  reason: x\n  result: 0\n";
        assert!(parse_status_report(text).is_empty());
        assert!(parse_status_report("").is_empty());
    }

    #[test]
    fn nonzero_results_stay_failures() {
        let text = "Build 4:\n  number: 4\n  completed: True\n  result: 2\n  reason: k\n";
        assert_eq!(parse_status_report(text)[0].result, 2);
    }

    #[test]
    fn success_beats_earlier_failure_and_running_duplicate() {
        let key = CorrelationKey::from_raw(KEY);
        let recs = vec![rec(9, true, 1, KEY), rec(10, false, -1, KEY), rec(8, true, 0, KEY)];
        assert_eq!(evaluate(&key, &recs), PollOutcome::Found(8));
    }

    #[test]
    fn first_success_wins() {
        let key = CorrelationKey::from_raw(KEY);
        let recs = vec![rec(7, true, 0, KEY), rec(8, true, 0, KEY)];
        assert_eq!(evaluate(&key, &recs), PollOutcome::Found(7));
    }

    #[test]
    fn failures_only_is_terminal() {
        let key = CorrelationKey::from_raw(KEY);
        let recs = vec![rec(5, true, 1, KEY), rec(6, true, 3, KEY), rec(7, false, -1, "other")];
        assert_eq!(evaluate(&key, &recs), PollOutcome::FailedOnly);
    }

    #[test]
    fn failure_with_retry_in_flight_is_pending() {
        let key = CorrelationKey::from_raw(KEY);
        let recs = vec![rec(5, true, 1, KEY), rec(6, false, -1, KEY)];
        assert_eq!(evaluate(&key, &recs), PollOutcome::Pending);
    }

    #[test]
    fn nothing_for_key_is_pending() {
        let key = CorrelationKey::from_raw(KEY);
        assert_eq!(evaluate(&key, &[rec(1, true, 0, "master_1_lumpy-release")]), PollOutcome::Pending);
        assert_eq!(evaluate(&key, &[]), PollOutcome::Pending);
    }
}
