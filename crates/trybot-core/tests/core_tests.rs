use trybot_core::{
    parse_patch_list, BuildRecord, BuildRequest, ConfigError, CorrelationKey, Locality, PatchId, PollOutcome,
    Target,
};

#[test]
fn test_request_key_keeps_patch_order() {
    let req = BuildRequest {
        target: Target::parse("lumpy-release").unwrap(),
        branch: "master".to_string(),
        patches: parse_patch_list("5678,1234"),
        chrome_version: None,
        locality: Locality::Remote,
    };
    assert_eq!(req.correlation_key().as_str(), "master_5678+1234_lumpy-release");
}

#[test]
fn test_request_key_matches_direct_derivation() {
    let target = Target::parse("daisy-release").unwrap();
    let patches = vec![PatchId::internal("778899")];
    let req = BuildRequest {
        target: target.clone(),
        branch: "release-R25-3428.B".to_string(),
        patches: patches.clone(),
        chrome_version: Some("25.0.1364.0".to_string()),
        locality: Locality::Remote,
    };
    assert_eq!(req.correlation_key(), CorrelationKey::derive("release-R25-3428.B", &patches, &target));
    assert_eq!(req.correlation_key().as_str(), "release-R25-3428.B_*778899_daisy-release");
}

#[test]
fn test_unfinished_record_is_not_success() {
    let rec = BuildRecord { number: 3, completed: false, result: 0, reason: "k".into() };
    assert!(!rec.succeeded());
}

#[test]
fn test_poll_outcome_equality() {
    assert_eq!(PollOutcome::Found(5), PollOutcome::Found(5));
    assert_ne!(PollOutcome::FailedOnly, PollOutcome::Pending);
}

#[test]
fn test_config_error_messages() {
    let err = ConfigError::BranchAndVersion { branch: "b".into(), version: "R25-1.2.3".into() };
    assert!(err.to_string().contains("cannot both be set"));
    assert!(matches!(Target::parse(" "), Err(ConfigError::InvalidTarget(_))));
}
