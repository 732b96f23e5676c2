//! Table-driven tests for configuration loading and validation, plus the
//! effect of keyword overrides on a pipeline run.

mod common;

use common::{MessageBuilder, TestHarness};

use jobtrack::config::{load_config, load_config_from_str, load_or_create_config};
use jobtrack::pipeline::EmptyHistory;
use jobtrack::Status;

struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object_uses_defaults",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "mailbox_label": "Jobs",
            "processed_label": "Jobs/Done",
            "destination_name": "Applications 2024",
            "database_path": "/tmp/jobtrack-test.db",
            "fallback_csv_path": "fallback.csv",
            "keywords": {
                "status": { "ghosted": "Rejected" },
                "position_disambiguation": ["robotics", "backend"],
                "ignored_sender_domains": ["mailchimp"],
                "company_indicators": ["at"],
                "title_keywords": ["engineer"],
                "title_qualifiers": ["senior"]
            },
            "identity": {
                "company_prefix_len": 6,
                "position_prefix_len": 8,
                "keyword_prefix_len": 4,
                "hash_len": 12
            },
            "ai": {
                "enabled": true,
                "model": "gemini-1.5-pro",
                "api_key_env": "MY_KEY",
                "max_body_chars": 2000
            }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "wrong_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "zero_prefix_length",
        config_json: r#"{ "identity": { "company_prefix_len": 0 } }"#,
        should_succeed: false,
        expected_error: Some("company_prefix_len"),
    },
    ConfigTestCase {
        name: "hash_too_short",
        config_json: r#"{ "identity": { "hash_len": 2 } }"#,
        should_succeed: false,
        expected_error: Some("hash_len"),
    },
    ConfigTestCase {
        name: "hash_too_long",
        config_json: r#"{ "identity": { "hash_len": 65 } }"#,
        should_succeed: false,
        expected_error: Some("hash_len"),
    },
    ConfigTestCase {
        name: "blank_destination",
        config_json: r#"{ "destination_name": "  " }"#,
        should_succeed: false,
        expected_error: Some("destination_name"),
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: r#"{ "version": "1.0", "#,
        should_succeed: false,
        expected_error: Some("parse"),
    },
    ConfigTestCase {
        name: "wrong_type",
        config_json: r#"{ "identity": { "hash_len": "eight" } }"#,
        should_succeed: false,
        expected_error: Some("parse"),
    },
];

#[test]
fn test_json_config_cases() {
    for case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        match (case.should_succeed, result) {
            (true, Ok(_)) => {}
            (true, Err(e)) => panic!("{}: expected success, got {}", case.name, e),
            (false, Ok(_)) => panic!("{}: expected an error", case.name),
            (false, Err(e)) => {
                if let Some(expected) = case.expected_error {
                    let message = e.to_string();
                    assert!(
                        message.contains(expected),
                        "{}: '{}' does not contain '{}'",
                        case.name,
                        message,
                        expected
                    );
                }
            }
        }
    }
}

#[test]
fn test_missing_file_is_created_with_defaults() {
    let harness = TestHarness::new();
    let path = harness.temp_path().join("nested").join("jobtrack.json");

    let config = load_or_create_config(&path);
    assert!(path.exists());
    assert_eq!(config.destination_name, "Job Applications Tracker");

    let reloaded = load_config(&path).unwrap();
    assert_eq!(reloaded.identity.hash_len, 8);
    assert_eq!(reloaded.ai.max_body_chars, 4000);
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let harness = TestHarness::new();
    let path = harness.write_input("broken.json", "{ not json");

    let config = load_or_create_config(&path);
    assert_eq!(config.version, "1.0");
    // The broken file is left for the user to fix.
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn test_status_keyword_override_changes_classification() {
    let config = load_config_from_str(
        r#"{ "keywords": { "status": { "ghosted": "Rejected", "catch up": "Interview", "nonsense": "Maybe" } } }"#,
    )
    .unwrap();
    let harness = TestHarness::with_config(config);
    let pipeline = harness.pipeline();

    let ghosted = MessageBuilder::new("m1")
        .sender("hr@acme.com")
        .subject("Status")
        .text("Looks like you got ghosted.")
        .build();
    let (record, _) = pipeline.process_message(&ghosted, &EmptyHistory).unwrap();
    assert_eq!(record.status, Status::Rejected);

    let chat = MessageBuilder::new("m2")
        .sender("hr@acme.com")
        .subject("Status")
        .text("Can we catch up on Friday?")
        .build();
    let (record, _) = pipeline.process_message(&chat, &EmptyHistory).unwrap();
    assert_eq!(record.status, Status::Interview);

    // Built-in keywords still apply.
    let regret = MessageBuilder::new("m3")
        .sender("hr@acme.com")
        .subject("Status")
        .text("We regret to inform you.")
        .build();
    let (record, _) = pipeline.process_message(&regret, &EmptyHistory).unwrap();
    assert_eq!(record.status, Status::Rejected);
}

#[test]
fn test_disambiguation_override_and_identity_lengths() {
    let config = load_config_from_str(
        r#"{
            "keywords": { "position_disambiguation": ["robotics"] },
            "identity": { "company_prefix_len": 3, "position_prefix_len": 4, "hash_len": 6 }
        }"#,
    )
    .unwrap();
    let harness = TestHarness::with_config(config);

    let (report, _) = harness.run(vec![
        MessageBuilder::new("a1")
            .sender("jobs@acme.com")
            .subject("Backend Engineer application received")
            .build(),
        MessageBuilder::new("a2")
            .sender("jobs@acme.com")
            .subject("Robotics Engineer application received")
            .build(),
    ]);

    let ids: Vec<&str> = report.batch.iter().map(|r| r.id.as_str()).collect();
    let first: Vec<&str> = ids[0].split('_').collect();
    let second: Vec<&str> = ids[1].split('_').collect();

    assert_eq!(&first[..2], ["acm", "back"]);
    assert_eq!(first[2].len(), 6);
    assert_eq!(&second[..3], ["acm", "engi", "robotics"]);
    assert_eq!(second[3].len(), 6);
}
