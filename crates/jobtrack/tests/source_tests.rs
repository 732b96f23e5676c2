//! Mail sources driven through full pipeline runs.

mod common;

use common::{eml, FailingStore, MessageBuilder, TestHarness};

use jobtrack::email::{EmlDirectorySource, JsonBatchSource, RawBody, TransferEncoding};
use jobtrack::error::SinkError;
use jobtrack::{OutputSink, PipelineError, Status};

#[test]
fn test_eml_directory_run_moves_recorded_files() {
    let harness = TestHarness::new();
    harness.write_input(
        "001.eml",
        &eml(
            "a1@acme.com",
            "Acme Talent <talent@acme.com>",
            "Application received: Junior Developer",
            "Thanks for your interest.",
        ),
    );
    harness.write_input(
        "002.eml",
        &eml(
            "b1@globex.com",
            "hr@globex.com",
            "Interview invitation",
            "We would like to invite you to an interview for the Data Engineer role.",
        ),
    );
    harness.write_input("notes.txt", "not a message");

    let mut source = EmlDirectorySource::new(&harness.input_dir);
    let report = harness
        .pipeline()
        .run(&mut source, &harness.sink(), false)
        .unwrap();

    let records: Vec<_> = report.batch.iter().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source_message_id, "a1@acme.com");
    assert_eq!(records[0].company, "Acme");
    assert_eq!(records[0].position, "Junior Developer");
    assert_eq!(records[1].company, "Globex");
    assert_eq!(records[1].position, "Data Engineer");
    assert_eq!(records[1].status, Status::Interview);

    let processed = harness.input_dir.join(EmlDirectorySource::PROCESSED_DIR);
    assert!(processed.join("001.eml").exists());
    assert!(processed.join("002.eml").exists());
    assert!(!harness.input_dir.join("001.eml").exists());
    assert!(harness.input_dir.join("notes.txt").exists());

    // Nothing left to read on the next run.
    let report = harness
        .pipeline()
        .run(&mut EmlDirectorySource::new(&harness.input_dir), &harness.sink(), false)
        .unwrap();
    assert!(report.batch.is_empty());
}

#[test]
fn test_json_batch_with_encoded_bodies() {
    let harness = TestHarness::new();
    let messages = vec![
        MessageBuilder::new("j1")
            .sender("careers@initech.com")
            .subject("Update")
            .body(RawBody::Multipart {
                parts: vec![
                    RawBody::Html {
                        content: "<p>ignored when plain text exists</p>".to_string(),
                    },
                    RawBody::Encoded {
                        mime_type: "text/plain".to_string(),
                        encoding: TransferEncoding::Base64,
                        // "Unfortunately the QA Analyst role is filled."
                        data: "VW5mb3J0dW5hdGVseSB0aGUgUUEgQW5hbHlzdCByb2xlIGlzIGZpbGxlZC4="
                            .to_string(),
                    },
                ],
            })
            .build(),
        MessageBuilder::new("j2")
            .sender("hr@hooli.com")
            .subject("Offer")
            .html("<html><style>p{}</style><p>Congratulations&nbsp;on the <b>Staff Engineer</b> offer!</p></html>")
            .build(),
    ];
    let path = harness.write_batch("batch.json", &messages);

    let mut source = JsonBatchSource::new(&path);
    let report = harness
        .pipeline()
        .run(&mut source, &harness.sink(), false)
        .unwrap();

    let records: Vec<_> = report.batch.iter().collect();
    assert_eq!(records[0].status, Status::Rejected);
    assert_eq!(records[0].position, "QA Analyst");
    assert_eq!(records[1].status, Status::Accepted);
    assert_eq!(records[1].position, "Staff Engineer");
    assert!(path.exists());
    assert_eq!(harness.primary_rows().len(), 2);
}

#[test]
fn test_failed_persistence_leaves_messages_unmarked() {
    let harness = TestHarness::new();
    harness.write_input(
        "001.eml",
        &eml("a1@acme.com", "hr@acme.com", "Application received", "Thanks."),
    );

    let sink = OutputSink::new(
        Box::new(FailingStore::new("primary down")),
        Box::new(FailingStore::new("disk full")),
        harness.tracker(),
    );
    let mut source = EmlDirectorySource::new(&harness.input_dir);
    let err = harness.pipeline().run(&mut source, &sink, false).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Sink(SinkError::SecondaryStoreFailure { .. })
    ));
    assert!(harness.input_dir.join("001.eml").exists());
    assert!(!harness.tracker().is_processed("a1@acme.com").unwrap());

    // A later run with working stores picks the message up.
    let report = harness
        .pipeline()
        .run(&mut EmlDirectorySource::new(&harness.input_dir), &harness.sink(), false)
        .unwrap();
    assert_eq!(report.sink.unwrap().appended, vec!["a1@acme.com"]);
}

#[test]
fn test_missing_batch_file_is_a_source_error() {
    let harness = TestHarness::new();
    let mut source = JsonBatchSource::new(harness.temp_path().join("missing.json"));
    let err = harness
        .pipeline()
        .run(&mut source, &harness.sink(), false)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Source(_)));
}
