use scrape_core::{
    BatchOutcome, BatchReport, ErrorKind, ExtractedPayload, ExtractionError, FailureRecord,
    FetchDiagnostics, ListingFields, NormalizedRecord, RecordFields, ResourceKind,
};
use serde_json::json;

const AT: &str = "2024-05-01T10:00:00.000Z";

fn success(position: usize, url: &str, likely_blocked: bool) -> BatchOutcome {
    BatchOutcome::Success {
        position,
        record: NormalizedRecord {
            id: None,
            source_url: url.to_string(),
            kind: ResourceKind::CollectionKind,
            fields: RecordFields::Listing(ListingFields::default()),
            fetched_at: AT.to_string(),
        },
        fetch: FetchDiagnostics {
            status: 200,
            attempts: 1,
            likely_blocked,
            ..FetchDiagnostics::default()
        },
    }
}

fn failure(position: usize, url: &str, error: ExtractionError) -> BatchOutcome {
    BatchOutcome::Failure {
        position,
        failure: FailureRecord::new(url, &error, AT),
    }
}

#[test]
fn report_sorts_by_position_and_partitions_failures() {
    let report = BatchReport::new(vec![
        failure(3, "https://d", ExtractionError::validation("bad host")),
        success(0, "https://a", false),
        failure(
            1,
            "https://b",
            ExtractionError::Network {
                message: "http status 503".into(),
                attempts: 3,
                last_status: Some(503),
                likely_blocked: true,
            },
        ),
        success(2, "https://c", true),
        failure(4, "https://e", ExtractionError::validation("bad scheme")),
    ]);

    let positions: Vec<_> = report.outcomes.iter().map(BatchOutcome::position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 3);
    assert_eq!(report.summary.failures_of(ErrorKind::Validation), 2);
    assert_eq!(report.summary.failures_of(ErrorKind::Network), 1);
    assert_eq!(report.summary.failures_of(ErrorKind::DataExtraction), 0);
    assert_eq!(report.summary.likely_blocked, 2);
    assert_eq!(report.failed_urls(), vec!["https://b", "https://d", "https://e"]);
    assert_eq!(report.records().count(), 2);
}

#[test]
fn failure_outcome_serializes_as_failure_record() {
    let outcome = failure(
        0,
        "https://x",
        ExtractionError::timeout("batch deadline exceeded"),
    );
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({
            "sourceUrl": "https://x",
            "success": false,
            "errorKind": "TimeoutError",
            "message": "batch deadline exceeded",
            "likelyBlocked": false,
            "occurredAt": AT
        })
    );
}

#[test]
fn summary_serializes_kind_keys_as_names() {
    let report = BatchReport::new(vec![failure(
        0,
        "https://x",
        ExtractionError::validation("nope"),
    )]);
    let value = serde_json::to_value(&report.summary).unwrap();
    assert_eq!(value["byKind"]["ValidationError"], 1);
    assert_eq!(value["failed"], 1);
}

#[test]
fn blocked_network_failure_is_flagged_on_its_record() {
    let outcome = failure(
        0,
        "https://x",
        ExtractionError::Network {
            message: "http status 403 Forbidden".into(),
            attempts: 3,
            last_status: Some(403),
            likely_blocked: true,
        },
    );
    let BatchOutcome::Failure { failure, .. } = &outcome else {
        panic!("expected failure");
    };
    assert!(failure.likely_blocked);
    assert_eq!(serde_json::to_value(&outcome).unwrap()["likelyBlocked"], true);
}

#[test]
fn empty_object_is_not_a_payload() {
    assert_eq!(ExtractedPayload::from_value(json!({})), None);
    assert_eq!(ExtractedPayload::from_value(json!([1])), None);
    let payload = ExtractedPayload::from_value(json!({"a": 1})).unwrap();
    assert_eq!(payload.candidate(), "inline");
}
