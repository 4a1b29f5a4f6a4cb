use std::fs;

use scrape_core::{
    BatchOutcome, BatchReport, ExtractionError, FailureRecord, FetchDiagnostics, ListingFields,
    NormalizedRecord, RecordFields, ResourceKind,
};
use scrape_engine::{
    ensure_output_dir, write_report, AtomicFileWriter, JsonLinesSink, RecordSink, REPORT_FILE,
};
use serde_json::Value;
use tempfile::tempdir;

const AT: &str = "2024-05-01T10:00:00.000Z";

fn success(position: usize, url: &str) -> BatchOutcome {
    BatchOutcome::Success {
        position,
        record: NormalizedRecord {
            id: None,
            source_url: url.to_string(),
            kind: ResourceKind::CollectionKind,
            fields: RecordFields::Listing(ListingFields::default()),
            fetched_at: AT.to_string(),
        },
        fetch: FetchDiagnostics::default(),
    }
}

fn failure(position: usize, url: &str) -> BatchOutcome {
    BatchOutcome::Failure {
        position,
        failure: FailureRecord::new(url, &ExtractionError::validation("unsupported host"), AT),
    }
}

#[test]
fn json_lines_sink_appends_across_reopens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("dataset.jsonl");

    let sink = JsonLinesSink::open(&path).unwrap();
    sink.append(&success(0, "https://a")).unwrap();
    sink.append(&failure(1, "https://b")).unwrap();
    drop(sink);
    JsonLinesSink::open(&path)
        .unwrap()
        .append(&success(2, "https://c"))
        .unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["sourceUrl"], "https://a");
    assert_eq!(lines[1]["success"], false);
    assert_eq!(lines[1]["errorKind"], "ValidationError");
    assert_eq!(lines[2]["kind"], "collection");
}

#[test]
fn report_lists_summary_and_failed_urls() {
    let dir = tempdir().unwrap();
    let report = BatchReport::new(vec![
        failure(2, "https://c"),
        success(0, "https://a"),
        failure(1, "https://b"),
    ]);

    let path = write_report(dir.path(), &report).unwrap();
    assert_eq!(path, dir.path().join(REPORT_FILE));

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["summary"]["total"], 3);
    assert_eq!(written["summary"]["succeeded"], 1);
    assert_eq!(written["summary"]["byKind"]["ValidationError"], 2);
    assert_eq!(
        written["failedUrls"],
        serde_json::json!(["https://b", "https://c"])
    );
}

#[test]
fn atomic_writer_replaces_existing_file() {
    let dir = tempdir().unwrap();
    let writer = AtomicFileWriter::new(dir.path().to_path_buf());
    writer.write("report.json", "first").unwrap();
    let path = writer.write("report.json", "second").unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "second");
}

#[test]
fn output_dir_must_be_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();
    assert!(ensure_output_dir(&file).is_err());

    let fresh = dir.path().join("a").join("b");
    ensure_output_dir(&fresh).unwrap();
    assert!(fresh.is_dir());
}
