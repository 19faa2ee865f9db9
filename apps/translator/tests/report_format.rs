//! Run report format conformance
//!
//! Downstream tooling merges the reports of all workers of a run, so the
//! envelope and per-file fields are a contract. These tests pin the JSON
//! shape written to disk.

use corpus_translator::report::RunReport;
use corpus_translator::shard::{ShardAssignment, ShardState};
use serde_json::Value;
use std::path::PathBuf;
use tokio_test::assert_ok;

/// Required envelope fields per the report contract
const ENVELOPE_FIELDS: &[&str] = &[
    "run_id",
    "worker_index",
    "worker_count",
    "profile",
    "model",
    "started_at",
    "finished_at",
    "files",
];

const FILE_FIELDS: &[&str] = &[
    "source",
    "output",
    "status",
    "error",
    "duration_ms",
    "input_chars",
    "output_chars",
];

fn sample_state() -> (ShardState, Vec<PathBuf>) {
    let files = vec![
        PathBuf::from("corpus/01.txt"),
        PathBuf::from("corpus/02.txt"),
        PathBuf::from("corpus/03.txt"),
    ];
    let state = ShardState::new(ShardAssignment::new(4, 3).unwrap(), &files);
    state.start(&files[0], 120);
    state.complete(&files[0], PathBuf::from("out/01_English.txt"), 340);
    state.start(&files[1], 80);
    state.fail(&files[1], "backend returned status 503: overloaded".to_string());
    (state, files)
}

async fn written_report() -> Value {
    let (state, _) = sample_state();
    let report = RunReport::from_state(&state, "adaptation", "Qwen/Qwen2-7B-Instruct", 1_700_000_000_000);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    assert_ok!(report.write(&path).await);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.ends_with('\n'), "report should end with a newline");
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn envelope_has_required_fields() {
    let json = written_report().await;
    let obj = json.as_object().expect("report should be an object");

    for field in ENVELOPE_FIELDS {
        assert!(obj.contains_key(*field), "missing envelope field: {field}");
    }
    assert_eq!(obj.len(), ENVELOPE_FIELDS.len(), "unexpected envelope fields");

    assert_eq!(json["worker_index"], 3);
    assert_eq!(json["worker_count"], 4);
    assert_eq!(json["profile"], "adaptation");
    assert_eq!(json["model"], "Qwen/Qwen2-7B-Instruct");
    assert_eq!(json["started_at"], 1_700_000_000_000_u64);
    assert!(json["finished_at"].as_u64().unwrap() >= 1_700_000_000_000);
}

#[tokio::test]
async fn run_id_is_uuid_v4() {
    let json = written_report().await;
    let run_id = json["run_id"].as_str().expect("run_id should be a string");

    let parsed = uuid::Uuid::parse_str(run_id).expect("run_id should be a valid UUID");
    assert_eq!(parsed.get_version_num(), 4);
}

#[tokio::test]
async fn files_keep_shard_order_and_status() {
    let json = written_report().await;
    let files = json["files"].as_array().expect("files should be an array");
    assert_eq!(files.len(), 3);

    for file in files {
        let obj = file.as_object().unwrap();
        for field in FILE_FIELDS {
            assert!(obj.contains_key(*field), "missing file field: {field}");
        }
    }

    assert_eq!(files[0]["source"], "corpus/01.txt");
    assert_eq!(files[0]["status"], "translated");
    assert_eq!(files[0]["output"], "out/01_English.txt");
    assert_eq!(files[0]["input_chars"], 120);
    assert_eq!(files[0]["output_chars"], 340);
    assert!(files[0]["error"].is_null());
    assert!(files[0]["duration_ms"].is_u64());

    assert_eq!(files[1]["status"], "failed");
    assert_eq!(files[1]["error"], "backend returned status 503: overloaded");
    assert!(files[1]["output"].is_null());

    assert_eq!(files[2]["status"], "pending");
    assert!(files[2]["duration_ms"].is_null());
}
