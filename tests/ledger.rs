//! Evidence Ledger Integration Tests
//!
//! Tests for the JSONL record format, append behavior, and the tolerant
//! read path.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use terralog::{sha256_hex, DataSource, EvidenceLedger, EvidenceRecord};

#[tokio::test]
async fn test_append_end_to_end() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    let record = EvidenceRecord::new(
        -10.0,
        -52.0,
        "test-0001",
        vec![DataSource::new("Sentinel-2", "S2A_TEST_TILE")],
    )
    .with_notes("unit-test");

    ledger.append(&record).await.unwrap();

    assert!(path.exists());

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(parsed["candidate_id"], "test-0001");
    assert_eq!(parsed["sources"][0]["id"], "S2A_TEST_TILE");
    assert_eq!(parsed["sources"][0]["type"], "Sentinel-2");
    assert_eq!(parsed["notes"], "unit-test");
}

#[tokio::test]
async fn test_two_appends_two_parseable_lines_in_order() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    for i in 1..=2 {
        let record = EvidenceRecord::new(
            -10.0,
            -52.0,
            format!("test-{:04}", i),
            vec![DataSource::new("Sentinel-2", "S2A_TEST_TILE")],
        );
        ledger.append(&record).await.unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    for (i, line) in lines.iter().enumerate() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["candidate_id"], format!("test-{:04}", i + 1));
    }
}

#[tokio::test]
async fn test_timestamp_is_valid_utc_iso8601() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    let before = Utc::now();
    let record = EvidenceRecord::new(-10.0, -52.0, "test-0001", Vec::new());
    ledger.append(&record).await.unwrap();
    let after = Utc::now();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

    let ts: DateTime<Utc> = parsed["timestamp"].as_str().unwrap().parse().unwrap();
    assert!(ts >= before && ts <= after);

    // Numeric fields round-trip exactly
    assert_eq!(parsed["lat"].as_f64().unwrap(), -10.0);
    assert_eq!(parsed["lon"].as_f64().unwrap(), -52.0);
}

#[tokio::test]
async fn test_read_tolerates_malformed_trailing_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    for i in 0..3 {
        let record = EvidenceRecord::new(0.0, 0.0, format!("cand-{}", i), Vec::new());
        ledger.append(&record).await.unwrap();
    }

    // A reader may catch a concurrent writer mid-line
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{\"timestamp\": \"2025-06");
    std::fs::write(&path, content).unwrap();

    let records = ledger.read_all().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].candidate_id, "cand-2");
}

#[tokio::test]
async fn test_hash_fields_absent_without_text() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    let record = EvidenceRecord::new(0.0, 0.0, "test-0001", Vec::new());
    ledger.append(&record).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

    assert!(parsed.get("prompt_sha256").is_none());
    assert!(parsed.get("output_sha256").is_none());
}

#[tokio::test]
async fn test_hash_fields_populated_from_text() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("evidence.jsonl");
    let ledger = EvidenceLedger::new(&path);

    let record = EvidenceRecord::new(0.0, 0.0, "test-0001", Vec::new())
        .with_prompt_text("prompt text")
        .with_output_text("output text");
    ledger.append(&record).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

    assert_eq!(
        parsed["prompt_sha256"].as_str().unwrap(),
        sha256_hex("prompt text")
    );
    assert_eq!(
        parsed["output_sha256"].as_str().unwrap(),
        sha256_hex("output text")
    );
    assert_eq!(parsed["prompt_sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_hash_consistency() {
    let hash1 = sha256_hex("hello\nworld");
    let hash2 = sha256_hex("hello\nworld");
    let hash3 = sha256_hex("unicode: 日本語");

    assert_eq!(hash1, hash2);
    assert_ne!(hash1, hash3);
    assert_eq!(hash1.len(), 64);
    assert_eq!(hash3.len(), 64);
}

#[tokio::test]
async fn test_select_filters_and_fallback() {
    let temp = TempDir::new().unwrap();
    let ledger = EvidenceLedger::new(temp.path().join("evidence.jsonl"));

    for i in 0..5 {
        let record = EvidenceRecord::new(
            -1.0,
            -49.5,
            format!("marajo-hot-010{}", i),
            vec![DataSource::new("Sentinel-1 VV", "WET: S1A_W; DRY: S1A_D")],
        );
        ledger.append(&record).await.unwrap();
    }

    // Exact candidate match
    let exact = ledger
        .select(Some("marajo-hot-0102"), None, 20)
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);

    // Case-insensitive substring
    let matched = ledger.select(None, Some("MARAJO"), 20).await.unwrap();
    assert_eq!(matched.len(), 5);

    // No match falls back to the last K
    let fallback = ledger.select(Some("tapajos-01"), None, 2).await.unwrap();
    assert_eq!(fallback.len(), 2);
    assert_eq!(fallback[1].candidate_id, "marajo-hot-0104");
}
