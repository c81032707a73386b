//! End-to-end build and search over `journalctl --output=json` input.

use journal_index::{
    build, build_from_path, IndexConfig, IndexError, LogIndex, MalformedEntryPolicy, Outcome,
};
use std::io::Write;
use tokio_util::sync::CancellationToken;

fn json_journal(messages: &[&str]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            format!(
                "{}\n",
                serde_json::json!({
                    "__REALTIME_TIMESTAMP": (1_700_000_000_000_000u64 + i as u64).to_string(),
                    "PRIORITY": "6",
                    "_SYSTEMD_UNIT": "demo.service",
                    "SYSLOG_IDENTIFIER": "demo",
                    "MESSAGE": message,
                })
            )
        })
        .collect()
}

async fn index_of(data: &str, config: &IndexConfig) -> LogIndex {
    build(data.as_bytes(), Some(data.len() as u64), config, &mut |_| {}, None)
        .await
        .unwrap()
        .complete()
        .unwrap()
}

async fn search(index: &LogIndex, query: &str) -> Outcome<Vec<u32>> {
    index.search(query, None, None).await.unwrap()
}

#[tokio::test]
async fn test_apple_search() {
    let data = json_journal(&["apple pie", "banana split", "apple tart"]);
    let index = index_of(&data, &IndexConfig::default()).await;

    assert_eq!(index.entry_count(), 3);
    assert_eq!(search(&index, "apple").await, Outcome::Complete(vec![0, 2]));
    assert_eq!(search(&index, "APPLE T").await, Outcome::Complete(vec![2]));
    assert_eq!(search(&index, "xyz").await, Outcome::Complete(vec![]));

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = index.search("apple", None, Some(&token)).await.unwrap();
    assert_eq!(cancelled, Outcome::Cancelled);
    assert_ne!(cancelled, Outcome::Complete(vec![]));
}

#[tokio::test]
async fn test_cancel_from_another_task_mid_search() {
    let messages: Vec<String> = (0..100).map(|i| format!("apple crumble #{i}")).collect();
    let refs: Vec<&str> = messages.iter().map(String::as_str).collect();
    let data = json_journal(&refs);
    let config = IndexConfig::builder().verify_yield_every(8).build().unwrap();
    let index = index_of(&data, &config).await;
    assert_eq!(search(&index, "apple").await, Outcome::Complete((0..100).collect()));

    let token = CancellationToken::new();
    let (outcome, ()) = tokio::join!(index.search("apple", None, Some(&token)), async {
        tokio::task::yield_now().await;
        token.cancel();
    });
    assert_eq!(outcome.unwrap(), Outcome::Cancelled);
}

#[tokio::test]
async fn test_results_match_brute_force() {
    let messages = [
        "Started Session 1 of user root.",
        "kernel: usb 1-1: new high-speed USB device",
        "Failed to start Network Manager",
        "session closed for user root",
        "Connection refused (errno 111)",
        "FAILED: disk /dev/sda1 full",
        "ok",
    ];
    let data = json_journal(&messages);
    let config = IndexConfig::builder()
        .yield_every(2)
        .verify_yield_every(1)
        .build()
        .unwrap();
    let index = index_of(&data, &config).await;

    for query in ["session", "user root", "fail", "usb", "o", "ok", "111)", "zzz", "d"] {
        let expected: Vec<u32> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.to_lowercase().contains(&query.to_lowercase()))
            .map(|(i, _)| i as u32)
            .collect();
        assert_eq!(
            search(&index, query).await,
            Outcome::Complete(expected),
            "query {query:?}"
        );
    }
}

#[tokio::test]
async fn test_entries_are_materialized() {
    let data = json_journal(&["line one\nline two"]);
    let index = index_of(&data, &IndexConfig::default()).await;
    let entry = index.get_entry(0).unwrap();
    assert_eq!(entry.timestamp_micros(), 1_700_000_000_000_000);
    assert_eq!(entry.priority.map(|p| p.name()), Some("info"));
    assert_eq!(entry.unit.as_deref(), Some("demo.service"));
    assert_eq!(entry.syslog_identifier.as_deref(), Some("demo"));
    assert_eq!(index.line_count(0).unwrap(), 2);
    assert!(matches!(
        index.get_entry(1),
        Err(IndexError::OutOfRange { ordinal: 1, count: 1 })
    ));
}

#[tokio::test]
async fn test_byte_ranges_reslice_from_disk() {
    let data = json_journal(&["first", "second", "third"]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(data.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut seen = Vec::new();
    let index = build_from_path(
        file.path(),
        &IndexConfig::default(),
        &mut |p| seen.push(p),
        None,
    )
    .await
    .unwrap()
    .complete()
    .unwrap();
    assert_eq!(seen.last(), Some(&1.0));
    assert_eq!(index.source_len(), data.len() as u64);

    let on_disk = std::fs::read(file.path()).unwrap();
    for ordinal in 0..index.entry_count() {
        let range = index.byte_range(ordinal).unwrap();
        let slice = &on_disk[range.start as usize..range.end as usize];
        let value: serde_json::Value = serde_json::from_slice(slice).unwrap();
        assert_eq!(value["MESSAGE"], index.get_entry(ordinal).unwrap().message);
    }
}

#[tokio::test]
async fn test_skip_policy_keeps_ordinals_dense() {
    let good = json_journal(&["alpha", "beta"]);
    let mut lines = good.lines();
    let data = format!(
        "{}\n{{\"MESSAGE\":\"no timestamp\"}}\n{{broken\n{}\n",
        lines.next().unwrap(),
        lines.next().unwrap()
    );

    let err = build(data.as_bytes(), None, &IndexConfig::default(), &mut |_| {}, None)
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::Entry { .. }));

    let config = IndexConfig::builder()
        .malformed_entry_policy(MalformedEntryPolicy::Skip)
        .build()
        .unwrap();
    let index = index_of(&data, &config).await;
    assert_eq!(index.entry_count(), 2);
    assert_eq!(index.stats().skipped_records, 2);
    assert_eq!(search(&index, "beta").await, Outcome::Complete(vec![1]));
}

#[tokio::test]
async fn test_empty_input() {
    let index = index_of("", &IndexConfig::default()).await;
    assert_eq!(index.entry_count(), 0);
    assert_eq!(search(&index, "anything").await, Outcome::Complete(vec![]));
    assert_eq!(search(&index, "a").await, Outcome::Complete(vec![]));
}
