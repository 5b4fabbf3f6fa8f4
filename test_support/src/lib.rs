//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Common test fixtures for all crates

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Name that is unique within this process and across concurrent test runs
pub fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}_{}", prefix, std::process::id(), nanos, seq)
}

/// Helper for creating temporary directories in tests
pub fn temp_dir_path() -> PathBuf {
    std::env::temp_dir().join("lyrica-test")
}

/// Path for a throwaway SQLite database file
pub fn temp_db_path(prefix: &str) -> String {
    let dir = temp_dir_path();
    let _ = std::fs::create_dir_all(&dir);
    dir.join(format!("{}.db", unique_name(prefix)))
        .to_string_lossy()
        .into_owned()
}

/// Deezer `/search` payload with `count` tracks
pub fn deezer_search_fixture(count: usize) -> serde_json::Value {
    let data: Vec<_> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": 1000 + i,
                "title": format!("Track {}", i),
                "preview": format!("https://cdn.example/preview/{}.mp3", i),
                "artist": { "name": format!("Artist {}", i) },
                "album": {
                    "title": format!("Album {}", i),
                    "cover_medium": format!("https://cdn.example/cover/{}.jpg", i)
                }
            })
        })
        .collect();
    serde_json::json!({ "data": data, "total": count })
}
