//! End-to-end cache scenarios against a real directory and a pinned clock

use std::cell::Cell;
use std::convert::Infallible;
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use gundem::cache::{CacheEntry, CacheStore, ManualClock};
use serde_json::{json, Value};
use tempfile::TempDir;

const FIFTEEN_MINUTES: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, PartialEq)]
struct ConnectionError;

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection refused")
    }
}

impl std::error::Error for ConnectionError {}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 20)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn setup() -> (CacheStore, Arc<ManualClock>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = CacheStore::with_dir(temp_dir.path()).with_clock(clock.clone());
    (cache, clock, temp_dir)
}

#[test]
fn test_exchange_rates_are_served_fresh_then_refreshed() {
    let (cache, clock, _temp_dir) = setup();
    let calls = Cell::new(0);

    let first: Value = cache
        .get(
            "exchange_rates.json",
            || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(json!({"USDTRY": 32.1}))
            },
            FIFTEEN_MINUTES,
        )
        .unwrap();
    assert_eq!(first, json!({"USDTRY": 32.1}));

    clock.advance(Duration::from_secs(10 * 60));
    let cached: Value = cache
        .get(
            "exchange_rates.json",
            || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(json!({"USDTRY": 99.9}))
            },
            FIFTEEN_MINUTES,
        )
        .unwrap();
    assert_eq!(cached, json!({"USDTRY": 32.1}));
    assert_eq!(calls.get(), 1);

    clock.advance(Duration::from_secs(6 * 60));
    let refreshed: Value = cache
        .get(
            "exchange_rates.json",
            || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(json!({"USDTRY": 32.4}))
            },
            FIFTEEN_MINUTES,
        )
        .unwrap();
    assert_eq!(refreshed, json!({"USDTRY": 32.4}));
    assert_eq!(calls.get(), 2);

    let entry: CacheEntry<Value> = cache.read_entry("exchange_rates.json").unwrap().unwrap();
    assert_eq!(entry.timestamp, t0() + chrono::Duration::minutes(16));
    assert_eq!(entry.data, json!({"USDTRY": 32.4}));
}

#[test]
fn test_connection_error_propagates_and_keeps_stale_record() {
    let (cache, clock, _temp_dir) = setup();
    cache.store("exchange_rates.json", &json!({"USDTRY": 32.1})).unwrap();
    let path = cache.slot_path("exchange_rates.json");
    let before = fs::read(&path).unwrap();

    clock.advance(Duration::from_secs(60 * 60));
    let result: Result<Value, ConnectionError> =
        cache.get("exchange_rates.json", || Err(ConnectionError), FIFTEEN_MINUTES);

    assert_eq!(result, Err(ConnectionError));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_record_written_by_older_tooling_is_read() {
    let (cache, _clock, temp_dir) = setup();
    fs::write(
        temp_dir.path().join("weather.json"),
        r#"{
    "timestamp": "2024-05-20T08:50:00.123456",
    "data": [["12:00", 24.3, "Açık", "https://openweathermap.org/img/wn/01d@2x.png", "sunny"]]
}"#,
    )
    .unwrap();

    let data: Value = cache
        .get("weather.json", || Err::<Value, _>(ConnectionError), FIFTEEN_MINUTES)
        .unwrap();

    assert_eq!(data[0][2], json!("Açık"));
}

#[test]
fn test_corrupt_record_is_replaced_with_valid_one() {
    let (cache, _clock, temp_dir) = setup();
    let path = temp_dir.path().join("movies.json");
    fs::write(&path, "{ this is not json").unwrap();

    let movies: Vec<String> = cache
        .get("movies.json", || Ok::<_, Infallible>(vec!["Dune".to_string()]), FIFTEEN_MINUTES)
        .unwrap();

    assert_eq!(movies, vec!["Dune".to_string()]);
    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["data"], json!(["Dune"]));
    assert_eq!(raw["timestamp"], json!("2024-05-20T09:00:00"));
}
