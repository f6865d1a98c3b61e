//! Cache store for persisting fetched payloads to disk
//!
//! Provides a `CacheStore` that keeps one JSON record per key, stamped with the time the
//! payload was produced, and refreshes it through a caller-supplied fetch function once
//! the record is older than the caller's ttl.

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};

/// Extension every cache record carries on disk
const RECORD_EXTENSION: &str = ".json";

/// Distinguishes temporary files written concurrently from the same process
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A cached payload together with the local time it was produced
///
/// Serializes to exactly `{"timestamp": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the payload was fetched (local time, no offset)
    pub timestamp: NaiveDateTime,
    /// The payload returned by the fetch function
    pub data: T,
}

impl<T> CacheEntry<T> {
    /// Whether this entry may still be served at `now` under `ttl`
    pub fn is_fresh(&self, now: NaiveDateTime, ttl: Duration) -> bool {
        is_fresh(self.timestamp, now, ttl)
    }
}

/// Freshness predicate: `now < timestamp + ttl`
///
/// A ttl too large to add to `timestamp` never expires; a zero ttl is never fresh.
pub fn is_fresh(timestamp: NaiveDateTime, now: NaiveDateTime, ttl: Duration) -> bool {
    if ttl.is_zero() {
        return false;
    }
    match chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| timestamp.checked_add_signed(ttl))
    {
        Some(expires_at) => now < expires_at,
        None => true,
    }
}

/// Maps a cache key to a file name inside the cache root
///
/// Bytes outside `[A-Za-z0-9._-]`, a leading dot, and `%` itself are written as `%XX`,
/// so distinct keys get distinct files and no key can name a path outside the root.
/// The empty key maps to `%.json`. `.json` is appended unless already present, which
/// makes `"weather"` and `"weather.json"` share a slot.
pub fn slot_name(key: &str) -> String {
    let mut base = String::with_capacity(key.len() + RECORD_EXTENSION.len());
    for (index, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'_' | b'-')
            || (byte == b'.' && index > 0);
        if keep {
            base.push(char::from(byte));
        } else {
            base.push_str(&format!("%{:02X}", byte));
        }
    }
    if base.is_empty() {
        base.push('%');
    }

    if !(base.ends_with(RECORD_EXTENSION) && base.len() > RECORD_EXTENSION.len()) {
        base.push_str(RECORD_EXTENSION);
    }
    base
}

/// XDG-compliant cache directory for this application, if a home directory exists
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gundem").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Errors raised while reading or writing cache records
///
/// None of these reach callers of [`CacheStore::get`]; they are logged there.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The record exists but could not be read
    #[error("failed to read cache record {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record is not valid JSON or lacks `timestamp`/`data`
    #[error("malformed cache record {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache directory or record could not be written
    #[error("failed to write cache record {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The payload could not be serialized
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of looking up a key against a ttl
#[derive(Debug)]
pub enum Lookup<T> {
    /// A fresh payload
    Hit(T),
    /// An entry exists but is past its ttl
    Stale(CacheEntry<T>),
    /// No record for this key
    Miss,
    /// A record exists but cannot be used
    Corrupt(CacheError),
}

/// Reads and writes cache records under a single cache directory
///
/// One JSON file per key. The directory is created lazily on the first write.
/// Concurrent callers on the same key are not coordinated: both may fetch, and the
/// last completed write wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache records are stored
    cache_dir: PathBuf,
    /// Time source for freshness checks and new timestamps
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Creates a CacheStore in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/gundem/` on Linux, or the platform equivalent.
    /// Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        default_cache_dir().map(Self::with_dir)
    }

    /// Creates a CacheStore rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Directory holding the cache records
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the record backing `key`
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(slot_name(key))
    }

    /// Returns a payload no older than `ttl`, fetching and persisting a new one otherwise
    ///
    /// # Arguments
    /// * `key` - Logical resource name, e.g. `"weather.json"`
    /// * `fetch` - Produces the authoritative value; only called on miss, expiry or corruption
    /// * `ttl` - How long a stored payload may be served
    ///
    /// # Returns
    /// * `Ok(T)` - The cached payload, or the freshly fetched one
    /// * `Err(E)` - The fetch function's own error; nothing is written in that case
    pub fn get<T, E, F>(&self, key: &str, fetch: F, ttl: Duration) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(data) = self.serve_fresh(key, ttl) {
            return Ok(data);
        }

        info!(key, "fetching fresh data");
        let data = fetch()?;
        self.persist(key, &data);
        Ok(data)
    }

    /// Async counterpart of [`CacheStore::get`] for fetchers that perform async I/O
    pub async fn get_async<T, E, F, Fut>(&self, key: &str, fetch: F, ttl: Duration) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.serve_fresh(key, ttl) {
            return Ok(data);
        }

        info!(key, "fetching fresh data");
        let data = fetch().await?;
        self.persist(key, &data);
        Ok(data)
    }

    /// Classifies the stored record for `key` against `ttl` without fetching
    pub fn lookup<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Lookup<T> {
        match self.read_entry::<T>(key) {
            Ok(Some(entry)) if entry.is_fresh(self.clock.now(), ttl) => Lookup::Hit(entry.data),
            Ok(Some(entry)) => Lookup::Stale(entry),
            Ok(None) => Lookup::Miss,
            Err(err) => Lookup::Corrupt(err),
        }
    }

    /// Reads the record for `key`
    ///
    /// # Returns
    /// * `Ok(None)` if no record exists
    /// * `Ok(Some(entry))` if the record parses as `CacheEntry<T>`
    /// * `Err(CacheError)` if the record is unreadable or malformed
    pub fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        let path = self.slot_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Malformed { path, source })
    }

    /// Writes `data` as the record for `key`, stamped with the current time
    ///
    /// The record is written to a temporary file in the cache directory and renamed
    /// over the slot, so readers never observe a half-written record.
    pub fn store<T: Serialize>(&self, key: &str, data: &T) -> Result<NaiveDateTime, CacheError> {
        let timestamp = self.clock.now();
        let json = serde_json::to_string_pretty(&CacheEntry { timestamp, data })?;

        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Write {
            path: self.cache_dir.clone(),
            source,
        })?;

        let path = self.slot_path(key);
        let tmp_path = self.cache_dir.join(format!(
            ".{}.{}.{}.tmp",
            slot_name(key),
            process::id(),
            TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(source) = fs::write(&tmp_path, json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::Write { path: tmp_path, source });
        }
        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::Write { path, source });
        }

        Ok(timestamp)
    }

    fn serve_fresh<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        match self.lookup(key, ttl) {
            Lookup::Hit(data) => {
                debug!(key, "cache hit");
                Some(data)
            }
            Lookup::Stale(entry) => {
                info!(key, cached_at = %entry.timestamp, "cache entry expired");
                None
            }
            Lookup::Miss => {
                debug!(key, "cache miss");
                None
            }
            Lookup::Corrupt(err) => {
                warn!(key, error = %err, "unusable cache record, refetching");
                None
            }
        }
    }

    fn persist<T: Serialize>(&self, key: &str, data: &T) {
        match self.store(key, data) {
            Ok(_) => debug!(key, "cache record written"),
            Err(err) => warn!(key, error = %err, "failed to persist cache record"),
        }
    }
}
