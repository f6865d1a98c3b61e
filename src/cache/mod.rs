//! TTL file cache for slow or rate-limited data sources
//!
//! Each logical resource (e.g. `"weather.json"`) maps to one JSON record under a cache
//! root. `CacheStore::get` serves the record while it is fresher than the caller's ttl
//! and otherwise runs the caller's fetch function, persisting its result. Fetch errors
//! go back to the caller untouched; storage problems are logged and never fail a call.

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{default_cache_dir, is_fresh, slot_name, CacheEntry, CacheError, CacheStore, Lookup};
