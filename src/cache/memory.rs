//! In-memory response cache with per-entry expiry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use crate::config::CacheSettings;

/// Every time the cache size reaches a multiple of this after a store,
/// expired entries are swept.
pub const CLEANUP_BATCH: usize = 100;

/// A cached value and its validity window.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub value: T,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
  /// Create an entry valid for `ttl` from `now`. Non-positive TTLs are
  /// clamped to one millisecond; a TTL reaching past the representable range
  /// saturates to the latest representable instant.
  pub fn new(value: T, now: DateTime<Utc>, ttl: Duration) -> Self {
    let ttl = ttl.max(Duration::milliseconds(1));
    Self {
      value,
      created_at: now,
      expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
  }

  pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
    now < self.expires_at
  }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
  pub total_entries: usize,
  pub valid_entries: usize,
  pub expired_entries: usize,
}

/// Concurrent key/value cache holding serialized response payloads.
///
/// Entries expire lazily: an expired entry is dropped when it is next read,
/// or by the periodic sweep triggered from [`ResponseCache::store`]. All
/// operations take `&self` and are safe to call from any number of tasks.
pub struct ResponseCache {
  entries: DashMap<String, CacheEntry<String>>,
  settings: CacheSettings,
  clock: Arc<dyn Clock>,
}

impl ResponseCache {
  pub fn new(settings: CacheSettings) -> Self {
    Self::with_clock(settings, Arc::new(SystemClock))
  }

  pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: DashMap::new(),
      settings,
      clock,
    }
  }

  pub fn settings(&self) -> &CacheSettings {
    &self.settings
  }

  /// Store `value` under `key`, replacing any previous entry.
  ///
  /// Uses the configured default TTL when `ttl` is `None`. Does nothing when
  /// caching is disabled.
  pub fn store(&self, key: &str, value: String, ttl: Option<Duration>) {
    if !self.settings.enabled {
      return;
    }

    let ttl = ttl.unwrap_or_else(|| self.settings.default_ttl());
    let entry = CacheEntry::new(value, self.clock.now(), ttl);
    self.entries.insert(key.to_string(), entry);

    if self.entries.len() % CLEANUP_BATCH == 0 {
      self.cleanup_expired();
    }
  }

  /// Get the value stored under `key` if it has not expired.
  pub fn retrieve(&self, key: &str) -> Option<String> {
    if !self.settings.enabled {
      return None;
    }

    let now = self.clock.now();
    {
      let entry = self.entries.get(key)?;
      if entry.is_valid(now) {
        return Some(entry.value.clone());
      }
    }

    self.evict_expired(key, now);
    None
  }

  /// Whether a valid entry exists for `key`.
  pub fn exists(&self, key: &str) -> bool {
    if !self.settings.enabled {
      return false;
    }

    let now = self.clock.now();
    let valid = match self.entries.get(key) {
      Some(entry) => entry.is_valid(now),
      None => return false,
    };

    if !valid {
      self.evict_expired(key, now);
    }
    valid
  }

  pub fn remove(&self, key: &str) {
    self.entries.remove(key);
  }

  pub fn clear_all(&self) {
    self.entries.clear();
  }

  /// Drop every entry that has expired.
  pub fn cleanup_expired(&self) {
    let now = self.clock.now();
    let before = self.entries.len();
    self.entries.retain(|_, entry| entry.is_valid(now));

    let removed = before.saturating_sub(self.entries.len());
    if removed > 0 {
      tracing::debug!(removed, "Swept expired cache entries");
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn stats(&self) -> CacheStats {
    let now = self.clock.now();
    let mut stats = CacheStats::default();
    for entry in self.entries.iter() {
      stats.total_entries += 1;
      if entry.is_valid(now) {
        stats.valid_entries += 1;
      } else {
        stats.expired_entries += 1;
      }
    }
    stats
  }

  /// Remove `key` only if the entry is still expired. A concurrent store may
  /// have replaced it with a fresh one since it was read.
  fn evict_expired(&self, key: &str, now: DateTime<Utc>) {
    self.entries.remove_if(key, |_, entry| !entry.is_valid(now));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::ManualClock;

  fn cache_at(millis: i64) -> (ResponseCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_millis(millis));
    let cache = ResponseCache::with_clock(CacheSettings::default(), clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_store_then_retrieve() {
    let (cache, _clock) = cache_at(0);
    cache.store("k", "v".to_string(), Some(Duration::milliseconds(1000)));

    assert_eq!(cache.retrieve("k"), Some("v".to_string()));
    assert!(cache.exists("k"));
  }

  #[test]
  fn test_entry_expires_after_ttl() {
    let (cache, clock) = cache_at(0);
    cache.store("k", "v".to_string(), Some(Duration::milliseconds(1000)));

    clock.advance(Duration::milliseconds(999));
    assert_eq!(cache.retrieve("k"), Some("v".to_string()));

    clock.advance(Duration::milliseconds(2));
    assert_eq!(cache.retrieve("k"), None);
    assert!(!cache.exists("k"));
    assert!(cache.is_empty());
  }

  #[test]
  fn test_expiry_is_exclusive_at_boundary() {
    let (cache, clock) = cache_at(0);
    cache.store("k", "v".to_string(), Some(Duration::milliseconds(1000)));

    clock.advance(Duration::milliseconds(1000));
    assert!(!cache.exists("k"));
  }

  #[test]
  fn test_default_ttl_used() {
    let clock = Arc::new(ManualClock::at_millis(0));
    let settings = CacheSettings {
      default_ttl_ms: 50,
      ..CacheSettings::default()
    };
    let cache = ResponseCache::with_clock(settings, clock.clone());

    cache.store("k", "v".to_string(), None);
    clock.advance(Duration::milliseconds(49));
    assert!(cache.exists("k"));
    clock.advance(Duration::milliseconds(1));
    assert!(!cache.exists("k"));
  }

  #[test]
  fn test_store_overwrites() {
    let (cache, _clock) = cache_at(0);
    cache.store("k", "old".to_string(), None);
    cache.store("k", "new".to_string(), None);

    assert_eq!(cache.retrieve("k"), Some("new".to_string()));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_zero_ttl_is_clamped() {
    let now = Utc::now();
    let entry = CacheEntry::new("v", now, Duration::zero());
    assert!(entry.expires_at > entry.created_at);
  }

  #[test]
  fn test_huge_ttl_saturates() {
    let (cache, clock) = cache_at(0);
    cache.store("k", "v".to_string(), Some(Duration::milliseconds(i64::MAX / 2)));
    cache.store("max", "v".to_string(), Some(Duration::MAX));

    clock.advance(Duration::days(365 * 1000));
    assert_eq!(cache.retrieve("k"), Some("v".to_string()));
    assert!(cache.exists("max"));
  }

  #[test]
  fn test_out_of_range_default_ttl() {
    let clock = Arc::new(ManualClock::at_millis(0));
    let huge = CacheSettings {
      default_ttl_ms: i64::MAX,
      ..CacheSettings::default()
    };
    let cache = ResponseCache::with_clock(huge, clock.clone());
    cache.store("k", "v".to_string(), None);
    assert_eq!(cache.retrieve("k"), Some("v".to_string()));

    let negative = CacheSettings {
      default_ttl_ms: i64::MIN,
      ..CacheSettings::default()
    };
    let cache = ResponseCache::with_clock(negative, clock.clone());
    cache.store("k", "v".to_string(), None);
    assert!(cache.exists("k"));
    clock.advance(Duration::milliseconds(1));
    assert!(!cache.exists("k"));
  }

  #[test]
  fn test_disabled_cache_is_noop() {
    let cache = ResponseCache::new(CacheSettings::disabled());
    cache.store("k", "v".to_string(), None);

    assert!(cache.is_empty());
    assert_eq!(cache.retrieve("k"), None);
    assert!(!cache.exists("k"));
  }

  #[test]
  fn test_remove_and_clear() {
    let (cache, _clock) = cache_at(0);
    cache.store("a", "1".to_string(), None);
    cache.store("b", "2".to_string(), None);

    cache.remove("a");
    assert!(!cache.exists("a"));
    assert!(cache.exists("b"));

    cache.clear_all();
    assert!(cache.is_empty());
  }

  #[test]
  fn test_hundredth_store_sweeps_expired() {
    let (cache, clock) = cache_at(0);

    for i in 1..=100 {
      if i == 37 {
        cache.store(&format!("key-{}", i), i.to_string(), Some(Duration::milliseconds(50)));
        // Entry 37 has expired by the time the remaining entries go in
        clock.set_millis(100);
      } else {
        cache.store(&format!("key-{}", i), i.to_string(), None);
      }

      if i == 99 {
        // Not yet swept: expired entries are only dropped lazily
        assert_eq!(cache.stats().expired_entries, 1);
      }
    }

    assert_eq!(cache.len(), 99);
    assert_eq!(
      cache.stats(),
      CacheStats {
        total_entries: 99,
        valid_entries: 99,
        expired_entries: 0,
      }
    );
    assert!(!cache.exists("key-37"));
    assert!(cache.exists("key-36"));
    assert!(cache.exists("key-100"));
  }

  #[test]
  fn test_concurrent_stores_on_distinct_keys() {
    let cache = Arc::new(ResponseCache::new(CacheSettings::default()));

    let handles: Vec<_> = (0..8)
      .map(|t| {
        let cache = Arc::clone(&cache);
        std::thread::spawn(move || {
          for i in 0..50 {
            let key = format!("t{}-{}", t, i);
            cache.store(&key, key.clone(), None);
            assert_eq!(cache.retrieve(&key), Some(key.clone()));
          }
        })
      })
      .collect();

    for handle in handles {
      handle.join().unwrap();
    }

    assert_eq!(cache.len(), 400);
  }

  #[test]
  fn test_racing_store_and_remove_never_tears() {
    let cache = Arc::new(ResponseCache::new(CacheSettings::default()));

    let writer = {
      let cache = Arc::clone(&cache);
      std::thread::spawn(move || {
        for i in 0..500 {
          if i % 2 == 0 {
            cache.store("shared", "a".repeat(64), None);
          } else {
            cache.remove("shared");
          }
        }
      })
    };

    for _ in 0..500 {
      if let Some(value) = cache.retrieve("shared") {
        assert_eq!(value, "a".repeat(64));
      }
    }

    writer.join().unwrap();
  }
}
