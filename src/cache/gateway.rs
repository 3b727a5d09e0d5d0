//! Cache-aside wrapper around a [`Transport`].

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::key;
use super::memory::ResponseCache;
use crate::api::transport::{ApiRequest, ApiResponse, Transport, CACHE_MARKER_TAG};
use crate::error::RemoteError;

/// Transport decorator that answers repeated read requests from a
/// [`ResponseCache`].
///
/// Only `GET` requests are cached; everything else goes straight to the inner
/// transport. Caching is best effort: when a response cannot be cached the
/// network response is still returned unchanged.
pub struct CachingGateway<T: Transport> {
  inner: T,
  cache: Arc<ResponseCache>,
  hits: AtomicU64,
  misses: AtomicU64,
}

impl<T: Transport> CachingGateway<T> {
  pub fn new(inner: T, cache: Arc<ResponseCache>) -> Self {
    Self {
      inner,
      cache,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    }
  }

  pub fn cache(&self) -> &Arc<ResponseCache> {
    &self.cache
  }

  pub fn hits(&self) -> u64 {
    self.hits.load(Ordering::Relaxed)
  }

  pub fn misses(&self) -> u64 {
    self.misses.load(Ordering::Relaxed)
  }

  /// Cache key for a request: its canonical form condensed with the
  /// configured digest.
  pub fn cache_key(&self, request: &ApiRequest) -> String {
    let canonical = key::canonical_key(&request.path, request.query.iter().cloned());
    key::hash(&canonical, self.cache.settings().key_digest)
  }

  fn try_populate(&self, cache_key: &str, response: &ApiResponse) {
    if !response.is_success() {
      return;
    }

    let settings = self.cache.settings();
    if !settings.enabled {
      return;
    }
    if response.body.len() > settings.max_entry_bytes {
      tracing::debug!(
        size = response.body.len(),
        limit = settings.max_entry_bytes,
        "Response too large to cache"
      );
      return;
    }

    self.cache.store(cache_key, response.body.clone(), None);
  }
}

#[async_trait]
impl<T: Transport> Transport for CachingGateway<T> {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
    if !request.is_idempotent_read() {
      return self.inner.send(request).await;
    }

    let cache_key = self.cache_key(request);

    if let Some(body) = self.cache.retrieve(&cache_key) {
      self.hits.fetch_add(1, Ordering::Relaxed);
      tracing::debug!(path = %request.path, marker = CACHE_MARKER_TAG, "Response cache hit");
      return Ok(ApiResponse::cached(body));
    }

    self.misses.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(path = %request.path, "Response cache miss");

    let response = self.inner.send(request).await?;
    self.try_populate(&cache_key, &response);

    Ok(response)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::ManualClock;
  use crate::config::CacheSettings;
  use chrono::Duration;
  use reqwest::Method;
  use std::sync::Mutex;

  /// Transport that records calls and answers with a fixed response.
  struct FakeTransport {
    calls: Mutex<Vec<String>>,
    status: u16,
    body: String,
  }

  impl FakeTransport {
    fn new(status: u16, body: &str) -> Self {
      Self {
        calls: Mutex::new(Vec::new()),
        status,
        body: body.to_string(),
      }
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
      self.calls.lock().unwrap().push(request.path.clone());
      Ok(ApiResponse::network(self.status, self.body.clone()))
    }
  }

  struct FailingTransport;

  #[async_trait]
  impl Transport for FailingTransport {
    async fn send(&self, _request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
      Err(RemoteError::Timeout)
    }
  }

  fn gateway(
    settings: CacheSettings,
    status: u16,
    body: &str,
  ) -> (CachingGateway<Arc<FakeTransport>>, Arc<FakeTransport>, Arc<ManualClock>) {
    let fake = Arc::new(FakeTransport::new(status, body));
    let clock = Arc::new(ManualClock::at_millis(0));
    let cache = Arc::new(ResponseCache::with_clock(settings, clock.clone()));
    (CachingGateway::new(fake.clone(), cache), fake, clock)
  }

  fn sets_request(params: &[(&str, &str)]) -> ApiRequest {
    params
      .iter()
      .fold(ApiRequest::get("/sets/"), |req, (name, value)| {
        req.param(name, Some(*value))
      })
  }

  #[tokio::test]
  async fn test_permuted_params_hit_cache() {
    let (gateway, fake, _clock) = gateway(CacheSettings::default(), 200, r#"{"count":0}"#);

    let first = gateway
      .send(&sets_request(&[("page", "1"), ("page_size", "5")]))
      .await
      .unwrap();
    assert!(!first.from_cache);

    let second = gateway
      .send(&sets_request(&[("page_size", "5"), ("page", "1")]))
      .await
      .unwrap();
    assert!(second.from_cache);
    assert_eq!(second.status, 200);
    assert_eq!(second.body, r#"{"count":0}"#);

    assert_eq!(fake.call_count(), 1);
    assert_eq!(gateway.hits(), 1);
    assert_eq!(gateway.misses(), 1);
  }

  #[tokio::test]
  async fn test_expired_entry_refetches() {
    let (gateway, fake, clock) = gateway(CacheSettings::memory_only(), 200, "[]");
    let request = sets_request(&[("page", "1")]);

    gateway.send(&request).await.unwrap();
    clock.advance(Duration::minutes(5));
    let again = gateway.send(&request).await.unwrap();

    assert!(!again.from_cache);
    assert_eq!(fake.call_count(), 2);
  }

  #[tokio::test]
  async fn test_error_status_not_cached() {
    let (gateway, fake, _clock) = gateway(CacheSettings::default(), 500, "boom");
    let request = sets_request(&[("page", "1")]);

    let first = gateway.send(&request).await.unwrap();
    assert_eq!(first.status, 500);
    gateway.send(&request).await.unwrap();

    assert_eq!(fake.call_count(), 2);
    assert!(gateway.cache().is_empty());
  }

  #[tokio::test]
  async fn test_non_get_bypasses_cache() {
    let (gateway, fake, _clock) = gateway(CacheSettings::default(), 200, "{}");
    let request = ApiRequest {
      method: Method::POST,
      ..sets_request(&[])
    };

    gateway.send(&request).await.unwrap();
    gateway.send(&request).await.unwrap();

    assert_eq!(fake.call_count(), 2);
    assert!(gateway.cache().is_empty());
  }

  #[tokio::test]
  async fn test_disabled_cache_passes_through() {
    let (gateway, fake, _clock) = gateway(CacheSettings::disabled(), 200, "{}");
    let request = sets_request(&[("page", "1")]);

    gateway.send(&request).await.unwrap();
    let second = gateway.send(&request).await.unwrap();

    assert!(!second.from_cache);
    assert_eq!(fake.call_count(), 2);
  }

  #[tokio::test]
  async fn test_oversize_body_served_but_not_cached() {
    let settings = CacheSettings {
      max_entry_bytes: 4,
      ..CacheSettings::default()
    };
    let (gateway, fake, _clock) = gateway(settings, 200, "0123456789");
    let request = sets_request(&[]);

    let response = gateway.send(&request).await.unwrap();
    assert_eq!(response.body, "0123456789");
    gateway.send(&request).await.unwrap();

    assert_eq!(fake.call_count(), 2);
  }

  #[tokio::test]
  async fn test_boundary_ttls_still_serve_responses() {
    for default_ttl_ms in [i64::MAX, i64::MIN, 0] {
      let settings = CacheSettings {
        default_ttl_ms,
        ..CacheSettings::default()
      };
      let (gateway, fake, _clock) = gateway(settings, 200, "[]");
      let request = sets_request(&[("page", "1")]);

      let first = gateway.send(&request).await.unwrap();
      assert_eq!(first.body, "[]");
      assert!(!first.from_cache);

      let second = gateway.send(&request).await.unwrap();
      assert!(second.from_cache);
      assert_eq!(fake.call_count(), 1);
    }
  }

  #[tokio::test]
  async fn test_transport_error_propagates() {
    let cache = Arc::new(ResponseCache::new(CacheSettings::default()));
    let gateway = CachingGateway::new(FailingTransport, cache);

    let result = gateway.send(&sets_request(&[("page", "1")])).await;
    assert!(matches!(result, Err(RemoteError::Timeout)));
    assert!(gateway.cache().is_empty());
  }

  #[test]
  fn test_sanitized_digest_key() {
    let settings = CacheSettings {
      key_digest: crate::cache::KeyDigest::Sanitized,
      ..CacheSettings::default()
    };
    let (gateway, _fake, _clock) = gateway(settings, 200, "{}");

    let key = gateway.cache_key(&sets_request(&[("page_size", "5"), ("page", "1")]));
    assert_eq!(key, "_sets__page_1_page_size_5");
  }
}
