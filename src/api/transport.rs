//! HTTP transport abstraction and its reqwest implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::error::RemoteError;

/// Tag recorded in log fields for responses served from the response cache.
/// The marker callers inspect is [`ApiResponse::from_cache`].
pub const CACHE_MARKER_TAG: &str = "x-cached";

/// A request against the catalog service.
#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  /// Path relative to the service base url, e.g. `/api/v3/lego/sets/`
  pub path: String,
  /// Query parameters; `None` values are not sent
  pub query: Vec<(String, Option<String>)>,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::GET,
      path: path.into(),
      query: Vec::new(),
    }
  }

  /// Add a query parameter. A `None` value is kept in the request but not sent.
  pub fn param(mut self, name: &str, value: Option<impl ToString>) -> Self {
    self.query.push((name.to_string(), value.map(|v| v.to_string())));
    self
  }

  pub fn is_idempotent_read(&self) -> bool {
    self.method == Method::GET
  }
}

/// Response body and status, plus whether it was served from cache.
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub body: String,
  /// Cache-origin marker: `true` when no network call was made
  pub from_cache: bool,
}

impl ApiResponse {
  pub fn network(status: u16, body: String) -> Self {
    Self {
      status,
      body,
      from_cache: false,
    }
  }

  pub fn cached(body: String) -> Self {
    Self {
      status: 200,
      body,
      from_cache: true,
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Something that can execute an [`ApiRequest`].
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
    (**self).send(request).await
  }
}

/// Transport backed by a reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self, RemoteError> {
    let base_url =
      Url::parse(&config.base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;

    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
      let value = HeaderValue::from_str(&format!("key {}", key))
        .map_err(|e| RemoteError::Transport(format!("invalid api key header: {}", e)))?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Ok(Self { client, base_url })
  }

  fn url_for(&self, request: &ApiRequest) -> Result<Url, RemoteError> {
    let mut url = self
      .base_url
      .join(&request.path)
      .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", request.path, e)))?;

    let present: Vec<(&str, &str)> = request
      .query
      .iter()
      .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
      .collect();
    if !present.is_empty() {
      url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url)
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
    let url = self.url_for(request)?;
    tracing::debug!(method = %request.method, %url, "Sending catalog request");

    let response = self
      .client
      .request(request.method.clone(), url)
      .send()
      .await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    Ok(ApiResponse::network(status, body))
  }
}
