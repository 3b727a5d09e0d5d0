use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::transport::{ApiRequest, Transport};
use super::types::{ApiSet, ApiTheme, Page, SetQuery, ThemeQuery};
use crate::error::RemoteError;

const SETS_PATH: &str = "/api/v3/lego/sets/";
const THEMES_PATH: &str = "/api/v3/lego/themes/";

/// Remote operations the catalog repositories depend on.
#[async_trait]
pub trait CatalogApi: Send + Sync {
  async fn list_sets(&self, query: &SetQuery) -> Result<Page<ApiSet>, RemoteError>;

  async fn get_set(&self, set_num: &str) -> Result<ApiSet, RemoteError>;

  async fn list_themes(&self, query: &ThemeQuery) -> Result<Page<ApiTheme>, RemoteError>;

  async fn get_theme(&self, id: i64) -> Result<ApiTheme, RemoteError>;
}

/// Rebrickable catalog client
#[derive(Clone)]
pub struct RebrickableClient {
  transport: Arc<dyn Transport>,
}

impl RebrickableClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, RemoteError> {
    let response = self.transport.send(&request).await?;
    if !response.is_success() {
      return Err(RemoteError::from_status(response.status, response.body));
    }

    Ok(serde_json::from_str(&response.body)?)
  }
}

#[async_trait]
impl CatalogApi for RebrickableClient {
  /// Get one page of sets matching the query
  async fn list_sets(&self, query: &SetQuery) -> Result<Page<ApiSet>, RemoteError> {
    let request = ApiRequest::get(SETS_PATH)
      .param("page", query.page)
      .param("page_size", query.page_size)
      .param("ordering", query.ordering.as_deref())
      .param("theme_id", query.theme_id)
      .param("min_year", query.min_year)
      .param("max_year", query.max_year)
      .param("min_parts", query.min_parts)
      .param("max_parts", query.max_parts)
      .param("search", query.search.as_deref());

    self.get_json(request).await
  }

  /// Get details for a single set
  async fn get_set(&self, set_num: &str) -> Result<ApiSet, RemoteError> {
    self
      .get_json(ApiRequest::get(format!("{}{}/", SETS_PATH, set_num)))
      .await
  }

  async fn list_themes(&self, query: &ThemeQuery) -> Result<Page<ApiTheme>, RemoteError> {
    let request = ApiRequest::get(THEMES_PATH)
      .param("page", query.page)
      .param("page_size", query.page_size)
      .param("ordering", query.ordering.as_deref());

    self.get_json(request).await
  }

  async fn get_theme(&self, id: i64) -> Result<ApiTheme, RemoteError> {
    self
      .get_json(ApiRequest::get(format!("{}{}/", THEMES_PATH, id)))
      .await
  }
}
