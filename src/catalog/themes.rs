use chrono::Utc;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{info, warn};

use super::observe::watch_query;
use super::types::ThemeEntity;
use crate::api::client::CatalogApi;
use crate::api::types::ThemeQuery;
use crate::db::{Database, ThemeFilter};
use crate::error::{CatalogError, RemoteError};

/// Reconciles locally stored themes with the remote catalog.
#[derive(Clone)]
pub struct ThemeRepository {
  api: Arc<dyn CatalogApi>,
  db: Arc<Database>,
}

impl ThemeRepository {
  pub fn new(api: Arc<dyn CatalogApi>, db: Arc<Database>) -> Self {
    Self { api, db }
  }

  pub fn observe_all(&self) -> BoxStream<'static, Vec<ThemeEntity>> {
    self.observe(ThemeFilter::All)
  }

  /// Top-level themes only
  pub fn observe_roots(&self) -> BoxStream<'static, Vec<ThemeEntity>> {
    self.observe(ThemeFilter::Roots)
  }

  pub fn observe_children(&self, parent_id: i64) -> BoxStream<'static, Vec<ThemeEntity>> {
    self.observe(ThemeFilter::Children(parent_id))
  }

  pub fn observe_search(&self, query: &str) -> BoxStream<'static, Vec<ThemeEntity>> {
    self.observe(ThemeFilter::Search(query.to_string()))
  }

  pub fn observe(&self, filter: ThemeFilter) -> BoxStream<'static, Vec<ThemeEntity>> {
    let db = Arc::clone(&self.db);
    watch_query(self.db.subscribe_themes(), move || {
      db.list_themes(&filter).unwrap_or_else(|e| {
        warn!(?filter, "Failed to read themes: {:#}", e);
        Vec::new()
      })
    })
  }

  pub fn get_by_id(&self, id: i64) -> Option<ThemeEntity> {
    self.db.get_theme(id).unwrap_or_else(|e| {
      warn!(id, "Failed to read theme: {:#}", e);
      None
    })
  }

  /// Fetch one page of themes and upsert it.
  pub async fn refresh(&self, query: &ThemeQuery) -> Result<usize, CatalogError> {
    let page = self.api.list_themes(query).await?;

    let cached_at = Utc::now();
    let themes: Vec<ThemeEntity> = page
      .results
      .into_iter()
      .map(|theme| ThemeEntity::from_api(theme, cached_at))
      .collect();

    self.db.upsert_themes(&themes).map_err(CatalogError::store)?;
    info!(stored = themes.len(), total = page.count, "Refreshed themes");

    Ok(themes.len())
  }

  /// Fetch and upsert a single theme. `Ok(None)` when it does not exist remotely.
  pub async fn refresh_one(&self, id: i64) -> Result<Option<ThemeEntity>, CatalogError> {
    let theme = match self.api.get_theme(id).await {
      Ok(theme) => theme,
      Err(RemoteError::NotFound) => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    let entity = ThemeEntity::from_api(theme, Utc::now());
    self.db.upsert_theme(&entity).map_err(CatalogError::store)?;

    Ok(Some(entity))
  }

  pub fn clear(&self) -> Result<(), CatalogError> {
    self.db.delete_all_themes().map_err(CatalogError::store)
  }
}
