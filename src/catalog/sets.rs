use chrono::Utc;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::{info, warn};

use super::observe::watch_query;
use super::types::SetEntity;
use crate::api::client::CatalogApi;
use crate::api::types::SetQuery;
use crate::db::{Database, SetFilter};
use crate::error::{CatalogError, RemoteError};

/// Reconciles locally stored sets with the remote catalog.
///
/// Reads only ever touch the local store. Refreshes replace the remote-sourced
/// columns of each set but keep whatever favorite flag the row holds at the
/// moment the write executes. A refresh racing a favorite toggle on the same
/// set is last-writer-wins for the flag.
#[derive(Clone)]
pub struct SetRepository {
  api: Arc<dyn CatalogApi>,
  db: Arc<Database>,
}

impl SetRepository {
  pub fn new(api: Arc<dyn CatalogApi>, db: Arc<Database>) -> Self {
    Self { api, db }
  }

  /// All stored sets, re-emitted on every change.
  pub fn observe_all(&self) -> BoxStream<'static, Vec<SetEntity>> {
    self.observe(SetFilter::All)
  }

  pub fn observe_by_theme(&self, theme_id: i64) -> BoxStream<'static, Vec<SetEntity>> {
    self.observe(SetFilter::Theme(theme_id))
  }

  pub fn observe_search(&self, query: &str) -> BoxStream<'static, Vec<SetEntity>> {
    self.observe(SetFilter::Search(query.to_string()))
  }

  pub fn observe_favorites(&self) -> BoxStream<'static, Vec<SetEntity>> {
    self.observe(SetFilter::Favorites)
  }

  /// Continuous query over the local store. Read errors are logged and
  /// emitted as an empty list.
  pub fn observe(&self, filter: SetFilter) -> BoxStream<'static, Vec<SetEntity>> {
    let db = Arc::clone(&self.db);
    watch_query(self.db.subscribe_sets(), move || {
      db.list_sets(&filter).unwrap_or_else(|e| {
        warn!(?filter, "Failed to read sets: {:#}", e);
        Vec::new()
      })
    })
  }

  /// Point lookup against the local store.
  pub fn get_by_id(&self, set_num: &str) -> Option<SetEntity> {
    self.db.get_set(set_num).unwrap_or_else(|e| {
      warn!(set_num, "Failed to read set: {:#}", e);
      None
    })
  }

  /// Fetch one page of sets and upsert it. Returns how many sets were stored.
  ///
  /// On a remote failure the local store is left untouched.
  pub async fn refresh(&self, query: &SetQuery) -> Result<usize, CatalogError> {
    let page = self.api.list_sets(query).await?;

    let cached_at = Utc::now();
    let sets: Vec<SetEntity> = page
      .results
      .into_iter()
      .map(|set| SetEntity::from_api(set, cached_at))
      .collect();

    self.db.upsert_sets(&sets).map_err(CatalogError::store)?;
    info!(stored = sets.len(), total = page.count, "Refreshed sets");

    Ok(sets.len())
  }

  /// Fetch and upsert a single set, returning it as stored.
  ///
  /// Returns `Ok(None)` when the remote catalog has no such set.
  pub async fn refresh_one(&self, set_num: &str) -> Result<Option<SetEntity>, CatalogError> {
    let set = match self.api.get_set(set_num).await {
      Ok(set) => set,
      Err(RemoteError::NotFound) => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    let entity = SetEntity::from_api(set, Utc::now());
    self.db.upsert_set(&entity).map_err(CatalogError::store)?;

    self.db.get_set(&entity.set_num).map_err(CatalogError::store)
  }

  /// Invert the favorite flag of a stored set.
  ///
  /// Returns the new value, or `None` if the set is not stored locally.
  pub fn toggle_favorite(&self, set_num: &str) -> Result<Option<bool>, CatalogError> {
    let Some(current) = self.db.get_set(set_num).map_err(CatalogError::store)? else {
      return Ok(None);
    };

    let is_favorite = !current.is_favorite;
    self
      .db
      .update_set_favorite(set_num, is_favorite)
      .map_err(CatalogError::store)?;

    Ok(Some(is_favorite))
  }

  /// Delete every stored set.
  pub fn clear(&self) -> Result<(), CatalogError> {
    self.db.delete_all_sets().map_err(CatalogError::store)
  }
}
