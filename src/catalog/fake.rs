//! In-process stand-in for the remote catalog used by repository tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use crate::api::client::CatalogApi;
use crate::api::types::{ApiSet, ApiTheme, Page, SetQuery, ThemeQuery};
use crate::error::RemoteError;

#[derive(Default)]
pub(crate) struct FakeCatalog {
  pub sets: Mutex<Vec<ApiSet>>,
  pub themes: Mutex<Vec<ApiTheme>>,
  /// When set, every call fails with this HTTP status
  pub fail_status: Mutex<Option<u16>>,
  /// When set, `list_sets` waits for a notification before answering
  pub gate: Mutex<Option<std::sync::Arc<Notify>>>,
  /// Number of `list_sets` calls currently parked on the gate
  pub waiting: AtomicUsize,
  pub calls: AtomicUsize,
}

impl FakeCatalog {
  pub fn with_sets(sets: Vec<ApiSet>) -> Self {
    Self {
      sets: Mutex::new(sets),
      ..Self::default()
    }
  }

  pub fn with_themes(themes: Vec<ApiTheme>) -> Self {
    Self {
      themes: Mutex::new(themes),
      ..Self::default()
    }
  }

  pub fn fail_with(&self, status: u16) {
    *self.fail_status.lock().unwrap() = Some(status);
  }

  fn check(&self) -> Result<(), RemoteError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match *self.fail_status.lock().unwrap() {
      Some(status) => Err(RemoteError::from_status(status, "fake failure")),
      None => Ok(()),
    }
  }
}

fn page<T: Clone>(items: &[T]) -> Page<T> {
  Page {
    count: items.len() as u64,
    next: None,
    previous: None,
    results: items.to_vec(),
  }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
  async fn list_sets(&self, query: &SetQuery) -> Result<Page<ApiSet>, RemoteError> {
    let gate = self.gate.lock().unwrap().clone();
    if let Some(gate) = gate {
      self.waiting.fetch_add(1, Ordering::SeqCst);
      gate.notified().await;
      self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
    self.check()?;

    let sets = self.sets.lock().unwrap();
    let matching: Vec<ApiSet> = sets
      .iter()
      .filter(|s| query.theme_id.is_none() || s.theme_id == query.theme_id)
      .cloned()
      .collect();
    Ok(page(&matching))
  }

  async fn get_set(&self, set_num: &str) -> Result<ApiSet, RemoteError> {
    self.check()?;
    let sets = self.sets.lock().unwrap();
    sets
      .iter()
      .find(|s| s.set_num.as_deref() == Some(set_num))
      .cloned()
      .ok_or(RemoteError::NotFound)
  }

  async fn list_themes(&self, _query: &ThemeQuery) -> Result<Page<ApiTheme>, RemoteError> {
    self.check()?;
    Ok(page(&self.themes.lock().unwrap()))
  }

  async fn get_theme(&self, id: i64) -> Result<ApiTheme, RemoteError> {
    self.check()?;
    let by_id: HashMap<i64, ApiTheme> = self
      .themes
      .lock()
      .unwrap()
      .iter()
      .filter_map(|t| t.id.map(|id| (id, t.clone())))
      .collect();
    by_id.get(&id).cloned().ok_or(RemoteError::NotFound)
  }
}

pub(crate) fn api_set(set_num: &str, name: &str, theme_id: i64) -> ApiSet {
  ApiSet {
    set_num: Some(set_num.to_string()),
    name: Some(name.to_string()),
    year: Some(2021),
    theme_id: Some(theme_id),
    num_parts: Some(250),
    ..ApiSet::default()
  }
}

pub(crate) fn api_theme(id: i64, name: &str, parent_id: Option<i64>) -> ApiTheme {
  ApiTheme {
    id: Some(id),
    name: Some(name.to_string()),
    parent_id,
  }
}
