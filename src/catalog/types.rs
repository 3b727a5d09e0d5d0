use chrono::{DateTime, Utc};

use crate::api::types::{ApiSet, ApiTheme};

/// A set as persisted locally
#[derive(Debug, Clone, PartialEq)]
pub struct SetEntity {
  pub set_num: String,
  pub name: Option<String>,
  pub year: Option<i32>,
  pub theme_id: Option<i64>,
  pub num_parts: Option<i32>,
  pub set_img_url: Option<String>,
  pub set_url: Option<String>,
  pub last_modified_dt: Option<String>,
  pub cached_at: DateTime<Utc>,
  /// Local only, never populated from remote data
  pub is_favorite: bool,
}

impl SetEntity {
  /// Map a wire record. A missing set number becomes the empty string.
  pub fn from_api(set: ApiSet, cached_at: DateTime<Utc>) -> Self {
    Self {
      set_num: set.set_num.unwrap_or_default(),
      name: set.name,
      year: set.year,
      theme_id: set.theme_id,
      num_parts: set.num_parts,
      set_img_url: set.set_img_url,
      set_url: set.set_url,
      last_modified_dt: set.last_modified_dt,
      cached_at,
      is_favorite: false,
    }
  }
}

/// A theme as persisted locally
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeEntity {
  pub id: i64,
  pub name: Option<String>,
  pub parent_id: Option<i64>,
  pub cached_at: DateTime<Utc>,
}

impl ThemeEntity {
  /// Map a wire record. A missing id becomes 0.
  pub fn from_api(theme: ApiTheme, cached_at: DateTime<Utc>) -> Self {
    Self {
      id: theme.id.unwrap_or_default(),
      name: theme.name,
      parent_id: theme.parent_id,
      cached_at,
    }
  }

  pub fn is_root(&self) -> bool {
    self.parent_id.is_none()
  }
}
