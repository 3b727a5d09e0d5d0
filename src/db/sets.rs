use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::Database;
use crate::catalog::SetEntity;

/// Row predicate for set list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetFilter {
  All,
  Theme(i64),
  /// Case-insensitive substring match on the name
  Search(String),
  Favorites,
}

const SET_COLUMNS: &str = "set_num, name, year, theme_id, num_parts, set_img_url, set_url, \
   last_modified_dt, cached_at, is_favorite";

/// Insert a set, or replace its remote-sourced columns if it already exists.
/// `is_favorite` is only written for new rows; an existing row keeps the
/// value it holds when this statement runs.
const UPSERT_SET: &str = "INSERT INTO sets (set_num, name, year, theme_id, num_parts, set_img_url,
     set_url, last_modified_dt, cached_at, is_favorite)
   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
   ON CONFLICT(set_num) DO UPDATE SET
     name = excluded.name,
     year = excluded.year,
     theme_id = excluded.theme_id,
     num_parts = excluded.num_parts,
     set_img_url = excluded.set_img_url,
     set_url = excluded.set_url,
     last_modified_dt = excluded.last_modified_dt,
     cached_at = excluded.cached_at";

fn set_from_row(row: &Row<'_>) -> rusqlite::Result<SetEntity> {
  Ok(SetEntity {
    set_num: row.get(0)?,
    name: row.get(1)?,
    year: row.get(2)?,
    theme_id: row.get(3)?,
    num_parts: row.get(4)?,
    set_img_url: row.get(5)?,
    set_url: row.get(6)?,
    last_modified_dt: row.get(7)?,
    cached_at: row.get(8)?,
    is_favorite: row.get(9)?,
  })
}

fn upsert(conn: &Connection, set: &SetEntity) -> rusqlite::Result<usize> {
  conn.execute(
    UPSERT_SET,
    params![
      set.set_num,
      set.name,
      set.year,
      set.theme_id,
      set.num_parts,
      set.set_img_url,
      set.set_url,
      set.last_modified_dt,
      set.cached_at,
      set.is_favorite,
    ],
  )
}

impl Database {
  /// List sets matching `filter`, ordered by name.
  pub fn list_sets(&self, filter: &SetFilter) -> Result<Vec<SetEntity>> {
    let conn = self.lock()?;

    let (predicate, arg): (&str, Option<rusqlite::types::Value>) = match filter {
      SetFilter::All => ("1 = 1", None),
      SetFilter::Theme(id) => ("theme_id = ?1", Some((*id).into())),
      SetFilter::Search(query) => (
        "name LIKE '%' || ?1 || '%'",
        Some(query.clone().into()),
      ),
      SetFilter::Favorites => ("is_favorite = 1", None),
    };

    let sql = format!(
      "SELECT {} FROM sets WHERE {} ORDER BY name ASC, set_num ASC",
      SET_COLUMNS, predicate
    );
    let mut stmt = conn
      .prepare(&sql)
      .map_err(|e| eyre!("Failed to prepare set query: {}", e))?;

    let rows = match arg {
      Some(value) => stmt.query_map([value], set_from_row),
      None => stmt.query_map([], set_from_row),
    }
    .map_err(|e| eyre!("Failed to query sets: {}", e))?;

    rows
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read set row: {}", e))
  }

  pub fn get_set(&self, set_num: &str) -> Result<Option<SetEntity>> {
    let conn = self.lock()?;

    conn
      .query_row(
        &format!("SELECT {} FROM sets WHERE set_num = ?1", SET_COLUMNS),
        params![set_num],
        set_from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to get set {}: {}", set_num, e))
  }

  /// Upsert a batch of sets in one transaction, preserving favorites.
  pub fn upsert_sets(&self, sets: &[SetEntity]) -> Result<()> {
    {
      let mut conn = self.lock()?;
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      for set in sets {
        upsert(&tx, set).map_err(|e| eyre!("Failed to store set {}: {}", set.set_num, e))?;
      }

      tx
        .commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    }

    self.notify_sets();
    Ok(())
  }

  /// Upsert a single set, preserving its favorite flag.
  pub fn upsert_set(&self, set: &SetEntity) -> Result<()> {
    upsert(&*self.lock()?, set).map_err(|e| eyre!("Failed to store set {}: {}", set.set_num, e))?;
    self.notify_sets();
    Ok(())
  }

  /// Set the favorite flag. Returns false when no such set exists.
  pub fn update_set_favorite(&self, set_num: &str, is_favorite: bool) -> Result<bool> {
    let changed = self
      .lock()?
      .execute(
        "UPDATE sets SET is_favorite = ?1 WHERE set_num = ?2",
        params![is_favorite, set_num],
      )
      .map_err(|e| eyre!("Failed to update favorite for {}: {}", set_num, e))?;

    if changed > 0 {
      self.notify_sets();
    }
    Ok(changed > 0)
  }

  pub fn delete_all_sets(&self) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM sets", [])
      .map_err(|e| eyre!("Failed to delete sets: {}", e))?;
    self.notify_sets();
    Ok(())
  }
}
