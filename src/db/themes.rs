use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::Database;
use crate::catalog::ThemeEntity;

/// Row predicate for theme list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeFilter {
  All,
  /// Themes without a parent
  Roots,
  Children(i64),
  Search(String),
}

const THEME_COLUMNS: &str = "id, name, parent_id, cached_at";

fn theme_from_row(row: &Row<'_>) -> rusqlite::Result<ThemeEntity> {
  Ok(ThemeEntity {
    id: row.get(0)?,
    name: row.get(1)?,
    parent_id: row.get(2)?,
    cached_at: row.get(3)?,
  })
}

fn upsert(conn: &Connection, theme: &ThemeEntity) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT OR REPLACE INTO themes (id, name, parent_id, cached_at) VALUES (?1, ?2, ?3, ?4)",
    params![theme.id, theme.name, theme.parent_id, theme.cached_at],
  )
}

impl Database {
  pub fn list_themes(&self, filter: &ThemeFilter) -> Result<Vec<ThemeEntity>> {
    let conn = self.lock()?;

    let (predicate, arg): (&str, Option<rusqlite::types::Value>) = match filter {
      ThemeFilter::All => ("1 = 1", None),
      ThemeFilter::Roots => ("parent_id IS NULL", None),
      ThemeFilter::Children(parent) => ("parent_id = ?1", Some((*parent).into())),
      ThemeFilter::Search(query) => (
        "name LIKE '%' || ?1 || '%'",
        Some(query.clone().into()),
      ),
    };

    let sql = format!(
      "SELECT {} FROM themes WHERE {} ORDER BY name ASC, id ASC",
      THEME_COLUMNS, predicate
    );
    let mut stmt = conn
      .prepare(&sql)
      .map_err(|e| eyre!("Failed to prepare theme query: {}", e))?;

    let rows = match arg {
      Some(value) => stmt.query_map([value], theme_from_row),
      None => stmt.query_map([], theme_from_row),
    }
    .map_err(|e| eyre!("Failed to query themes: {}", e))?;

    rows
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read theme row: {}", e))
  }

  pub fn get_theme(&self, id: i64) -> Result<Option<ThemeEntity>> {
    let conn = self.lock()?;

    conn
      .query_row(
        &format!("SELECT {} FROM themes WHERE id = ?1", THEME_COLUMNS),
        params![id],
        theme_from_row,
      )
      .optional()
      .map_err(|e| eyre!("Failed to get theme {}: {}", id, e))
  }

  pub fn upsert_themes(&self, themes: &[ThemeEntity]) -> Result<()> {
    {
      let mut conn = self.lock()?;
      let tx = conn
        .transaction()
        .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

      for theme in themes {
        upsert(&tx, theme).map_err(|e| eyre!("Failed to store theme {}: {}", theme.id, e))?;
      }

      tx
        .commit()
        .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    }

    self.notify_themes();
    Ok(())
  }

  pub fn upsert_theme(&self, theme: &ThemeEntity) -> Result<()> {
    upsert(&*self.lock()?, theme)
      .map_err(|e| eyre!("Failed to store theme {}: {}", theme.id, e))?;
    self.notify_themes();
    Ok(())
  }

  pub fn delete_all_themes(&self) -> Result<()> {
    self
      .lock()?
      .execute("DELETE FROM themes", [])
      .map_err(|e| eyre!("Failed to delete themes: {}", e))?;
    self.notify_themes();
    Ok(())
  }
}
