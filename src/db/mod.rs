//! Durable local store for catalog entities.
//!
//! A single SQLite connection guarded by a mutex, plus one change channel per
//! table so readers can re-run their queries whenever a write commits.

pub mod schema;
mod sets;
mod themes;

pub use sets::SetFilter;
pub use themes::ThemeFilter;

use color_eyre::{eyre::eyre, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// Database connection wrapper for the local catalog
pub struct Database {
  conn: Mutex<Connection>,
  sets_changed: watch::Sender<u64>,
  themes_changed: watch::Sender<u64>,
}

impl Database {
  /// Open or create the database at `path`
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a private in-memory database
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let db = Self {
      conn: Mutex::new(conn),
      sets_changed: watch::Sender::new(0),
      themes_changed: watch::Sender::new(0),
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Receiver notified after every committed write to `sets`
  pub fn subscribe_sets(&self) -> watch::Receiver<u64> {
    self.sets_changed.subscribe()
  }

  /// Receiver notified after every committed write to `themes`
  pub fn subscribe_themes(&self) -> watch::Receiver<u64> {
    self.themes_changed.subscribe()
  }

  fn notify_sets(&self) {
    self.sets_changed.send_modify(|version| *version += 1);
  }

  fn notify_themes(&self) {
    self.themes_changed.send_modify(|version| *version += 1);
  }
}
