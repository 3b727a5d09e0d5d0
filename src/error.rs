//! Error types returned across the library boundary.

use thiserror::Error;

/// Failure talking to the remote catalog service.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("catalog service returned HTTP {status}: {body}")]
  Status { status: u16, body: String },
  #[error("resource not found")]
  NotFound,
  #[error("request timed out")]
  Timeout,
  #[error("transport error: {0}")]
  Transport(String),
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("invalid request url: {0}")]
  InvalidUrl(String),
}

impl RemoteError {
  /// Build the error for a non-success status code.
  pub fn from_status(status: u16, body: impl Into<String>) -> Self {
    if status == 404 {
      Self::NotFound
    } else {
      Self::Status {
        status,
        body: body.into(),
      }
    }
  }
}

impl From<reqwest::Error> for RemoteError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout
    } else {
      Self::Transport(err.to_string())
    }
  }
}

/// Failure of a repository operation.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error(transparent)]
  Remote(#[from] RemoteError),
  #[error("local store error: {0}")]
  Store(String),
}

impl CatalogError {
  pub fn store(err: impl std::fmt::Display) -> Self {
    Self::Store(err.to_string())
  }
}
