//! Error types for `terroir-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown activity status: {0:?}")]
  UnknownStatus(String),

  #[error("malformed identifier: {0}")]
  Id(#[from] uuid::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
