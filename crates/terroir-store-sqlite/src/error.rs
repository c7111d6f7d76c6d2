//! Error type for `terroir-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] terroir_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("region {0} does not exist")]
  UnknownRegion(terroir_core::id::RegionId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Carry one of our errors out of a `tokio_rusqlite` closure.
pub(crate) fn in_call(e: Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}
