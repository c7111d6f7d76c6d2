//! Error type for `terroir-policy`.
//!
//! Policy outcomes and backend failures never share a variant: a caller can
//! always tell "forbidden" apart from "the database is down".

use terroir_core::assignment::AssignmentError;
use thiserror::Error;

use crate::decision::DenyReason;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Assignment(#[from] AssignmentError),

  #[error(transparent)]
  Denied(#[from] DenyReason),

  #[error("infrastructure failure: {0}")]
  Infrastructure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn infrastructure<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Infrastructure(Box::new(e))
  }

  /// True for outcomes of policy evaluation, false for backend failures.
  pub fn is_policy(&self) -> bool { !matches!(self, Self::Infrastructure(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
