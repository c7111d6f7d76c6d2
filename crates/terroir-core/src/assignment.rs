//! Site assignment types shared by the policy engine and storage backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  id::{RegionId, SiteId, UserId, join_ids},
  principal::Role,
  site::Site,
  user::UserAccount,
};

/// What could not be found while validating an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ids", rename_all = "snake_case")]
pub enum Missing {
  User(UserId),
  Sites(Vec<SiteId>),
}

impl fmt::Display for Missing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::User(id) => write!(f, "user {id}"),
      Self::Sites(ids) => write!(f, "sites [{}]", join_ids(ids)),
    }
  }
}

/// Precondition failures of an assignment replacement.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum AssignmentError {
  #[error("role {role} may not manage site assignments")]
  NotPermitted { role: Role },

  #[error("user {user} has role {role}; only a conseiller can be assigned sites")]
  RoleMismatch { user: UserId, role: Role },

  #[error("conseiller {user} belongs to no region")]
  NoRegion { user: UserId },

  #[error(
    "sites [{}] lie outside the conseiller's regions [{}]",
    join_ids(.sites),
    join_ids(.regions)
  )]
  OutOfScope {
    sites:   Vec<SiteId>,
    regions: Vec<RegionId>,
  },

  #[error("{what} not found")]
  NotFound { what: Missing },
}

/// State read inside the assignment transaction and handed to the validator
/// before anything is written.
#[derive(Debug, Clone)]
pub struct AssignmentSnapshot {
  /// The account receiving the assignment, if it exists.
  pub target:        Option<UserAccount>,
  /// Candidate sites that exist.
  pub sites:         Vec<Site>,
  /// Candidate site ids with no matching row.
  pub missing_sites: Vec<SiteId>,
}
