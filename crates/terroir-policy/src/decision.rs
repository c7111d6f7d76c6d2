//! Allow/deny outcomes.
//!
//! A denial always carries a [`DenyReason`] whose `Display` is a sentence
//! that can be shown to the person who was refused.

use serde::Serialize;
use strum::Display;
use terroir_core::{
  activity::ActivityStatus,
  id::{ActivityId, RegionId, SiteId, join_ids},
  principal::Role,
};
use thiserror::Error;

/// What the principal tried to do; used in denial messages and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  #[strum(to_string = "create regions")]
  CreateRegion,
  #[strum(to_string = "create sites")]
  CreateSite,
  #[strum(to_string = "edit sites")]
  UpdateSite,
  #[strum(to_string = "delete sites")]
  DeleteSite,
  #[strum(to_string = "record activities")]
  CreateActivity,
  #[strum(to_string = "edit activities")]
  UpdateActivity,
  #[strum(to_string = "approve or reject activities")]
  ReviewActivity,
  #[strum(to_string = "delete activities")]
  DeleteActivity,
  #[strum(to_string = "create accounts")]
  CreateUser,
  #[strum(to_string = "edit accounts")]
  UpdateUser,
  #[strum(to_string = "delete accounts")]
  DeleteUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
  #[error("role {role} may not {action}")]
  RoleNotPermitted { role: Role, action: Action },

  #[error("region {region} is outside your regions [{}]", join_ids(.scope))]
  RegionOutOfScope {
    region: RegionId,
    scope:  Vec<RegionId>,
  },

  #[error("site {site} is not assigned to you")]
  SiteNotAssigned { site: SiteId },

  #[error("only the author of activity {activity} may edit it")]
  NotAuthor { activity: ActivityId },

  #[error("activity {activity} is {status}; its author can no longer edit it")]
  LockedAfterReview {
    activity: ActivityId,
    status:   ActivityStatus,
  },

  #[error("activity {activity} has already been decided ({status})")]
  AlreadyFinalized {
    activity: ActivityId,
    status:   ActivityStatus,
  },

  #[error("activity {activity} cannot move from {from} to {to}")]
  InvalidTransition {
    activity: ActivityId,
    from:     ActivityStatus,
    to:       ActivityStatus,
  },

  #[error("site {site} still has {activities} recorded activities")]
  HasDependents { site: SiteId, activities: u64 },

  #[error("only a superadmin may create, edit or grant the superadmin role")]
  SuperadminProtected,

  #[error("you cannot change your own role or regions")]
  OwnAccessProtected,
}

/// The outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Decision {
  Allow,
  Deny(DenyReason),
}

impl Decision {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow) }

  /// Convert into a `Result` so callers can use `?`.
  pub fn into_result(self) -> Result<(), DenyReason> {
    match self {
      Self::Allow => Ok(()),
      Self::Deny(reason) => Err(reason),
    }
  }

  /// Evaluate `next` only if `self` allows.
  pub fn and_then(self, next: impl FnOnce() -> Decision) -> Decision {
    match self {
      Self::Allow => next(),
      deny @ Self::Deny(_) => deny,
    }
  }

  /// `Allow` if `ok`, otherwise deny with the reason built by `reason`.
  pub fn allow_if(ok: bool, reason: impl FnOnce() -> DenyReason) -> Self {
    if ok { Self::Allow } else { Self::Deny(reason()) }
  }
}
