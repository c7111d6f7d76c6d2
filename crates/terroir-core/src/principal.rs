//! The authenticated actor of a request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  id::{RegionId, UserId},
  user::UserAccount,
};

/// The closed set of roles.
///
/// Adding a variant forces every policy table to be revisited: all policy
/// code matches on `Role` exhaustively.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Superadmin,
  Admin,
  Superviseur,
  Conseiller,
}

impl Role {
  /// Roles allowed to manage sites, accounts and assignments.
  pub fn is_admin_tier(self) -> bool {
    matches!(self, Self::Superadmin | Self::Admin)
  }

  /// Roles allowed to approve or reject activities.
  pub fn can_review(self) -> bool {
    matches!(self, Self::Superadmin | Self::Admin | Self::Superviseur)
  }
}

/// The authenticated principal. Rehydrated from credentials on every request
/// and never mutated while a request is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id:         UserId,
  pub role:       Role,
  pub region_ids: BTreeSet<RegionId>,
}

impl Principal {
  pub fn new(
    id: UserId,
    role: Role,
    region_ids: impl IntoIterator<Item = RegionId>,
  ) -> Self {
    Self { id, role, region_ids: region_ids.into_iter().collect() }
  }
}

impl From<&UserAccount> for Principal {
  fn from(account: &UserAccount) -> Self {
    Self {
      id:         account.user_id,
      role:       account.role,
      region_ids: account.region_ids.clone(),
    }
  }
}
