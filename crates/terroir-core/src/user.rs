//! User accounts as stored by the persistence layer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  id::{RegionId, UserId},
  principal::Role,
};

/// A user account. The password hash never leaves the store except through
/// [`FieldStore::find_credentials`](crate::store::FieldStore::find_credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
  pub user_id:      UserId,
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
  pub region_ids:   BTreeSet<RegionId>,
  pub created_at:   DateTime<Utc>,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub display_name:  String,
  pub role:          Role,
  pub region_ids:    BTreeSet<RegionId>,
  /// argon2 PHC string.
  pub password_hash: String,
}

/// Partial update of an account. `None` leaves the field untouched.
///
/// Replacing `region_ids` also drops every site assignment whose site lies
/// outside the new region set.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
  pub display_name:  Option<String>,
  pub role:          Option<Role>,
  pub region_ids:    Option<BTreeSet<RegionId>>,
  pub password_hash: Option<String>,
}
