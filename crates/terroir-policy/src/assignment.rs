//! Assignment index rules.
//!
//! Two different principals are involved in an assignment and they must not
//! be confused: the *actor* only needs to be admin-tier, while the assigned
//! sites must lie inside the *target* conseiller's scope.

use std::collections::BTreeSet;

use terroir_core::{
  assignment::{AssignmentError, AssignmentSnapshot, Missing},
  id::{SiteId, UserId},
  principal::{Principal, Role},
};

use crate::scope::{Scope, resolve_scope};

/// Only superadmins and admins manage assignments.
pub fn check_actor(actor: &Principal) -> Result<(), AssignmentError> {
  if actor.role.is_admin_tier() {
    Ok(())
  } else {
    Err(AssignmentError::NotPermitted { role: actor.role })
  }
}

/// Validate a full-replace assignment of `requested` sites to `target`,
/// against state read inside the assignment transaction.
pub fn validate_assignment(
  target: UserId,
  requested: &BTreeSet<SiteId>,
  snapshot: &AssignmentSnapshot,
) -> Result<(), AssignmentError> {
  let account = snapshot
    .target
    .as_ref()
    .filter(|account| account.user_id == target)
    .ok_or(AssignmentError::NotFound { what: Missing::User(target) })?;

  match account.role {
    Role::Conseiller => {}
    role @ (Role::Superadmin | Role::Admin | Role::Superviseur) => {
      return Err(AssignmentError::RoleMismatch { user: target, role });
    }
  }

  if account.region_ids.is_empty() {
    return Err(AssignmentError::NoRegion { user: target });
  }

  let mut missing: Vec<SiteId> = requested
    .iter()
    .filter(|id| !snapshot.sites.iter().any(|s| s.site_id == **id))
    .copied()
    .collect();
  missing.extend(snapshot.missing_sites.iter().filter(|id| requested.contains(*id)));
  missing.sort();
  missing.dedup();
  if !missing.is_empty() {
    return Err(AssignmentError::NotFound { what: Missing::Sites(missing) });
  }

  let scope = resolve_scope(&Principal::from(account));
  let mut outside: Vec<SiteId> = snapshot
    .sites
    .iter()
    .filter(|s| requested.contains(&s.site_id) && !scope.contains(s.region_id))
    .map(|s| s.site_id)
    .collect();
  outside.sort();
  outside.dedup();
  if !outside.is_empty() {
    let regions = match scope {
      Scope::AllRegions => Vec::new(),
      Scope::RegionSet(regions) => regions.into_iter().collect(),
    };
    return Err(AssignmentError::OutOfScope { sites: outside, regions });
  }

  Ok(())
}
