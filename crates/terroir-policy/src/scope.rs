//! Region scope resolution.

use std::{collections::BTreeSet, fmt};

use serde::Serialize;
use terroir_core::{
  filter::Predicate,
  id::{RegionId, join_ids},
  principal::{Principal, Role},
};

/// The regions a principal may act within.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "regions", rename_all = "snake_case")]
pub enum Scope {
  AllRegions,
  /// An explicit set. An empty set contains nothing.
  RegionSet(BTreeSet<RegionId>),
}

impl Scope {
  pub fn contains(&self, region: RegionId) -> bool {
    match self {
      Self::AllRegions => true,
      Self::RegionSet(regions) => regions.contains(&region),
    }
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Self::RegionSet(regions) if regions.is_empty())
  }

  /// The scope as a `region_id ∈ …` row filter.
  pub fn to_predicate(&self) -> Predicate {
    match self {
      Self::AllRegions => Predicate::All,
      Self::RegionSet(regions) => Predicate::region_in(regions.clone()),
    }
  }

  /// Explicit regions, for diagnostics. Empty for `AllRegions`.
  pub fn region_list(&self) -> Vec<RegionId> {
    match self {
      Self::AllRegions => Vec::new(),
      Self::RegionSet(regions) => regions.iter().copied().collect(),
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::AllRegions => f.write_str("all regions"),
      Self::RegionSet(regions) => write!(f, "[{}]", join_ids(regions)),
    }
  }
}

/// Superadmins act everywhere; every other role is confined to its own
/// region memberships.
pub fn resolve_scope(principal: &Principal) -> Scope {
  match principal.role {
    Role::Superadmin => Scope::AllRegions,
    Role::Admin | Role::Superviseur | Role::Conseiller => {
      Scope::RegionSet(principal.region_ids.clone())
    }
  }
}
