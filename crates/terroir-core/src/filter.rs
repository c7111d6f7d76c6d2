//! Row filters produced by the visibility rules and consumed by storage
//! backends.
//!
//! A [`Predicate`] never fetches anything itself. Backends translate it into
//! their own query language (see `terroir-store-sqlite`); the `matches_*`
//! methods evaluate it in memory against an already-fetched row.
//!
//! Variants that make no sense for an entity kind (e.g. [`Predicate::CreatedBy`]
//! applied to a site) match nothing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  activity::{Activity, ActivityStatus},
  id::{RegionId, SiteId, UserId},
  site::Site,
  user::UserAccount,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
  /// Every row.
  All,
  /// No row at all.
  Nothing,
  /// Sites or activities whose `region_id` is in the set. Never empty; use
  /// [`Predicate::region_in`] to build it.
  RegionIn { regions: BTreeSet<RegionId> },
  /// Sites whose id is in the set. Never empty.
  SiteIdIn { sites: BTreeSet<SiteId> },
  /// Activities authored by the user.
  CreatedBy { user: UserId },
  /// Users sharing at least one region with the set, plus `or_self`.
  UserRegionOverlap {
    regions: BTreeSet<RegionId>,
    or_self: UserId,
  },
  /// Only the given user.
  SelfOnly { user: UserId },
}

/// Narrowing a caller asks for on top of visibility. Unset fields do not
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
  pub site_id: Option<SiteId>,
  pub status:  Option<ActivityStatus>,
}

impl Predicate {
  /// `region_id ∈ regions`. An empty set matches nothing; it is never a
  /// wildcard.
  pub fn region_in(regions: BTreeSet<RegionId>) -> Self {
    if regions.is_empty() {
      Self::Nothing
    } else {
      Self::RegionIn { regions }
    }
  }

  /// `site_id ∈ sites`. An empty set matches nothing.
  pub fn site_id_in(sites: BTreeSet<SiteId>) -> Self {
    if sites.is_empty() {
      Self::Nothing
    } else {
      Self::SiteIdIn { sites }
    }
  }

  /// Users overlapping `regions`, plus the user themself.
  pub fn user_region_overlap(regions: BTreeSet<RegionId>, or_self: UserId) -> Self {
    if regions.is_empty() {
      Self::SelfOnly { user: or_self }
    } else {
      Self::UserRegionOverlap { regions, or_self }
    }
  }

  /// True when the predicate is statically known to select zero rows.
  pub fn matches_nothing(&self) -> bool { matches!(self, Self::Nothing) }

  pub fn matches_site(&self, site: &Site) -> bool {
    match self {
      Self::All => true,
      Self::RegionIn { regions } => regions.contains(&site.region_id),
      Self::SiteIdIn { sites } => sites.contains(&site.site_id),
      Self::Nothing
      | Self::CreatedBy { .. }
      | Self::UserRegionOverlap { .. }
      | Self::SelfOnly { .. } => false,
    }
  }

  pub fn matches_activity(&self, activity: &Activity) -> bool {
    match self {
      Self::All => true,
      Self::RegionIn { regions } => regions.contains(&activity.region_id),
      Self::CreatedBy { user } => activity.created_by == *user,
      Self::Nothing
      | Self::SiteIdIn { .. }
      | Self::UserRegionOverlap { .. }
      | Self::SelfOnly { .. } => false,
    }
  }

  pub fn matches_user(&self, account: &UserAccount) -> bool {
    match self {
      Self::All => true,
      Self::UserRegionOverlap { regions, or_self } => {
        account.user_id == *or_self
          || !account.region_ids.is_disjoint(regions)
      }
      Self::SelfOnly { user } => account.user_id == *user,
      Self::Nothing
      | Self::RegionIn { .. }
      | Self::SiteIdIn { .. }
      | Self::CreatedBy { .. } => false,
    }
  }
}
