//! Builders shared by the unit tests of this crate.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use terroir_core::{
  activity::{Activity, ActivityDetails, ActivityStatus},
  id::{ActivityId, RegionId, SiteId, UserId},
  principal::{Principal, Role},
  site::Site,
  user::UserAccount,
};

use crate::context::AccessContext;

pub fn principal(role: Role, regions: &[RegionId]) -> Principal {
  Principal::new(UserId::generate(), role, regions.iter().copied())
}

pub fn ctx(role: Role, regions: &[RegionId]) -> AccessContext {
  AccessContext::new(principal(role, regions), BTreeSet::new())
}

pub fn conseiller_ctx(regions: &[RegionId], sites: &[SiteId]) -> AccessContext {
  AccessContext::new(
    principal(Role::Conseiller, regions),
    sites.iter().copied().collect(),
  )
}

pub fn site(region: RegionId) -> Site {
  Site {
    site_id:           SiteId::generate(),
    name:              "Périmètre irrigué".into(),
    region_id:         region,
    locality:          None,
    latitude:          None,
    longitude:         None,
    assigned_user_ids: BTreeSet::new(),
    created_at:        Utc::now(),
  }
}

pub fn details() -> ActivityDetails {
  ActivityDetails {
    kind:             "formation".into(),
    theme:            Some("irrigation goutte-à-goutte".into()),
    duration_minutes: 120,
    performed_on:     NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
    comments:         None,
    photos:           vec![],
  }
}

pub fn activity(region: RegionId, author: UserId, status: ActivityStatus) -> Activity {
  Activity {
    activity_id: ActivityId::generate(),
    site_id:     SiteId::generate(),
    region_id:   region,
    created_by:  author,
    details:     details(),
    status,
    reviewed_by: None,
    reviewed_at: None,
    created_at:  Utc::now(),
  }
}

pub fn account(role: Role, regions: &[RegionId]) -> UserAccount {
  UserAccount {
    user_id:      UserId::generate(),
    username:     format!("{role}-{}", UserId::generate()),
    display_name: "Fatou".into(),
    role,
    region_ids:   regions.iter().copied().collect(),
    created_at:   Utc::now(),
  }
}
