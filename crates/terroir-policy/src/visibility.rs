//! Entity visibility rules.
//!
//! | Role        | Sites                  | Activities            | Users                      |
//! |-------------|------------------------|-----------------------|----------------------------|
//! | superadmin  | all                    | all                   | all                        |
//! | admin       | `region_id ∈ scope`    | `region_id ∈ scope`   | any region in scope, self  |
//! | superviseur | `region_id ∈ scope`    | `region_id ∈ scope`   | any region in scope, self  |
//! | conseiller  | `id ∈ assigned sites`  | `created_by = self`   | self                       |
//!
//! Conseillers see the activities they wrote, wherever those are; their
//! activity filter is not region based.

use serde::{Deserialize, Serialize};
use strum::Display;
use terroir_core::{
  activity::Activity,
  filter::Predicate,
  principal::Role,
  site::Site,
  user::UserAccount,
};

use crate::{context::AccessContext, scope::Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Site,
  Activity,
  User,
}

/// The row filter restricting what `ctx` may read of `kind`.
pub fn visibility_predicate(ctx: &AccessContext, kind: EntityKind) -> Predicate {
  let me = ctx.principal().id;
  match (ctx.role(), kind) {
    (Role::Superadmin, _) => Predicate::All,

    (Role::Admin | Role::Superviseur, EntityKind::Site | EntityKind::Activity) => {
      ctx.scope().to_predicate()
    }
    (Role::Admin | Role::Superviseur, EntityKind::User) => match ctx.scope() {
      Scope::AllRegions => Predicate::All,
      Scope::RegionSet(regions) => Predicate::user_region_overlap(regions.clone(), me),
    },

    (Role::Conseiller, EntityKind::Site) => {
      Predicate::site_id_in(ctx.assigned_sites().clone())
    }
    (Role::Conseiller, EntityKind::Activity) => Predicate::CreatedBy { user: me },
    (Role::Conseiller, EntityKind::User) => Predicate::SelfOnly { user: me },
  }
}

pub fn can_view_site(ctx: &AccessContext, site: &Site) -> bool {
  visibility_predicate(ctx, EntityKind::Site).matches_site(site)
}

pub fn can_view_activity(ctx: &AccessContext, activity: &Activity) -> bool {
  visibility_predicate(ctx, EntityKind::Activity).matches_activity(activity)
}

/// Viewing one's own account is always allowed.
pub fn can_view_user(ctx: &AccessContext, account: &UserAccount) -> bool {
  account.user_id == ctx.principal().id
    || visibility_predicate(ctx, EntityKind::User).matches_user(account)
}
