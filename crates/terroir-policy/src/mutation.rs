//! Write authorization.
//!
//! Every write a handler can perform is one [`Mutation`] variant carrying the
//! already-fetched rows the rule needs. [`authorize`] never performs I/O; facts
//! that must be queried first (such as the number of activities still
//! referencing a site) are part of the variant.

use std::collections::BTreeSet;

use terroir_core::{
  activity::{Activity, ActivityStatus},
  id::RegionId,
  principal::Role,
  site::Site,
  user::UserAccount,
};

use crate::{
  context::AccessContext,
  decision::{Action, Decision, DenyReason},
  visibility::EntityKind,
  workflow,
};

#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
  CreateSite { region_id: RegionId },
  UpdateSite { site: &'a Site },
  DeleteSite { site: &'a Site, activity_count: u64 },

  CreateActivity { site: &'a Site },
  /// Change of business fields (kind, theme, duration, photos, comments…).
  UpdateActivity { activity: &'a Activity },
  ChangeActivityStatus { activity: &'a Activity, to: ActivityStatus },
  DeleteActivity { activity: &'a Activity },

  CreateUser {
    role:       Role,
    region_ids: &'a BTreeSet<RegionId>,
  },
  /// `None` fields are left as they are.
  UpdateUser {
    account:     &'a UserAccount,
    new_role:    Option<Role>,
    new_regions: Option<&'a BTreeSet<RegionId>>,
  },
  DeleteUser { account: &'a UserAccount },
}

impl Mutation<'_> {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::CreateSite { .. } | Self::UpdateSite { .. } | Self::DeleteSite { .. } => {
        EntityKind::Site
      }
      Self::CreateActivity { .. }
      | Self::UpdateActivity { .. }
      | Self::ChangeActivityStatus { .. }
      | Self::DeleteActivity { .. } => EntityKind::Activity,
      Self::CreateUser { .. } | Self::UpdateUser { .. } | Self::DeleteUser { .. } => {
        EntityKind::User
      }
    }
  }

  pub fn action(&self) -> Action {
    match self {
      Self::CreateSite { .. } => Action::CreateSite,
      Self::UpdateSite { .. } => Action::UpdateSite,
      Self::DeleteSite { .. } => Action::DeleteSite,
      Self::CreateActivity { .. } => Action::CreateActivity,
      Self::UpdateActivity { .. } => Action::UpdateActivity,
      Self::ChangeActivityStatus { .. } => Action::ReviewActivity,
      Self::DeleteActivity { .. } => Action::DeleteActivity,
      Self::CreateUser { .. } => Action::CreateUser,
      Self::UpdateUser { .. } => Action::UpdateUser,
      Self::DeleteUser { .. } => Action::DeleteUser,
    }
  }
}

/// Decide whether `ctx` may perform `mutation`.
pub fn authorize(ctx: &AccessContext, mutation: &Mutation<'_>) -> Decision {
  let decision = match *mutation {
    Mutation::CreateSite { region_id } => site_write(ctx, Action::CreateSite, region_id),
    Mutation::UpdateSite { site } => site_write(ctx, Action::UpdateSite, site.region_id),
    Mutation::DeleteSite { site, activity_count } => {
      site_write(ctx, Action::DeleteSite, site.region_id).and_then(|| {
        Decision::allow_if(activity_count == 0, || DenyReason::HasDependents {
          site:       site.site_id,
          activities: activity_count,
        })
      })
    }

    Mutation::CreateActivity { site } => create_activity(ctx, site),
    Mutation::UpdateActivity { activity } => update_activity(ctx, activity),
    Mutation::ChangeActivityStatus { activity, to } => {
      workflow::transition_activity(ctx, activity, to)
    }
    Mutation::DeleteActivity { activity } => {
      admin_tier(ctx, Action::DeleteActivity)
        .and_then(|| in_scope(ctx, activity.region_id))
    }

    Mutation::CreateUser { role, region_ids } => admin_tier(ctx, Action::CreateUser)
      .and_then(|| grants_superadmin(ctx, role == Role::Superadmin))
      .and_then(|| regions_in_scope(ctx, region_ids)),
    Mutation::UpdateUser { account, new_role, new_regions } => {
      admin_tier(ctx, Action::UpdateUser)
        .and_then(|| {
          grants_superadmin(
            ctx,
            account.role == Role::Superadmin || new_role == Some(Role::Superadmin),
          )
        })
        .and_then(|| own_access(ctx, account, new_role, new_regions))
        .and_then(|| match new_regions {
          // Regions outside the actor's scope can be neither granted nor
          // taken away; the ones it leaves alone may be anything.
          Some(regions) => {
            regions_in_scope(ctx, regions.symmetric_difference(&account.region_ids))
          }
          None => Decision::Allow,
        })
    }
    Mutation::DeleteUser { .. } => match ctx.role() {
      Role::Superadmin => Decision::Allow,
      role @ (Role::Admin | Role::Superviseur | Role::Conseiller) => {
        Decision::Deny(DenyReason::RoleNotPermitted { role, action: Action::DeleteUser })
      }
    },
  };

  if let Decision::Deny(reason) = &decision {
    tracing::debug!(
      principal = %ctx.principal().id,
      role = %ctx.role(),
      kind = %mutation.kind(),
      action = %mutation.action(),
      %reason,
      "mutation denied"
    );
  }
  decision
}

/// Regions are reference data; only a superadmin adds them.
pub fn authorize_region_write(ctx: &AccessContext) -> Decision {
  match ctx.role() {
    Role::Superadmin => Decision::Allow,
    role @ (Role::Admin | Role::Superviseur | Role::Conseiller) => {
      tracing::debug!(principal = %ctx.principal().id, %role, "region write denied");
      Decision::Deny(DenyReason::RoleNotPermitted { role, action: Action::CreateRegion })
    }
  }
}

fn admin_tier(ctx: &AccessContext, action: Action) -> Decision {
  let role = ctx.role();
  Decision::allow_if(role.is_admin_tier(), || DenyReason::RoleNotPermitted { role, action })
}

fn in_scope(ctx: &AccessContext, region: RegionId) -> Decision {
  let scope = ctx.scope();
  Decision::allow_if(scope.contains(region), || DenyReason::RegionOutOfScope {
    region,
    scope: scope.region_list(),
  })
}

fn site_write(ctx: &AccessContext, action: Action, region: RegionId) -> Decision {
  admin_tier(ctx, action).and_then(|| in_scope(ctx, region))
}

fn grants_superadmin(ctx: &AccessContext, touches_superadmin: bool) -> Decision {
  match ctx.role() {
    Role::Superadmin => Decision::Allow,
    Role::Admin | Role::Superviseur | Role::Conseiller => {
      Decision::allow_if(!touches_superadmin, || DenyReason::SuperadminProtected)
    }
  }
}

fn regions_in_scope<'r>(
  ctx: &AccessContext,
  regions: impl IntoIterator<Item = &'r RegionId>,
) -> Decision {
  let scope = ctx.scope();
  match regions.into_iter().find(|region| !scope.contains(**region)) {
    Some(&region) => {
      Decision::Deny(DenyReason::RegionOutOfScope { region, scope: scope.region_list() })
    }
    None => Decision::Allow,
  }
}

/// Below superadmin, nobody rewrites their own role or regions.
fn own_access(
  ctx: &AccessContext,
  account: &UserAccount,
  new_role: Option<Role>,
  new_regions: Option<&BTreeSet<RegionId>>,
) -> Decision {
  match ctx.role() {
    Role::Superadmin => Decision::Allow,
    Role::Admin | Role::Superviseur | Role::Conseiller => {
      let is_self = account.user_id == ctx.principal().id;
      let changes = new_role.is_some_and(|role| role != account.role)
        || new_regions.is_some_and(|regions| *regions != account.region_ids);
      Decision::allow_if(!(is_self && changes), || DenyReason::OwnAccessProtected)
    }
  }
}

fn create_activity(ctx: &AccessContext, site: &Site) -> Decision {
  match ctx.role() {
    Role::Superadmin => Decision::Allow,
    Role::Admin | Role::Superviseur => in_scope(ctx, site.region_id),
    Role::Conseiller => Decision::allow_if(ctx.is_assigned(site.site_id), || {
      DenyReason::SiteNotAssigned { site: site.site_id }
    })
    .and_then(|| in_scope(ctx, site.region_id)),
  }
}

fn update_activity(ctx: &AccessContext, activity: &Activity) -> Decision {
  match ctx.role() {
    Role::Superadmin => Decision::Allow,
    Role::Admin | Role::Superviseur => in_scope(ctx, activity.region_id),
    Role::Conseiller => {
      if activity.created_by != ctx.principal().id {
        Decision::Deny(DenyReason::NotAuthor { activity: activity.activity_id })
      } else if activity.status != ActivityStatus::EnAttente {
        Decision::Deny(DenyReason::LockedAfterReview {
          activity: activity.activity_id,
          status:   activity.status,
        })
      } else {
        Decision::Allow
      }
    }
  }
}
