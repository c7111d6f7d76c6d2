//! Activity approval workflow.
//!
//! ```text
//! en_attente ──► approuve
//!      │
//!      └──────► rejete
//! ```
//!
//! Both outcomes are terminal; nothing leaves them.

use terroir_core::activity::{Activity, ActivityStatus};

use crate::{
  context::AccessContext,
  decision::{Action, Decision, DenyReason},
};

/// Whether the state machine has an edge `from → to`.
pub fn can_transition(from: ActivityStatus, to: ActivityStatus) -> bool {
  matches!(
    (from, to),
    (ActivityStatus::EnAttente, ActivityStatus::Approuve)
      | (ActivityStatus::EnAttente, ActivityStatus::Rejete)
  )
}

/// Decide whether `ctx` may move `activity` to `to`.
///
/// A decided activity is reported as [`DenyReason::AlreadyFinalized`] to
/// every caller, so "already decided" is never confused with "nothing to do".
pub fn transition_activity(
  ctx: &AccessContext,
  activity: &Activity,
  to: ActivityStatus,
) -> Decision {
  let decision = decide(ctx, activity, to);
  if let Decision::Deny(reason) = &decision {
    tracing::debug!(
      principal = %ctx.principal().id,
      role = %ctx.role(),
      activity = %activity.activity_id,
      from = %activity.status,
      %to,
      %reason,
      "activity transition denied"
    );
  }
  decision
}

fn decide(ctx: &AccessContext, activity: &Activity, to: ActivityStatus) -> Decision {
  if activity.status.is_terminal() {
    return Decision::Deny(DenyReason::AlreadyFinalized {
      activity: activity.activity_id,
      status:   activity.status,
    });
  }
  if !can_transition(activity.status, to) {
    return Decision::Deny(DenyReason::InvalidTransition {
      activity: activity.activity_id,
      from:     activity.status,
      to,
    });
  }

  let role = ctx.role();
  if !role.can_review() {
    return Decision::Deny(DenyReason::RoleNotPermitted { role, action: Action::ReviewActivity });
  }
  // Admins and superviseurs alike are held to their own memberships.
  let scope = ctx.scope();
  Decision::allow_if(scope.contains(activity.region_id), || DenyReason::RegionOutOfScope {
    region: activity.region_id,
    scope:  scope.region_list(),
  })
}
