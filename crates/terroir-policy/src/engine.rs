//! [`Engine`] — the request-facing entry point that pairs the pure policy
//! functions with a [`FieldStore`].

use std::{collections::BTreeSet, sync::Arc};

use terroir_core::{
  id::{SiteId, UserId},
  principal::{Principal, Role},
  site::Site,
  store::FieldStore,
};

use crate::{
  Error, Result,
  assignment::{check_actor, validate_assignment},
  context::AccessContext,
  decision::Decision,
  mutation::{Mutation, authorize},
};

/// Policy engine bound to a store. Holds no state of its own besides the
/// store handle; cloning is cheap.
pub struct Engine<S> {
  store: Arc<S>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: FieldStore> Engine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Resolve the access context of `principal`: its scope and, for a
  /// conseiller, the sites currently assigned to it.
  pub async fn context(&self, principal: Principal) -> Result<AccessContext> {
    let assigned = match principal.role {
      Role::Conseiller => self.assigned_sites(principal.id).await?,
      Role::Superadmin | Role::Admin | Role::Superviseur => BTreeSet::new(),
    };
    Ok(AccessContext::new(principal, assigned))
  }

  /// Sites assigned to `conseiller`; empty when there are none.
  pub async fn assigned_sites(&self, conseiller: UserId) -> Result<BTreeSet<SiteId>> {
    self
      .store
      .assigned_site_ids(conseiller)
      .await
      .map_err(Error::infrastructure)
  }

  /// Make `site_ids` the complete assignment set of `conseiller`.
  ///
  /// This is a replace, not a merge: sites previously assigned and absent
  /// from `site_ids` lose the assignment. Validation and write run in one
  /// store transaction; on any validation failure nothing changes.
  pub async fn assign_sites(
    &self,
    actor: &Principal,
    conseiller: UserId,
    site_ids: BTreeSet<SiteId>,
  ) -> Result<()> {
    if let Err(e) = check_actor(actor) {
      tracing::debug!(actor = %actor.id, error = %e, "assignment refused");
      return Err(e.into());
    }

    let requested = site_ids.clone();
    let count = site_ids.len();
    let outcome = self
      .store
      .replace_assignments(conseiller, site_ids, move |snapshot| {
        validate_assignment(conseiller, &requested, snapshot)
      })
      .await
      .map_err(Error::infrastructure)?;

    match outcome {
      Ok(()) => {
        tracing::info!(actor = %actor.id, %conseiller, sites = count, "assignments replaced");
        Ok(())
      }
      Err(e) => {
        tracing::debug!(actor = %actor.id, %conseiller, error = %e, "assignment rejected");
        Err(e.into())
      }
    }
  }

  /// Remove one assignment edge. Removing an absent edge succeeds.
  pub async fn unassign_site(
    &self,
    actor: &Principal,
    conseiller: UserId,
    site: SiteId,
  ) -> Result<()> {
    check_actor(actor)?;
    self
      .store
      .remove_assignment(conseiller, site)
      .await
      .map_err(Error::infrastructure)?;
    tracing::info!(actor = %actor.id, %conseiller, %site, "assignment removed");
    Ok(())
  }

  /// Authorize deleting `site`, counting its dependent activities first.
  pub async fn authorize_site_deletion(
    &self,
    ctx: &AccessContext,
    site: &Site,
  ) -> Result<Decision> {
    let activity_count = self
      .store
      .count_activities_for_site(site.site_id)
      .await
      .map_err(Error::infrastructure)?;
    Ok(authorize(ctx, &Mutation::DeleteSite { site, activity_count }))
  }
}
