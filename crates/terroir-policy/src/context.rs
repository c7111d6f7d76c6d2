//! Per-request access context.

use std::collections::BTreeSet;

use terroir_core::{
  id::SiteId,
  principal::{Principal, Role},
};

use crate::scope::{Scope, resolve_scope};

/// A principal together with everything the decision functions need to know
/// about it: its resolved region scope and, for conseillers, the sites
/// assigned to it. Built once per request and then only read.
#[derive(Debug, Clone)]
pub struct AccessContext {
  principal:      Principal,
  scope:          Scope,
  assigned_sites: BTreeSet<SiteId>,
}

impl AccessContext {
  /// Build a context. `assigned_sites` is only kept for conseillers; for
  /// every other role site access is decided by region, never by assignment.
  pub fn new(principal: Principal, assigned_sites: BTreeSet<SiteId>) -> Self {
    let scope = resolve_scope(&principal);
    let assigned_sites = match principal.role {
      Role::Conseiller => assigned_sites,
      Role::Superadmin | Role::Admin | Role::Superviseur => BTreeSet::new(),
    };
    Self { principal, scope, assigned_sites }
  }

  pub fn principal(&self) -> &Principal { &self.principal }

  pub fn role(&self) -> Role { self.principal.role }

  pub fn scope(&self) -> &Scope { &self.scope }

  pub fn assigned_sites(&self) -> &BTreeSet<SiteId> { &self.assigned_sites }

  pub fn is_assigned(&self, site: SiteId) -> bool {
    self.assigned_sites.contains(&site)
  }
}
