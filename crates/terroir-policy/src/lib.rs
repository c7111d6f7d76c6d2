//! Authorization and workflow policy for terroir.
//!
//! Every decision about who may see or change a site, an activity or a user
//! account lives here. Request handlers resolve a [`Principal`] once, turn it
//! into an [`AccessContext`], and then ask:
//!
//! - [`visibility::visibility_predicate`] for the row filter of a read,
//! - [`mutation::authorize`] before any write,
//! - [`workflow::transition_activity`] before approving or rejecting,
//! - [`Engine::assign_sites`] to replace a conseiller's site assignments.
//!
//! The decision functions are synchronous and pure. Only [`Engine`] talks to
//! the [`FieldStore`](terroir_core::store::FieldStore).
//!
//! [`Principal`]: terroir_core::principal::Principal

pub mod assignment;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod mutation;
pub mod scope;
pub mod visibility;
pub mod workflow;

pub use context::AccessContext;
pub use decision::{Action, Decision, DenyReason};
pub use engine::Engine;
pub use error::{Error, Result};
pub use mutation::{Mutation, authorize, authorize_region_write};
pub use scope::{Scope, resolve_scope};
pub use visibility::{EntityKind, visibility_predicate};
pub use workflow::transition_activity;

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod tests;
