//! The `FieldStore` trait, the persistence collaborator.
//!
//! The trait is implemented by storage backends (e.g. `terroir-store-sqlite`).
//! The policy engine and the HTTP layer depend on this abstraction, not on any
//! concrete backend. Reads that list rows take a [`Predicate`] produced by the
//! visibility rules; backends must translate it faithfully (in particular,
//! [`Predicate::Nothing`] selects zero rows).

use std::{collections::BTreeSet, future::Future};

use crate::{
  activity::{Activity, ActivityPatch, ActivityStatus, GuardedWrite, NewActivity},
  assignment::{AssignmentError, AssignmentSnapshot},
  filter::{ActivityQuery, Predicate},
  id::{ActivityId, RegionId, SiteId, UserId},
  region::Region,
  site::{NewSite, Site, SitePatch},
  user::{NewUser, UserAccount, UserPatch},
};

/// Abstraction over a terroir storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FieldStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Regions ───────────────────────────────────────────────────────────

  fn add_region(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Region, Self::Error>> + Send + '_;

  fn list_regions(
    &self,
  ) -> impl Future<Output = Result<Vec<Region>, Self::Error>> + Send + '_;

  /// Regions the user belongs to; empty if the user is unknown.
  fn list_regions_of(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<BTreeSet<RegionId>, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserAccount, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by username.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<(UserAccount, String)>, Self::Error>>
  + Send
  + 'a;

  /// Apply `patch`. Replacing the region set drops assignments to sites
  /// outside the new set; leaving the conseiller role drops all assignments.
  /// Both happen in the same transaction as the update. Returns `None` if the
  /// user does not exist.
  fn update_user(
    &self,
    id: UserId,
    patch: UserPatch,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + '_;

  /// Returns `false` if the user did not exist.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_users<'a>(
    &'a self,
    filter: &'a Predicate,
  ) -> impl Future<Output = Result<Vec<UserAccount>, Self::Error>> + Send + 'a;

  fn count_users(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Sites ─────────────────────────────────────────────────────────────

  fn add_site(
    &self,
    input: NewSite,
  ) -> impl Future<Output = Result<Site, Self::Error>> + Send + '_;

  /// Retrieve a site with its `assigned_user_ids` populated.
  fn get_site(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<Option<Site>, Self::Error>> + Send + '_;

  fn update_site(
    &self,
    id: SiteId,
    patch: SitePatch,
  ) -> impl Future<Output = Result<Option<Site>, Self::Error>> + Send + '_;

  /// Delete a site together with its assignment edges. Returns `false` if the
  /// site did not exist.
  fn delete_site(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_sites<'a>(
    &'a self,
    filter: &'a Predicate,
  ) -> impl Future<Output = Result<Vec<Site>, Self::Error>> + Send + 'a;

  /// Number of activities referencing the site.
  fn count_activities_for_site(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  /// Persist a new activity in `EnAttente` status.
  fn add_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  fn get_activity(
    &self,
    id: ActivityId,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Apply `patch` if the activity is still in `expected` status; the check
  /// and the write are atomic.
  fn update_activity(
    &self,
    id: ActivityId,
    expected: ActivityStatus,
    patch: ActivityPatch,
  ) -> impl Future<Output = Result<GuardedWrite, Self::Error>> + Send + '_;

  /// Record a review decision: sets `status`, `reviewed_by` and `reviewed_at`.
  /// Applies only to an activity still `EnAttente`, so of two concurrent
  /// decisions exactly one is written.
  fn set_activity_status(
    &self,
    id: ActivityId,
    status: ActivityStatus,
    reviewer: UserId,
  ) -> impl Future<Output = Result<GuardedWrite, Self::Error>> + Send + '_;

  fn delete_activity(
    &self,
    id: ActivityId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Activities matching both `filter` and `query`.
  fn list_activities<'a>(
    &'a self,
    filter: &'a Predicate,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + 'a;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Ids of the sites assigned to the user; empty if none.
  fn assigned_site_ids(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<BTreeSet<SiteId>, Self::Error>> + Send + '_;

  /// Replace the user's whole assignment set with `site_ids`, as one
  /// transaction.
  ///
  /// The backend reads an [`AssignmentSnapshot`] inside the transaction and
  /// calls `validate` on it. If validation fails, nothing is written and the
  /// error is returned in the inner `Result`; the outer `Result` only carries
  /// backend failures.
  fn replace_assignments<V>(
    &self,
    user_id: UserId,
    site_ids: BTreeSet<SiteId>,
    validate: V,
  ) -> impl Future<Output = Result<Result<(), AssignmentError>, Self::Error>>
  + Send
  + '_
  where
    V: FnOnce(&AssignmentSnapshot) -> Result<(), AssignmentError> + Send + 'static;

  /// Remove a single edge. Removing an edge that does not exist is not an
  /// error.
  fn remove_assignment(
    &self,
    user_id: UserId,
    site_id: SiteId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
