//! Engine tests against an in-memory `SqliteStore`.

use std::{collections::BTreeSet, sync::Arc};

use chrono::NaiveDate;
use terroir_core::{
  activity::{
    ActivityDetails, ActivityPatch, ActivityStatus, GuardedWrite, NewActivity,
  },
  assignment::{AssignmentError, Missing},
  filter::Predicate,
  id::{RegionId, SiteId, UserId},
  principal::{Principal, Role},
  site::{NewSite, Site},
  store::FieldStore,
  user::{NewUser, UserAccount},
};
use terroir_store_sqlite::SqliteStore;

use crate::{
  Decision, DenyReason, EntityKind, Error, Mutation, authorize, transition_activity,
  visibility_predicate,
};

type TestEngine = crate::Engine<SqliteStore>;

async fn engine() -> TestEngine {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  crate::Engine::new(Arc::new(store))
}

async fn region(e: &TestEngine, name: &str) -> RegionId {
  e.store().add_region(name.to_owned()).await.unwrap().region_id
}

async fn user(e: &TestEngine, username: &str, role: Role, regions: &[RegionId]) -> UserAccount {
  e.store()
    .add_user(NewUser {
      username:      username.to_owned(),
      display_name:  username.to_owned(),
      role,
      region_ids:    regions.iter().copied().collect(),
      password_hash: String::new(),
    })
    .await
    .unwrap()
}

async fn site(e: &TestEngine, name: &str, region_id: RegionId) -> Site {
  e.store()
    .add_site(NewSite {
      name: name.to_owned(),
      region_id,
      locality: None,
      latitude: None,
      longitude: None,
    })
    .await
    .unwrap()
}

fn details() -> ActivityDetails {
  ActivityDetails {
    kind:             "démonstration".into(),
    theme:            None,
    duration_minutes: 60,
    performed_on:     NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
    comments:         None,
    photos:           vec![],
  }
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_replaces_previous_set() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let a = site(&e, "a", r).await;
  let b = site(&e, "b", r).await;

  e.assign_sites(&admin, c.user_id, BTreeSet::from([a.site_id])).await.unwrap();
  e.assign_sites(&admin, c.user_id, BTreeSet::from([b.site_id])).await.unwrap();

  assert_eq!(e.assigned_sites(c.user_id).await.unwrap(), BTreeSet::from([b.site_id]));
}

#[tokio::test]
async fn out_of_region_site_rejects_whole_request() {
  let e = engine().await;
  let r7 = region(&e, "r7").await;
  let r9 = region(&e, "r9").await;
  let admin = Principal::from(&user(&e, "root", Role::Superadmin, &[]).await);
  let c = user(&e, "c", Role::Conseiller, &[r7]).await;
  let s1 = site(&e, "s1", r7).await;
  let s2 = site(&e, "s2", r9).await;
  let s0 = site(&e, "s0", r7).await;
  e.assign_sites(&admin, c.user_id, BTreeSet::from([s0.site_id])).await.unwrap();

  let err = e
    .assign_sites(&admin, c.user_id, BTreeSet::from([s1.site_id, s2.site_id]))
    .await
    .unwrap_err();
  match err {
    Error::Assignment(AssignmentError::OutOfScope { sites, regions }) => {
      assert_eq!(sites, vec![s2.site_id]);
      assert_eq!(regions, vec![r7]);
    }
    other => panic!("unexpected error: {other:?}"),
  }

  assert_eq!(e.assigned_sites(c.user_id).await.unwrap(), BTreeSet::from([s0.site_id]));
}

#[tokio::test]
async fn assign_to_non_conseiller_rejected() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let sup = user(&e, "sup", Role::Superviseur, &[r]).await;
  let a = site(&e, "a", r).await;

  let err = e
    .assign_sites(&admin, sup.user_id, BTreeSet::from([a.site_id]))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Assignment(AssignmentError::RoleMismatch { role: Role::Superviseur, .. })
  ));
}

#[tokio::test]
async fn assign_reports_unknown_target_and_sites() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let ghost_user = UserId::generate();
  let ghost_site = SiteId::generate();

  let err = e.assign_sites(&admin, ghost_user, BTreeSet::new()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Assignment(AssignmentError::NotFound { what: Missing::User(u) }) if u == ghost_user
  ));

  let err = e
    .assign_sites(&admin, c.user_id, BTreeSet::from([ghost_site]))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Assignment(AssignmentError::NotFound { what: Missing::Sites(ref s) }) if s == &[ghost_site]
  ));
}

#[tokio::test]
async fn only_admin_tier_may_assign() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let sup = Principal::from(&user(&e, "sup", Role::Superviseur, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let a = site(&e, "a", r).await;

  let err = e
    .assign_sites(&sup, c.user_id, BTreeSet::from([a.site_id]))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Assignment(AssignmentError::NotPermitted { role: Role::Superviseur })
  ));
  assert!(e.assigned_sites(c.user_id).await.unwrap().is_empty());

  let err = e.unassign_site(&sup, c.user_id, a.site_id).await.unwrap_err();
  assert!(err.is_policy());
}

#[tokio::test]
async fn empty_request_clears_assignments() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let a = site(&e, "a", r).await;
  e.assign_sites(&admin, c.user_id, BTreeSet::from([a.site_id])).await.unwrap();

  e.assign_sites(&admin, c.user_id, BTreeSet::new()).await.unwrap();
  assert!(e.assigned_sites(c.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unassign_twice_succeeds() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let a = site(&e, "a", r).await;
  e.assign_sites(&admin, c.user_id, BTreeSet::from([a.site_id])).await.unwrap();

  e.unassign_site(&admin, c.user_id, a.site_id).await.unwrap();
  e.unassign_site(&admin, c.user_id, a.site_id).await.unwrap();
  assert!(e.assigned_sites(c.user_id).await.unwrap().is_empty());
}

// ─── Context ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn context_loads_assignments_for_conseiller() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = Principal::from(&user(&e, "admin", Role::Admin, &[r]).await);
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let a = site(&e, "a", r).await;
  e.assign_sites(&admin, c.user_id, BTreeSet::from([a.site_id])).await.unwrap();

  let ctx = e.context(Principal::from(&c)).await.unwrap();
  assert!(ctx.is_assigned(a.site_id));

  let sites = e
    .store()
    .list_sites(&visibility_predicate(&ctx, EntityKind::Site))
    .await
    .unwrap();
  assert_eq!(sites.len(), 1);

  let admin_ctx = e.context(admin).await.unwrap();
  assert!(admin_ctx.assigned_sites().is_empty());
}

#[tokio::test]
async fn admin_sees_only_own_regions() {
  let e = engine().await;
  let r2 = region(&e, "r2").await;
  let r5 = region(&e, "r5").await;
  let r8 = region(&e, "r8").await;
  let admin = user(&e, "admin", Role::Admin, &[r2, r5]).await;
  site(&e, "two", r2).await;
  site(&e, "five", r5).await;
  site(&e, "eight", r8).await;

  let ctx = e.context(Principal::from(&admin)).await.unwrap();
  let predicate = visibility_predicate(&ctx, EntityKind::Site);
  assert_eq!(predicate, Predicate::RegionIn { regions: BTreeSet::from([r2, r5]) });

  let names: BTreeSet<String> = e
    .store()
    .list_sites(&predicate)
    .await
    .unwrap()
    .into_iter()
    .map(|s| s.name)
    .collect();
  assert_eq!(names, BTreeSet::from(["two".to_owned(), "five".to_owned()]));
}

// ─── Deletion and workflow ───────────────────────────────────────────────────

#[tokio::test]
async fn site_with_activities_cannot_be_deleted() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = user(&e, "admin", Role::Admin, &[r]).await;
  let c = user(&e, "c", Role::Conseiller, &[r]).await;
  let st = site(&e, "plot", r).await;
  let ctx = e.context(Principal::from(&admin)).await.unwrap();

  assert!(e.authorize_site_deletion(&ctx, &st).await.unwrap().is_allowed());

  e.store()
    .add_activity(NewActivity::on_site(&st, c.user_id, details()))
    .await
    .unwrap();
  let decision = e.authorize_site_deletion(&ctx, &st).await.unwrap();
  assert_eq!(
    decision,
    Decision::Deny(DenyReason::HasDependents { site: st.site_id, activities: 1 })
  );
}

#[tokio::test]
async fn review_locks_the_author_out() {
  let e = engine().await;
  let r = region(&e, "r").await;
  let admin = user(&e, "admin", Role::Admin, &[r]).await;
  let p = user(&e, "p", Role::Conseiller, &[r]).await;
  let st = site(&e, "plot", r).await;
  e.assign_sites(&Principal::from(&admin), p.user_id, BTreeSet::from([st.site_id]))
    .await
    .unwrap();

  let p_ctx = e.context(Principal::from(&p)).await.unwrap();
  let admin_ctx = e.context(Principal::from(&admin)).await.unwrap();

  assert!(authorize(&p_ctx, &Mutation::CreateActivity { site: &st }).is_allowed());
  let act = e
    .store()
    .add_activity(NewActivity::on_site(&st, p.user_id, details()))
    .await
    .unwrap();

  assert!(authorize(&p_ctx, &Mutation::UpdateActivity { activity: &act }).is_allowed());
  let act = e
    .store()
    .update_activity(act.activity_id, act.status, ActivityPatch {
      duration_minutes: Some(90),
      ..Default::default()
    })
    .await
    .unwrap();
  let GuardedWrite::Written(act) = act else { panic!("pending edit was not written") };

  assert!(transition_activity(&admin_ctx, &act, ActivityStatus::Approuve).is_allowed());
  let act = e
    .store()
    .set_activity_status(act.activity_id, ActivityStatus::Approuve, admin.user_id)
    .await
    .unwrap();
  let GuardedWrite::Written(act) = act else { panic!("first decision was not written") };
  assert_eq!(act.reviewed_by, Some(admin.user_id));

  assert_eq!(
    authorize(&p_ctx, &Mutation::UpdateActivity { activity: &act }),
    Decision::Deny(DenyReason::LockedAfterReview {
      activity: act.activity_id,
      status:   ActivityStatus::Approuve,
    })
  );
  assert!(matches!(
    transition_activity(&admin_ctx, &act, ActivityStatus::Rejete),
    Decision::Deny(DenyReason::AlreadyFinalized { .. })
  ));
}
