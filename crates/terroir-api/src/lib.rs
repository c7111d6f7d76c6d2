//! JSON REST API for terroir.
//!
//! Exposes an axum [`Router`] backed by any [`FieldStore`]. Every handler
//! authenticates the caller with HTTP Basic auth, resolves an
//! [`AccessContext`](terroir_policy::AccessContext) once, and routes reads
//! through the visibility filter and writes through the mutation authorizer.

pub mod activities;
pub mod assignments;
pub mod auth;
pub mod error;
pub mod regions;
pub mod sites;
pub mod users;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use serde::Deserialize;
use terroir_core::{id::RegionId, store::FieldStore};
use terroir_policy::Engine;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: FieldStore> {
  pub store:  Arc<S>,
  pub engine: Engine<S>,
}

impl<S: FieldStore> AppState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { engine: Engine::new(Arc::clone(&store)), store }
  }
}

/// 400 unless `region` exists.
pub(crate) async fn require_region<S: FieldStore>(
  store: &S,
  region: RegionId,
) -> Result<(), ApiError> {
  let known = store.list_regions().await.map_err(ApiError::store)?;
  if known.iter().any(|r| r.region_id == region) {
    Ok(())
  } else {
    Err(ApiError::BadRequest(format!("region {region} does not exist")))
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FieldStore + Clone + 'static,
{
  Router::new()
    // Regions
    .route("/regions", get(regions::list::<S>).post(regions::create::<S>))
    // Sites
    .route("/sites", get(sites::list::<S>).post(sites::create::<S>))
    .route(
      "/sites/{id}",
      get(sites::get_one::<S>).patch(sites::update::<S>).delete(sites::delete::<S>),
    )
    // Activities
    .route("/activities", get(activities::list::<S>).post(activities::create::<S>))
    .route(
      "/activities/{id}",
      get(activities::get_one::<S>)
        .patch(activities::update::<S>)
        .delete(activities::delete::<S>),
    )
    .route("/activities/{id}/transition", post(activities::transition::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route(
      "/users/{id}",
      get(users::get_one::<S>).patch(users::update::<S>).delete(users::delete::<S>),
    )
    .route("/me", get(users::me::<S>))
    // Assignments
    .route(
      "/users/{id}/sites",
      get(assignments::list::<S>).put(assignments::replace::<S>),
    )
    .route("/users/{id}/sites/{site_id}", delete(assignments::remove::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use serde_json::{Value, json};
  use terroir_core::{
    principal::Role,
    site::{NewSite, Site},
    user::{NewUser, UserAccount},
  };
  use terroir_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::hash_password;

  struct Fixture {
    state: AppState<SqliteStore>,
    north: RegionId,
    south: RegionId,
    admin: UserAccount,
    sup:   UserAccount,
    agent: UserAccount,
    plot:  Site,
    far:   Site,
  }

  async fn add_site(store: &SqliteStore, name: &str, region_id: RegionId) -> Site {
    store
      .add_site(NewSite {
        name: name.into(),
        region_id,
        locality: None,
        latitude: None,
        longitude: None,
      })
      .await
      .unwrap()
  }

  /// Two regions, one account per role (all with password `secret`), and
  /// one site in each region.
  async fn fixture() -> Fixture {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let hash = hash_password("secret").unwrap();

    let north = store.add_region("Nord".into()).await.unwrap().region_id;
    let south = store.add_region("Sud".into()).await.unwrap().region_id;

    let mut accounts = Vec::new();
    for (username, role, regions) in [
      ("root", Role::Superadmin, vec![]),
      ("admin", Role::Admin, vec![north]),
      ("sup", Role::Superviseur, vec![north]),
      ("agent", Role::Conseiller, vec![north]),
    ] {
      let account = store
        .add_user(NewUser {
          username:      username.into(),
          display_name:  username.to_uppercase(),
          role,
          region_ids:    regions.into_iter().collect(),
          password_hash: hash.clone(),
        })
        .await
        .unwrap();
      accounts.push(account);
    }
    let [_root, admin, sup, agent]: [UserAccount; 4] = accounts.try_into().unwrap();

    let plot = add_site(&store, "Périmètre de Lokapli", north).await;
    let far = add_site(&store, "Bas-fond de Tiassalé", south).await;

    Fixture {
      state: AppState::new(Arc::new(store)),
      north,
      south,
      admin,
      sup,
      agent,
      plot,
      far,
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn call(
    state: &AppState<SqliteStore>,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(header::AUTHORIZATION, auth_header(user, "secret"));
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  async fn assign(f: &Fixture, sites: &[&Site]) {
    let ids: Vec<String> = sites.iter().map(|s| s.site_id.to_string()).collect();
    let (status, _) = call(
      &f.state,
      Method::PUT,
      &format!("/users/{}/sites", f.agent.user_id),
      Some("root"),
      Some(json!({ "site_ids": ids })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }

  fn activity_body(site: &Site) -> Value {
    json!({
      "site_id": site.site_id,
      "kind": "formation",
      "theme": "compostage",
      "duration_minutes": 90,
      "performed_on": "2024-06-03",
    })
  }

  fn names(list: &Value) -> BTreeSet<String> {
    list
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v["name"].as_str().unwrap().to_owned())
      .collect()
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_credentials_are_rejected() {
    let f = fixture().await;
    let (status, _) = call(&f.state, Method::GET, "/sites", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let f = fixture().await;
    let req = Request::builder()
      .uri("/me")
      .header(header::AUTHORIZATION, auth_header("admin", "nope"))
      .body(Body::empty())
      .unwrap();
    let resp = router(f.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn me_reports_account_and_assignments() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;

    let (status, me) = call(&f.state, Method::GET, "/me", Some("agent"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "agent");
    assert_eq!(me["role"], "conseiller");
    assert_eq!(me["assigned_site_ids"], json!([f.plot.site_id]));
  }

  // ── Visibility ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sites_are_filtered_by_region() {
    let f = fixture().await;

    let (_, all) = call(&f.state, Method::GET, "/sites", Some("root"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, mine) = call(&f.state, Method::GET, "/sites", Some("admin"), None).await;
    assert_eq!(names(&mine), BTreeSet::from(["Périmètre de Lokapli".to_owned()]));

    let uri = format!("/sites/{}", f.far.site_id);
    let (status, _) = call(&f.state, Method::GET, &uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn conseiller_sees_only_assigned_sites() {
    let f = fixture().await;

    let (_, before) = call(&f.state, Method::GET, "/sites", Some("agent"), None).await;
    assert_eq!(before, json!([]));

    assign(&f, &[&f.plot]).await;
    let (_, after) = call(&f.state, Method::GET, "/sites", Some("agent"), None).await;
    assert_eq!(names(&after), BTreeSet::from(["Périmètre de Lokapli".to_owned()]));
  }

  #[tokio::test]
  async fn users_are_filtered_by_region_overlap() {
    let f = fixture().await;

    let (_, seen) = call(&f.state, Method::GET, "/users", Some("sup"), None).await;
    let usernames: BTreeSet<&str> =
      seen.as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(usernames, BTreeSet::from(["admin", "agent", "sup"]));

    let (_, own) = call(&f.state, Method::GET, "/users", Some("agent"), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["username"], "agent");
  }

  // ── Assignments ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn out_of_region_assignment_is_unprocessable() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;

    let uri = format!("/users/{}/sites", f.agent.user_id);
    let (status, body) = call(
      &f.state,
      Method::PUT,
      &uri,
      Some("root"),
      Some(json!({ "site_ids": [f.plot.site_id, f.far.site_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"]["error"], "out_of_scope");
    assert_eq!(body["detail"]["sites"], json!([f.far.site_id]));
    assert_eq!(body["detail"]["regions"], json!([f.north]));

    let (_, kept) = call(&f.state, Method::GET, &uri, Some("root"), None).await;
    assert_eq!(kept.as_array().unwrap().len(), 1);
    assert_eq!(kept[0]["site_id"], json!(f.plot.site_id));
  }

  #[tokio::test]
  async fn superviseur_cannot_assign() {
    let f = fixture().await;
    let uri = format!("/users/{}/sites", f.agent.user_id);
    let (status, _) = call(
      &f.state,
      Method::PUT,
      &uri,
      Some("sup"),
      Some(json!({ "site_ids": [f.plot.site_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn unassign_is_idempotent() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;

    let uri = format!("/users/{}/sites/{}", f.agent.user_id, f.plot.site_id);
    for _ in 0..2 {
      let (status, _) = call(&f.state, Method::DELETE, &uri, Some("admin"), None).await;
      assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (_, sites) = call(&f.state, Method::GET, "/sites", Some("agent"), None).await;
    assert_eq!(sites, json!([]));
  }

  #[tokio::test]
  async fn region_change_prunes_assignments() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;

    let (status, updated) = call(
      &f.state,
      Method::PATCH,
      &format!("/users/{}", f.agent.user_id),
      Some("root"),
      Some(json!({ "region_ids": [f.south] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["region_ids"], json!([f.south]));

    let uri = format!("/users/{}/sites", f.agent.user_id);
    let (_, sites) = call(&f.state, Method::GET, &uri, Some("root"), None).await;
    assert_eq!(sites, json!([]));
  }

  // ── Activities ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn review_locks_the_author_out() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;

    let (status, created) =
      call(&f.state, Method::POST, "/activities", Some("agent"), Some(activity_body(&f.plot)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "en_attente");
    assert_eq!(created["region_id"], json!(f.north));
    let uri = format!("/activities/{}", created["activity_id"].as_str().unwrap());

    let patch = json!({ "duration_minutes": 120 });
    let (status, edited) =
      call(&f.state, Method::PATCH, &uri, Some("agent"), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["duration_minutes"], 120);

    let (status, reviewed) = call(
      &f.state,
      Method::POST,
      &format!("{uri}/transition"),
      Some("sup"),
      Some(json!({ "status": "approuve" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approuve");
    assert_eq!(reviewed["reviewed_by"], json!(f.sup.user_id));

    let (status, denied) = call(&f.state, Method::PATCH, &uri, Some("agent"), Some(patch)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(denied["detail"]["reason"], "locked_after_review");

    let (status, _) = call(
      &f.state,
      Method::POST,
      &format!("{uri}/transition"),
      Some("admin"),
      Some(json!({ "status": "rejete" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn conseiller_cannot_record_on_unassigned_site() {
    let f = fixture().await;
    let (status, _) =
      call(&f.state, Method::POST, "/activities", Some("agent"), Some(activity_body(&f.plot)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn conseiller_lists_only_own_activities() {
    let f = fixture().await;
    assign(&f, &[&f.plot]).await;
    let body = activity_body(&f.plot);
    call(&f.state, Method::POST, "/activities", Some("agent"), Some(body.clone())).await;
    call(&f.state, Method::POST, "/activities", Some("admin"), Some(body)).await;

    let (_, mine) = call(&f.state, Method::GET, "/activities", Some("agent"), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["created_by"], json!(f.agent.user_id));

    let (_, all) = call(&f.state, Method::GET, "/activities", Some("sup"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, pending) =
      call(&f.state, Method::GET, "/activities?status=approuve", Some("sup"), None).await;
    assert_eq!(pending, json!([]));
  }

  #[tokio::test]
  async fn concurrent_reviews_decide_once() {
    let f = fixture().await;
    let (_, created) =
      call(&f.state, Method::POST, "/activities", Some("admin"), Some(activity_body(&f.plot)))
        .await;
    let uri = format!("/activities/{}/transition", created["activity_id"].as_str().unwrap());

    let ((first, _), (second, _)) = tokio::join!(
      call(&f.state, Method::POST, &uri, Some("admin"), Some(json!({ "status": "approuve" }))),
      call(&f.state, Method::POST, &uri, Some("sup"), Some(json!({ "status": "rejete" }))),
    );
    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

    let act_uri = format!("/activities/{}", created["activity_id"].as_str().unwrap());
    let (_, stored) = call(&f.state, Method::GET, &act_uri, Some("root"), None).await;
    let expected_reviewer = if first == StatusCode::OK { &f.admin } else { &f.sup };
    assert_eq!(stored["reviewed_by"], json!(expected_reviewer.user_id));
  }

  #[tokio::test]
  async fn activity_list_narrows_by_site_and_status() {
    let f = fixture().await;
    let body = activity_body(&f.plot);
    call(&f.state, Method::POST, "/activities", Some("admin"), Some(body.clone())).await;
    let (_, second) = call(&f.state, Method::POST, "/activities", Some("admin"), Some(body)).await;
    call(&f.state, Method::POST, "/activities", Some("root"), Some(activity_body(&f.far))).await;
    call(
      &f.state,
      Method::POST,
      &format!("/activities/{}/transition", second["activity_id"].as_str().unwrap()),
      Some("sup"),
      Some(json!({ "status": "rejete" })),
    )
    .await;

    let (_, all) = call(&f.state, Method::GET, "/activities", Some("root"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let on_plot = format!("/activities?site_id={}", f.plot.site_id);
    let (_, listed) = call(&f.state, Method::GET, &on_plot, Some("root"), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let (_, rejected) =
      call(&f.state, Method::GET, &format!("{on_plot}&status=rejete"), Some("root"), None).await;
    assert_eq!(rejected.as_array().unwrap().len(), 1);
    assert_eq!(rejected[0]["activity_id"], second["activity_id"]);

    // The far site is in the south; the admin's filter never reaches it.
    let on_far = format!("/activities?site_id={}", f.far.site_id);
    let (_, hidden) = call(&f.state, Method::GET, &on_far, Some("admin"), None).await;
    assert_eq!(hidden, json!([]));
  }

  #[tokio::test]
  async fn site_with_activities_cannot_be_deleted() {
    let f = fixture().await;
    let (_, created) =
      call(&f.state, Method::POST, "/activities", Some("admin"), Some(activity_body(&f.plot)))
        .await;
    let site_uri = format!("/sites/{}", f.plot.site_id);

    let (status, body) = call(&f.state, Method::DELETE, &site_uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"]["reason"], "has_dependents");

    let act_uri = format!("/activities/{}", created["activity_id"].as_str().unwrap());
    let (status, _) = call(&f.state, Method::DELETE, &act_uri, Some("sup"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&f.state, Method::DELETE, &act_uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&f.state, Method::DELETE, &site_uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  // ── Accounts and regions ────────────────────────────────────────────────────

  #[tokio::test]
  async fn only_superadmin_deletes_accounts() {
    let f = fixture().await;
    let uri = format!("/users/{}", f.agent.user_id);

    let (status, _) = call(&f.state, Method::DELETE, &uri, Some("admin"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&f.state, Method::DELETE, &uri, Some("root"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&f.state, Method::GET, &uri, Some("root"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn account_creation_rules() {
    let f = fixture().await;
    let new_user = |username: &str, role: &str| {
      json!({
        "username": username,
        "display_name": "Aya",
        "role": role,
        "region_ids": [f.north],
        "password": "pw",
      })
    };

    let (status, _) =
      call(&f.state, Method::POST, "/users", Some("admin"), Some(new_user("boss", "superadmin")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
      call(&f.state, Method::POST, "/users", Some("admin"), Some(new_user("agent", "conseiller")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, created) =
      call(&f.state, Method::POST, "/users", Some("admin"), Some(new_user("aya", "conseiller")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "conseiller");
    assert!(created.get("password_hash").is_none());

    let req = Request::builder()
      .uri("/me")
      .header(header::AUTHORIZATION, auth_header("aya", "pw"))
      .body(Body::empty())
      .unwrap();
    let resp = router(f.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn admin_cannot_widen_its_own_regions() {
    let f = fixture().await;
    let uri = format!("/users/{}", f.admin.user_id);

    let (status, body) = call(
      &f.state,
      Method::PATCH,
      &uri,
      Some("admin"),
      Some(json!({ "region_ids": [f.north, f.south] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["reason"], "own_access_protected");

    let (status, _) =
      call(&f.state, Method::PATCH, &uri, Some("admin"), Some(json!({ "role": "superviseur" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = call(
      &f.state,
      Method::PATCH,
      &uri,
      Some("admin"),
      Some(json!({ "display_name": "Koffi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["region_ids"], json!([f.north]));

    let (_, sites) = call(&f.state, Method::GET, "/sites", Some("admin"), None).await;
    assert_eq!(names(&sites), BTreeSet::from(["Périmètre de Lokapli".to_owned()]));
  }

  #[tokio::test]
  async fn admin_grants_only_its_own_regions() {
    let f = fixture().await;

    let (status, body) = call(
      &f.state,
      Method::PATCH,
      &format!("/users/{}", f.agent.user_id),
      Some("admin"),
      Some(json!({ "region_ids": [f.north, f.south] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"]["reason"], "region_out_of_scope");

    let (status, _) = call(
      &f.state,
      Method::POST,
      "/users",
      Some("admin"),
      Some(json!({
        "username": "yao",
        "display_name": "Yao",
        "role": "admin",
        "region_ids": [f.south],
        "password": "pw",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
      &f.state,
      Method::PATCH,
      &format!("/users/{}", f.agent.user_id),
      Some("root"),
      Some(json!({ "region_ids": [f.north, f.south] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn regions_are_added_by_superadmin_only() {
    let f = fixture().await;
    let body = json!({ "name": "Centre" });

    let (status, _) =
      call(&f.state, Method::POST, "/regions", Some("admin"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&f.state, Method::POST, "/regions", Some("root"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, regions) = call(&f.state, Method::GET, "/regions", Some("agent"), None).await;
    assert_eq!(regions.as_array().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn site_region_must_be_in_scope() {
    let f = fixture().await;
    let body = |region: RegionId| json!({ "name": "Nouveau", "region_id": region });

    let (status, _) =
      call(&f.state, Method::POST, "/sites", Some("admin"), Some(body(f.south))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, site) =
      call(&f.state, Method::POST, "/sites", Some("admin"), Some(body(f.north))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(site["region_id"], json!(f.north));
  }
}
