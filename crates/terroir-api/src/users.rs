//! Handlers for `/users` and `/me`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | Accounts sharing a region with the caller |
//! | `POST`   | `/users` | Admin tier, regions within the caller's; only a superadmin grants `superadmin` |
//! | `GET`    | `/users/{id}` | 404 if absent or not visible |
//! | `PATCH`  | `/users/{id}` | Admin tier; never the caller's own role or regions |
//! | `DELETE` | `/users/{id}` | Superadmin only |
//! | `GET`    | `/me` | The caller's own account and assignments |

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use terroir_core::{
  id::{RegionId, SiteId, UserId},
  principal::Role,
  store::FieldStore,
  user::{NewUser, UserAccount, UserPatch},
};
use terroir_policy::{
  AccessContext, EntityKind, Mutation, authorize, visibility::can_view_user,
  visibility_predicate,
};

use crate::{
  AppState,
  auth::{Caller, hash_password},
  error::ApiError,
  require_region,
};

pub(crate) async fn fetch_visible<S: FieldStore>(
  store: &S,
  ctx: &AccessContext,
  id: UserId,
) -> Result<UserAccount, ApiError> {
  store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .filter(|account| can_view_user(ctx, account))
    .ok_or_else(|| ApiError::not_found("user", id))
}

async fn require_regions<S: FieldStore>(
  store: &S,
  regions: &BTreeSet<RegionId>,
) -> Result<(), ApiError> {
  for region in regions {
    require_region(store, *region).await?;
  }
  Ok(())
}

fn hash(password: &str) -> Result<String, ApiError> {
  if password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".into()));
  }
  hash_password(password).map_err(|e| ApiError::Store(e.to_string().into()))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<Vec<UserAccount>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let filter = visibility_predicate(&ctx, EntityKind::User);
  let users = state.store.list_users(&filter).await.map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub username:     String,
  pub display_name: String,
  pub role:         Role,
  #[serde(default)]
  pub region_ids:   BTreeSet<RegionId>,
  pub password:     String,
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  authorize(&ctx, &Mutation::CreateUser { role: body.role, region_ids: &body.region_ids })
    .into_result()?;

  let username = body.username.trim();
  if username.is_empty() || username.contains(':') {
    return Err(ApiError::BadRequest("username must be non-empty and contain no ':'".into()));
  }
  require_regions(state.store.as_ref(), &body.region_ids).await?;
  if state.store.find_credentials(username).await.map_err(ApiError::store)?.is_some() {
    return Err(ApiError::Conflict(format!("username {username:?} is already taken")));
  }

  let account = state
    .store
    .add_user(NewUser {
      username:      username.to_owned(),
      display_name:  body.display_name,
      role:          body.role,
      region_ids:    body.region_ids,
      password_hash: hash(&body.password)?,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    by = %ctx.principal().id,
    user = %account.user_id,
    role = %account.role,
    "account created"
  );
  Ok((StatusCode::CREATED, Json(account)))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<UserId>,
) -> Result<Json<UserAccount>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  Ok(Json(fetch_visible(state.store.as_ref(), &ctx, id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub display_name: Option<String>,
  pub role:         Option<Role>,
  pub region_ids:   Option<BTreeSet<RegionId>>,
  pub password:     Option<String>,
}

/// `PATCH /users/{id}`
///
/// Replacing `region_ids` drops the assignments that fall outside the new
/// regions.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<UserId>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<UserAccount>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let account = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  authorize(&ctx, &Mutation::UpdateUser {
    account:     &account,
    new_role:    body.role,
    new_regions: body.region_ids.as_ref(),
  })
  .into_result()?;
  if let Some(regions) = &body.region_ids {
    require_regions(state.store.as_ref(), regions).await?;
  }

  let patch = UserPatch {
    display_name:  body.display_name,
    role:          body.role,
    region_ids:    body.region_ids,
    password_hash: body.password.as_deref().map(hash).transpose()?,
  };
  let updated = state
    .store
    .update_user(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("user", id))?;
  Ok(Json(updated))
}

/// `DELETE /users/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let account = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  authorize(&ctx, &Mutation::DeleteUser { account: &account }).into_result()?;
  if account.user_id == ctx.principal().id {
    return Err(ApiError::BadRequest("you cannot delete your own account".into()));
  }

  state.store.delete_user(id).await.map_err(ApiError::store)?;
  tracing::info!(by = %ctx.principal().id, user = %id, "account deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Me ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Me {
  #[serde(flatten)]
  pub account:           UserAccount,
  pub assigned_site_ids: BTreeSet<SiteId>,
}

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<Me>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let id = ctx.principal().id;
  let account = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("user", id))?;
  Ok(Json(Me { account, assigned_site_ids: ctx.assigned_sites().clone() }))
}
