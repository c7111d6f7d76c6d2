//! Handlers for a conseiller's site assignments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users/{id}/sites` | Assigned sites visible to the caller |
//! | `PUT`    | `/users/{id}/sites` | Full replace. Body: `{"site_ids":[…]}` |
//! | `DELETE` | `/users/{id}/sites/{site_id}` | Idempotent |

use std::collections::BTreeSet;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;
use terroir_core::{
  filter::Predicate,
  id::{SiteId, UserId},
  site::Site,
  store::FieldStore,
};
use terroir_policy::{AccessContext, visibility::can_view_site};

use crate::{AppState, auth::Caller, error::ApiError, users};

async fn assigned_sites<S: FieldStore>(
  state: &AppState<S>,
  ctx: &AccessContext,
  conseiller: UserId,
) -> Result<Vec<Site>, ApiError> {
  let ids = state.engine.assigned_sites(conseiller).await?;
  let mut sites = state
    .store
    .list_sites(&Predicate::site_id_in(ids))
    .await
    .map_err(ApiError::store)?;
  sites.retain(|site| can_view_site(ctx, site));
  Ok(sites)
}

/// `GET /users/{id}/sites`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<UserId>,
) -> Result<Json<Vec<Site>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  users::fetch_visible(state.store.as_ref(), &ctx, id).await?;
  Ok(Json(assigned_sites(&state, &ctx, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
  pub site_ids: BTreeSet<SiteId>,
}

/// `PUT /users/{id}/sites`
pub async fn replace<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<UserId>,
  Json(body): Json<ReplaceBody>,
) -> Result<Json<Vec<Site>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  users::fetch_visible(state.store.as_ref(), &ctx, id).await?;
  state.engine.assign_sites(ctx.principal(), id, body.site_ids).await?;
  Ok(Json(assigned_sites(&state, &ctx, id).await?))
}

/// `DELETE /users/{id}/sites/{site_id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path((id, site_id)): Path<(UserId, SiteId)>,
) -> Result<StatusCode, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  users::fetch_visible(state.store.as_ref(), &ctx, id).await?;
  state.engine.unassign_site(ctx.principal(), id, site_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
