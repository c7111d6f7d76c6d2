//! Handlers for `/sites` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/sites` | Rows visible to the caller |
//! | `POST`   | `/sites` | Admin tier, region in scope |
//! | `GET`    | `/sites/{id}` | 404 if absent or not visible |
//! | `PATCH`  | `/sites/{id}` | Descriptive fields only; the region is fixed |
//! | `DELETE` | `/sites/{id}` | 409 while activities reference the site |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use terroir_core::{
  id::SiteId,
  site::{NewSite, Site, SitePatch},
  store::FieldStore,
};
use terroir_policy::{
  AccessContext, EntityKind, Mutation, authorize, visibility::can_view_site,
  visibility_predicate,
};

use crate::{AppState, auth::Caller, error::ApiError, require_region};

/// Fetch a site the caller may see; anything else is a 404.
pub(crate) async fn fetch_visible<S: FieldStore>(
  store: &S,
  ctx: &AccessContext,
  id: SiteId,
) -> Result<Site, ApiError> {
  store
    .get_site(id)
    .await
    .map_err(ApiError::store)?
    .filter(|site| can_view_site(ctx, site))
    .ok_or_else(|| ApiError::not_found("site", id))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /sites`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
) -> Result<Json<Vec<Site>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let filter = visibility_predicate(&ctx, EntityKind::Site);
  let sites = state.store.list_sites(&filter).await.map_err(ApiError::store)?;
  Ok(Json(sites))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /sites`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<NewSite>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  authorize(&ctx, &Mutation::CreateSite { region_id: body.region_id }).into_result()?;
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("site name must not be empty".into()));
  }
  require_region(state.store.as_ref(), body.region_id).await?;

  let site = state.store.add_site(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(site)))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /sites/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<SiteId>,
) -> Result<Json<Site>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  Ok(Json(fetch_visible(state.store.as_ref(), &ctx, id).await?))
}

/// `PATCH /sites/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<SiteId>,
  Json(patch): Json<SitePatch>,
) -> Result<Json<Site>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let site = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  authorize(&ctx, &Mutation::UpdateSite { site: &site }).into_result()?;

  let updated = state
    .store
    .update_site(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("site", id))?;
  Ok(Json(updated))
}

/// `DELETE /sites/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<SiteId>,
) -> Result<StatusCode, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let site = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  state.engine.authorize_site_deletion(&ctx, &site).await?.into_result()?;

  state.store.delete_site(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
