//! Handlers for `/activities` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/activities` | Optional `?site_id=…&status=…` |
//! | `POST`   | `/activities` | Region is taken from the site |
//! | `GET`    | `/activities/{id}` | 404 if absent or not visible |
//! | `PATCH`  | `/activities/{id}` | Business fields only |
//! | `DELETE` | `/activities/{id}` | Admin tier |
//! | `POST`   | `/activities/{id}/transition` | Body: `{"status":"approuve"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use terroir_core::{
  activity::{
    Activity, ActivityDetails, ActivityPatch, ActivityStatus, GuardedWrite, NewActivity,
  },
  filter::ActivityQuery,
  id::{ActivityId, SiteId},
  store::FieldStore,
};
use terroir_policy::{
  AccessContext, DenyReason, EntityKind, Mutation, authorize, transition_activity,
  visibility::can_view_activity, visibility_predicate,
};

use crate::{AppState, auth::Caller, error::ApiError, sites};

async fn fetch_visible<S: FieldStore>(
  store: &S,
  ctx: &AccessContext,
  id: ActivityId,
) -> Result<Activity, ApiError> {
  store
    .get_activity(id)
    .await
    .map_err(ApiError::store)?
    .filter(|activity| can_view_activity(ctx, activity))
    .ok_or_else(|| ApiError::not_found("activity", id))
}

fn check_details(details: &ActivityDetails) -> Result<(), ApiError> {
  if details.kind.trim().is_empty() {
    return Err(ApiError::BadRequest("activity kind must not be empty".into()));
  }
  if details.duration_minutes == 0 {
    return Err(ApiError::BadRequest("duration must be at least one minute".into()));
  }
  Ok(())
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /activities[?site_id=<id>][&status=<status>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let filter = visibility_predicate(&ctx, EntityKind::Activity);
  let activities =
    state.store.list_activities(&filter, &query).await.map_err(ApiError::store)?;
  Ok(Json(activities))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub site_id: SiteId,
  #[serde(flatten)]
  pub details: ActivityDetails,
}

/// `POST /activities`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let site = sites::fetch_visible(state.store.as_ref(), &ctx, body.site_id).await?;
  authorize(&ctx, &Mutation::CreateActivity { site: &site }).into_result()?;
  check_details(&body.details)?;

  let input = NewActivity::on_site(&site, ctx.principal().id, body.details);
  let activity = state.store.add_activity(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(activity)))
}

// ─── Get / update / delete ───────────────────────────────────────────────────

/// `GET /activities/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<ActivityId>,
) -> Result<Json<Activity>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  Ok(Json(fetch_visible(state.store.as_ref(), &ctx, id).await?))
}

/// `PATCH /activities/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<ActivityId>,
  Json(patch): Json<ActivityPatch>,
) -> Result<Json<Activity>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let activity = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  authorize(&ctx, &Mutation::UpdateActivity { activity: &activity }).into_result()?;
  check_details(&patch.clone().apply(activity.details.clone()))?;

  match state
    .store
    .update_activity(id, activity.status, patch)
    .await
    .map_err(ApiError::store)?
  {
    GuardedWrite::Written(updated) => Ok(Json(updated)),
    GuardedWrite::Stale(current) => {
      // Reviewed in the meantime: judge the edit against the row as it is now.
      authorize(&ctx, &Mutation::UpdateActivity { activity: &current }).into_result()?;
      Err(ApiError::Conflict(format!("activity {id} was reviewed while being edited")))
    }
    GuardedWrite::Missing => Err(ApiError::not_found("activity", id)),
  }
}

/// `DELETE /activities/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<ActivityId>,
) -> Result<StatusCode, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let activity = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  authorize(&ctx, &Mutation::DeleteActivity { activity: &activity }).into_result()?;

  state.store.delete_activity(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub status: ActivityStatus,
}

/// `POST /activities/{id}/transition`
pub async fn transition<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Path(id): Path<ActivityId>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<Activity>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let activity = fetch_visible(state.store.as_ref(), &ctx, id).await?;
  transition_activity(&ctx, &activity, body.status).into_result()?;

  let reviewed = match state
    .store
    .set_activity_status(id, body.status, ctx.principal().id)
    .await
    .map_err(ApiError::store)?
  {
    GuardedWrite::Written(reviewed) => reviewed,
    GuardedWrite::Stale(current) => {
      return Err(
        DenyReason::AlreadyFinalized { activity: id, status: current.status }.into(),
      );
    }
    GuardedWrite::Missing => return Err(ApiError::not_found("activity", id)),
  };
  tracing::info!(
    activity = %id,
    reviewer = %ctx.principal().id,
    status = %body.status,
    "activity reviewed"
  );
  Ok(Json(reviewed))
}
