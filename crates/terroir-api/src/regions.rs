//! Handlers for `/regions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/regions` | Every authenticated caller |
//! | `POST` | `/regions` | Superadmin only. Body: `{"name":"Gbêkê"}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use terroir_core::{region::Region, store::FieldStore};
use terroir_policy::authorize_region_write;

use crate::{AppState, auth::Caller, error::ApiError};

/// `GET /regions`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
) -> Result<Json<Vec<Region>>, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  let regions = state.store.list_regions().await.map_err(ApiError::store)?;
  Ok(Json(regions))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /regions`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(ctx): Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FieldStore + Clone + 'static,
{
  authorize_region_write(&ctx).into_result()?;

  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("region name must not be empty".into()));
  }
  let existing = state.store.list_regions().await.map_err(ApiError::store)?;
  if existing.iter().any(|r| r.name == name) {
    return Err(ApiError::Conflict(format!("region {name:?} already exists")));
  }

  let region = state.store.add_region(name.to_owned()).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(region)))
}
