//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Policy outcomes keep their structured reason in the body; backend
//! failures are logged and answered with a generic 500.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use terroir_core::assignment::AssignmentError;
use terroir_policy::DenyReason;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Denied(#[from] DenyReason),

  #[error(transparent)]
  Assignment(#[from] AssignmentError),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{what} {id}"))
  }
}

impl From<terroir_policy::Error> for ApiError {
  fn from(e: terroir_policy::Error) -> Self {
    match e {
      terroir_policy::Error::Assignment(e) => Self::Assignment(e),
      terroir_policy::Error::Denied(reason) => Self::Denied(reason),
      terroir_policy::Error::Infrastructure(e) => Self::Store(e),
    }
  }
}

fn deny_status(reason: &DenyReason) -> StatusCode {
  match reason {
    DenyReason::AlreadyFinalized { .. } | DenyReason::HasDependents { .. } => {
      StatusCode::CONFLICT
    }
    _ => StatusCode::FORBIDDEN,
  }
}

fn assignment_status(e: &AssignmentError) -> StatusCode {
  match e {
    AssignmentError::NotPermitted { .. } => StatusCode::FORBIDDEN,
    AssignmentError::NotFound { .. } => StatusCode::NOT_FOUND,
    AssignmentError::RoleMismatch { .. }
    | AssignmentError::NoRegion { .. }
    | AssignmentError::OutOfScope { .. } => StatusCode::UNPROCESSABLE_ENTITY,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"terroir\""),
        );
        res
      }
      ApiError::Denied(reason) => {
        let status = deny_status(&reason);
        (status, Json(json!({ "error": reason.to_string(), "detail": reason }))).into_response()
      }
      ApiError::Assignment(e) => {
        let status = assignment_status(&e);
        (status, Json(json!({ "error": e.to_string(), "detail": e }))).into_response()
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response(),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal server error" })),
        )
          .into_response()
      }
    }
  }
}
