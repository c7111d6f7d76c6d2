//! HTTP Basic authentication against the accounts in the store.
//!
//! [`authenticate`] turns a credential into a [`Principal`]; the [`Caller`]
//! extractor then resolves the request's [`AccessContext`] through the
//! policy engine.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rand_core::OsRng;
use terroir_core::{principal::Principal, store::FieldStore};
use terroir_policy::AccessContext;

use crate::{AppState, error::ApiError};

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// `(username, password)` from an `Authorization: Basic …` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let encoded = value.strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Resolve the principal behind the request's credentials.
///
/// Unknown users and wrong passwords are both plain `Unauthorized`.
pub async fn authenticate<S: FieldStore>(
  headers: &HeaderMap,
  store: &S,
) -> Result<Principal, ApiError> {
  let (username, password) = basic_credentials(headers).ok_or(ApiError::Unauthorized)?;

  let Some((account, hash)) = store.find_credentials(&username).await.map_err(ApiError::store)?
  else {
    tracing::debug!(%username, "unknown user");
    return Err(ApiError::Unauthorized);
  };

  if !verify_password(&password, &hash) {
    tracing::debug!(%username, "wrong password");
    return Err(ApiError::Unauthorized);
  }

  Ok(Principal::from(&account))
}

/// The authenticated caller of a handler.
pub struct Caller(pub AccessContext);

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: FieldStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = authenticate(&parts.headers, state.store.as_ref()).await?;
    Ok(Caller(state.engine.context(principal).await?))
  }
}
