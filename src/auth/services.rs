use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use crate::auth::directory;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};

/// Literal scheme expected in `Authorization: ApiKey <key>`.
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Raw `Authorization` value, if any. Non-ASCII values count as malformed.
pub fn authorization_header(headers: &HeaderMap) -> AppResult<Option<&str>> {
    headers
        .get(AUTHORIZATION)
        .map(|v| {
            v.to_str().map_err(|_| {
                AppError::MalformedCredential("malformed Authorization header".into())
            })
        })
        .transpose()
}

/// Pulls the key out of a raw `Authorization` header value.
pub fn parse_api_key(header: Option<&str>) -> AppResult<&str> {
    let value = header
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MalformedCredential("missing Authorization header".into()))?;

    let mut tokens = value.split(' ');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(scheme), Some(key), None) if !key.is_empty() => {
            if scheme != API_KEY_SCHEME {
                return Err(AppError::MalformedCredential(format!(
                    "authorization scheme must be {}",
                    API_KEY_SCHEME
                )));
            }
            Ok(key)
        }
        _ => Err(AppError::MalformedCredential(
            "malformed Authorization header".into(),
        )),
    }
}

/// Resolves a raw header to a user. Never yields a user on failure.
pub async fn authenticate(users: &dyn UserStore, header: Option<&str>) -> AppResult<User> {
    let key = parse_api_key(header)?;
    match directory::find_by_api_key(users, key).await {
        Ok(user) => Ok(user),
        Err(AppError::NotFound(_)) => {
            warn!("unknown api key");
            Err(AppError::Unauthenticated)
        }
        Err(e) => Err(e),
    }
}
