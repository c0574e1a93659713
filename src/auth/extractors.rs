use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::repo_types::User;
use super::services::{authenticate, authorization_header};
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the `Authorization: ApiKey <key>` header to the calling user.
///
/// Rejection happens during extraction, so a handler taking `AuthUser` never
/// runs for an unauthenticated request.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization_header(&parts.headers)?;
        let user = authenticate(state.users.as_ref(), header).await?;
        Ok(AuthUser(user))
    }
}
