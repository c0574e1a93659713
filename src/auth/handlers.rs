use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        directory::create_user, dto::SignupRequest, extractors::AuthUser, repo_types::User,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "signup body rejected");
        AppError::Validation(format!("error parsing JSON: {}", e.body_text()))
    })?;

    let user = create_user(state.users.as_ref(), &payload.username).await?;
    info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
pub async fn login(AuthUser(user): AuthUser) -> Json<User> {
    info!(user_id = %user.id, "user logged in");
    Json(user)
}
