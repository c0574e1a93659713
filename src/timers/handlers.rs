use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        extractors::AuthUser,
        services::{authenticate, authorization_header},
    },
    config::StopTimerAuth,
    error::AppResult,
    state::AppState,
};

use super::repo_types::TimeRecord;
use super::services::{list_records, parse_record_id, start_timer, stop_timer};

pub fn timer_routes() -> Router<AppState> {
    Router::new()
        .route("/user/time_records", get(get_time_records))
        .route("/user/time_records/start", post(start))
        .route("/user/time_records/:time_record_id/stop", post(stop))
}

#[instrument(skip_all)]
pub async fn get_time_records(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<TimeRecord>>> {
    let records = list_records(state.records.as_ref(), user.id).await?;
    Ok(Json(records))
}

#[instrument(skip_all)]
pub async fn start(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<(StatusCode, Json<TimeRecord>)> {
    let record = start_timer(state.records.as_ref(), &state.config.timers, user.id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Stopping is open to anyone holding the record id unless the
/// `owner` stop policy is configured.
#[instrument(skip(state, headers))]
pub async fn stop(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(time_record_id): Path<String>,
) -> AppResult<Json<TimeRecord>> {
    let owner = match state.config.timers.stop_auth {
        StopTimerAuth::Open => None,
        StopTimerAuth::Owner => {
            let header = authorization_header(&headers)?;
            Some(authenticate(state.users.as_ref(), header).await?.id)
        }
    };

    let record_id = parse_record_id(&time_record_id)?;
    let record = stop_timer(state.records.as_ref(), record_id, owner).await?;
    Ok(Json(record))
}
