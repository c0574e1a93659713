use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TimerPolicy;
use crate::error::{AppError, AppResult};
use crate::timers::repo::TimeRecordStore;
use crate::timers::repo_types::{CloseOutcome, NewTimeRecord, TimeRecord};

pub fn parse_record_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| AppError::Validation(format!("invalid time record id: {}", e)))
}

pub async fn start_timer(
    records: &dyn TimeRecordStore,
    policy: &TimerPolicy,
    user_id: Uuid,
) -> AppResult<TimeRecord> {
    let new = NewTimeRecord {
        id: Uuid::new_v4(),
        user_id,
        start_time: OffsetDateTime::now_utc(),
    };
    match records.open(new, policy.single_open_timer).await? {
        Some(record) => {
            info!(%user_id, record_id = %record.id, "timer started");
            Ok(record)
        }
        None => {
            warn!(%user_id, "timer already running");
            Err(AppError::Conflict("a timer is already running".into()))
        }
    }
}

/// Closes an open record. Of several concurrent callers exactly one wins;
/// the rest get [`AppError::AlreadyClosed`].
pub async fn stop_timer(
    records: &dyn TimeRecordStore,
    record_id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<TimeRecord> {
    match records
        .close(record_id, owner, OffsetDateTime::now_utc())
        .await?
    {
        CloseOutcome::Closed(record) => {
            debug_assert!(!record.is_open());
            info!(%record_id, user_id = %record.user_id, "timer stopped");
            Ok(record)
        }
        CloseOutcome::AlreadyClosed => {
            warn!(%record_id, "timer already stopped");
            Err(AppError::AlreadyClosed(record_id))
        }
        CloseOutcome::Missing => Err(AppError::NotFound("time record")),
    }
}

pub async fn list_records(
    records: &dyn TimeRecordStore,
    user_id: Uuid,
) -> AppResult<Vec<TimeRecord>> {
    Ok(records.list_by_user(user_id).await?)
}
