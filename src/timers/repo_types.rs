use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One work session. Open while `stop_time` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TimeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub stop_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TimeRecord {
    pub fn is_open(&self) -> bool {
        self.stop_time.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewTimeRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: OffsetDateTime,
}

/// Result of the store's "close iff open" update.
#[derive(Debug)]
pub enum CloseOutcome {
    /// This call performed the open -> closed transition.
    Closed(TimeRecord),
    /// The record exists but was already stopped.
    AlreadyClosed,
    /// No record with that id (or not visible to the given owner).
    Missing,
}
