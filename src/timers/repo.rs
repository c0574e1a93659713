use std::time::Duration;

use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::timed;
use crate::timers::repo_types::{CloseOutcome, NewTimeRecord, TimeRecord};

#[async_trait]
pub trait TimeRecordStore: Send + Sync {
    /// Inserts an open record. With `exclusive` set, returns `None` instead
    /// when the user already has an open record.
    async fn open(&self, record: NewTimeRecord, exclusive: bool)
        -> anyhow::Result<Option<TimeRecord>>;

    /// Atomically sets `stop_time` iff the record is still open. When `owner`
    /// is given, records of other users are treated as missing.
    /// The stored `stop_time` is never earlier than `start_time`.
    async fn close(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        stop_time: OffsetDateTime,
    ) -> anyhow::Result<CloseOutcome>;

    /// All records of a user, oldest `start_time` first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<TimeRecord>>;
}

#[derive(Clone)]
pub struct PgTimeRecordStore {
    db: PgPool,
    timeout: Duration,
}

impl PgTimeRecordStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

const INSERT_RECORD: &str = r#"
    INSERT INTO time_records (id, user_id, start_time)
    VALUES ($1, $2, $3)
    RETURNING id, user_id, start_time, stop_time, created_at, updated_at
"#;

#[async_trait]
impl TimeRecordStore for PgTimeRecordStore {
    async fn open(
        &self,
        record: NewTimeRecord,
        exclusive: bool,
    ) -> anyhow::Result<Option<TimeRecord>> {
        if !exclusive {
            let query = sqlx::query_as::<_, TimeRecord>(INSERT_RECORD)
                .bind(record.id)
                .bind(record.user_id)
                .bind(record.start_time)
                .fetch_one(&self.db);
            return timed(self.timeout, "insert time record", query).await.map(Some);
        }

        // The user row lock serializes concurrent starts for one user across instances.
        let work = async {
            let mut tx = self.db.begin().await?;
            sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(record.user_id)
                .fetch_optional(&mut *tx)
                .await?;

            let has_open: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM time_records
                    WHERE user_id = $1 AND stop_time IS NULL
                )
                "#,
            )
            .bind(record.user_id)
            .fetch_one(&mut *tx)
            .await?;

            if has_open {
                tx.rollback().await?;
                return Ok::<_, sqlx::Error>(None);
            }

            let created = sqlx::query_as::<_, TimeRecord>(INSERT_RECORD)
                .bind(record.id)
                .bind(record.user_id)
                .bind(record.start_time)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(created))
        };
        timed(self.timeout, "insert exclusive time record", work).await
    }

    async fn close(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        stop_time: OffsetDateTime,
    ) -> anyhow::Result<CloseOutcome> {
        let query = sqlx::query_as::<_, TimeRecord>(
            r#"
            UPDATE time_records
            SET stop_time = GREATEST($2, start_time), updated_at = now()
            WHERE id = $1
              AND stop_time IS NULL
              AND ($3::uuid IS NULL OR user_id = $3)
            RETURNING id, user_id, start_time, stop_time, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(stop_time)
        .bind(owner)
        .fetch_optional(&self.db);

        if let Some(record) = timed(self.timeout, "close time record", query).await? {
            return Ok(CloseOutcome::Closed(record));
        }

        // The update already lost; this read only explains why.
        let query = sqlx::query_scalar::<_, Option<OffsetDateTime>>(
            r#"
            SELECT stop_time FROM time_records
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db);

        match timed(self.timeout, "inspect time record", query).await? {
            None => Ok(CloseOutcome::Missing),
            Some(Some(_)) => Ok(CloseOutcome::AlreadyClosed),
            Some(None) => anyhow::bail!("time record {} still open after conditional close", id),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<TimeRecord>> {
        let query = sqlx::query_as::<_, TimeRecord>(
            r#"
            SELECT id, user_id, start_time, stop_time, created_at, updated_at
            FROM time_records
            WHERE user_id = $1
            ORDER BY start_time ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db);
        timed(self.timeout, "list time records", query).await
    }
}
