//! In-memory stores standing in for Postgres in unit tests, plus the pool
//! used by the store tests that run against a real database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::timers::repo::TimeRecordStore;
use crate::timers::repo_types::{CloseOutcome, NewTimeRecord, TimeRecord};

/// Connects to `DATABASE_URL` and applies the migrations. Tests using it are
/// `#[ignore]`d; run them with `cargo test -- --ignored` against a scratch database.
pub async fn pg_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    pool
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<User>>,
    lookups: AtomicUsize,
}

impl MemoryUsers {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|u| u.id == user.id || u.api_key == user.api_key)
        {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: user.id,
            username: user.username,
            api_key: user.api_key,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(Some(row))
    }

    async fn find_by_api_key(&self, api_key: &str) -> anyhow::Result<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|u| u.api_key == api_key).cloned())
    }
}

/// Reports a key collision for the first `collisions` inserts.
pub struct RiggedUsers {
    collisions: usize,
    attempts: AtomicUsize,
    inner: MemoryUsers,
}

impl RiggedUsers {
    pub fn colliding(collisions: usize) -> Self {
        Self {
            collisions,
            attempts: AtomicUsize::new(0),
            inner: MemoryUsers::default(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for RiggedUsers {
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.collisions {
            return Ok(None);
        }
        self.inner.insert(user).await
    }

    async fn find_by_api_key(&self, api_key: &str) -> anyhow::Result<Option<User>> {
        self.inner.find_by_api_key(api_key).await
    }
}

pub struct BrokenUsers;

#[async_trait]
impl UserStore for BrokenUsers {
    async fn insert(&self, _user: NewUser) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn find_by_api_key(&self, _api_key: &str) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }
}

/// Closing happens under one lock, mirroring the conditional UPDATE.
#[derive(Default)]
pub struct MemoryRecords {
    rows: Mutex<HashMap<Uuid, TimeRecord>>,
}

#[async_trait]
impl TimeRecordStore for MemoryRecords {
    async fn open(
        &self,
        record: NewTimeRecord,
        exclusive: bool,
    ) -> anyhow::Result<Option<TimeRecord>> {
        let mut rows = self.rows.lock().unwrap();
        if exclusive
            && rows
                .values()
                .any(|r| r.user_id == record.user_id && r.is_open())
        {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let row = TimeRecord {
            id: record.id,
            user_id: record.user_id,
            start_time: record.start_time,
            stop_time: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn close(
        &self,
        id: Uuid,
        owner: Option<Uuid>,
        stop_time: OffsetDateTime,
    ) -> anyhow::Result<CloseOutcome> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .get_mut(&id)
            .filter(|r| owner.map_or(true, |o| r.user_id == o))
        else {
            return Ok(CloseOutcome::Missing);
        };
        if !row.is_open() {
            return Ok(CloseOutcome::AlreadyClosed);
        }
        row.stop_time = Some(stop_time.max(row.start_time));
        row.updated_at = OffsetDateTime::now_utc();
        Ok(CloseOutcome::Closed(row.clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<TimeRecord>> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}
