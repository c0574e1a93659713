use std::time::Duration;

use axum::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::db::timed;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a user. `None` means the id or api key is already taken.
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_by_api_key(&self, api_key: &str) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, api_key)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING id, username, api_key, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.api_key)
        .fetch_optional(&self.db);
        timed(self.timeout, "insert user", query).await
    }

    async fn find_by_api_key(&self, api_key: &str) -> anyhow::Result<Option<User>> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, api_key, created_at, updated_at
            FROM users
            WHERE api_key = $1
            "#,
        )
        .bind(api_key)
        .fetch_optional(&self.db);
        timed(self.timeout, "find user by api key", query).await
    }
}
