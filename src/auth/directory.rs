use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, AppResult};

pub const API_KEY_LEN: usize = 64;

pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LEN)
        .map(char::from)
        .collect()
}

fn fresh_user(username: &str) -> NewUser {
    NewUser {
        id: Uuid::new_v4(),
        username: username.to_string(),
        api_key: generate_api_key(),
    }
}

/// Registers a user under a freshly generated id and api key.
///
/// A collision on either value is retried once with new values before
/// giving up with [`AppError::Conflict`].
pub async fn create_user(users: &dyn UserStore, username: &str) -> AppResult<User> {
    let username = username.trim();
    if username.is_empty() {
        warn!("signup with empty username");
        return Err(AppError::Validation("username must not be empty".into()));
    }

    if let Some(user) = users.insert(fresh_user(username)).await? {
        info!(user_id = %user.id, "user created");
        return Ok(user);
    }

    warn!("user id or api key collision, regenerating");
    match users.insert(fresh_user(username)).await? {
        Some(user) => {
            info!(user_id = %user.id, "user created");
            Ok(user)
        }
        None => Err(AppError::Conflict("could not allocate a unique api key".into())),
    }
}

pub async fn find_by_api_key(users: &dyn UserStore, api_key: &str) -> AppResult<User> {
    let user = users
        .find_by_api_key(api_key)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    debug!(user_id = %user.id, "api key resolved");
    Ok(user)
}
