//! SQLite-backed user records and session tokens.
//!
//! The guards never touch this module. It backs two collaborator seams: the
//! `current_user(token)` lookup the gateway authenticates with, and the
//! [`ProfileImageStore`] reference update the upload orchestrator commits
//! through — strictly after a stream has been fully written.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::error::StoreError;

/// Authenticated caller, produced by session lookup. Orchestrators receive
/// one and never resolve tokens themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub profile_image: Option<String>,
    pub updated_at: String,
}

/// Persistence seam for the upload orchestrator: one image reference per
/// user, overwritten on each successful upload.
pub trait ProfileImageStore: Send + Sync {
    fn set_profile_image<'a>(
        &'a self,
        user_id: i64,
        reference: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

const STORE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    profile_image TEXT,
    updated_at    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
)";

/// SQLite-backed user store using a sqlx async pool.
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Self::bootstrap(pool).await
    }

    /// In-memory store. A single connection keeps every query on the same
    /// memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::bootstrap(pool).await
    }

    async fn bootstrap(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in STORE_SCHEMA.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                sqlx::query(statement).execute(&pool).await?;
            }
        }
        Ok(Self { pool })
    }

    pub async fn create_user(&self, email: &str) -> Result<User, StoreError> {
        let updated_at = Utc::now().to_rfc3339();
        let result = sqlx::query("INSERT INTO users (email, updated_at) VALUES ($1, $2)")
            .bind(email)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            profile_image: None,
            updated_at,
        })
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, profile_image, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| User {
            id: r.get(0),
            email: r.get(1),
            profile_image: r.get(2),
            updated_at: r.get(3),
        }))
    }

    /// Issue a fresh bearer token for `user_id`.
    pub async fn issue_session(&self, user_id: i64) -> Result<String, StoreError> {
        let token = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    /// The session-lookup collaborator: token in, identity out.
    pub async fn current_user(&self, token: &str) -> Result<Option<Identity>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query(
            "SELECT u.id, u.email
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Identity {
            id: r.get(0),
            email: r.get(1),
        }))
    }
}

impl ProfileImageStore for UserStore {
    fn set_profile_image<'a>(
        &'a self,
        user_id: i64,
        reference: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let updated_at = Utc::now().to_rfc3339();
            let result = sqlx::query(
                "UPDATE users SET profile_image = $1, updated_at = $2 WHERE id = $3",
            )
            .bind(reference)
            .bind(&updated_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::UnknownUser(user_id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_fetch_user() {
        let store = UserStore::open_in_memory().await.unwrap();

        let user = store.create_user("jim@example.com").await.unwrap();
        let fetched = store.user_by_id(user.id).await.unwrap().unwrap();

        assert_eq!(fetched.email, "jim@example.com");
        assert_eq!(fetched.profile_image, None);
    }

    #[tokio::test]
    async fn session_token_round_trip() {
        let store = UserStore::open_in_memory().await.unwrap();
        let user = store.create_user("jim@example.com").await.unwrap();

        let token = store.issue_session(user.id).await.unwrap();
        let identity = store.current_user(&token).await.unwrap().unwrap();

        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, "jim@example.com");
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_yield_no_identity() {
        let store = UserStore::open_in_memory().await.unwrap();

        assert_eq!(store.current_user("nope").await.unwrap(), None);
        assert_eq!(store.current_user("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn profile_image_reference_is_overwritten() {
        let store = UserStore::open_in_memory().await.unwrap();
        let user = store.create_user("jim@example.com").await.unwrap();

        store
            .set_profile_image(user.id, "/assets/uploads/1.png")
            .await
            .unwrap();
        store
            .set_profile_image(user.id, "/assets/uploads/1.gif")
            .await
            .unwrap();

        let fetched = store.user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.profile_image.as_deref(), Some("/assets/uploads/1.gif"));
    }

    #[tokio::test]
    async fn updating_a_missing_user_errors() {
        let store = UserStore::open_in_memory().await.unwrap();

        let result = store.set_profile_image(99, "/assets/uploads/99.jpg").await;
        assert!(matches!(result, Err(StoreError::UnknownUser(99))));
    }
}
