//! Repository trait definitions for the credential store.
//!
//! Every call is a fresh round trip to the backing store; nothing is cached.
//! Refresh tokens are addressed by their keyed digest (see
//! [`TokenCodec::refresh_token_digest`](crate::auth::TokenCodec::refresh_token_digest)).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::{
    AuthError, AuthResult, NewUser, RefreshTokenRecord, StoredUser, User, UserId,
};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by username
    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<StoredUser>>;

    /// Find user by email
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<StoredUser>>;

    /// Create a new user, assigning its id
    ///
    /// Fails with `UsernameTaken` / `EmailTaken` when a uniqueness constraint rejects it.
    async fn create_user(&self, user: NewUser) -> AuthResult<User>;
}

/// Trait for refresh-token repository operations
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a refresh token
    async fn save_refresh_token(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Find a refresh token
    async fn find_refresh_token(&self, token_digest: &str)
    -> AuthResult<Option<RefreshTokenRecord>>;

    /// Delete a refresh token
    ///
    /// Deleting a missing token is not an error; the return value tells whether
    /// this call removed a row.
    async fn delete_refresh_token(&self, token_digest: &str) -> AuthResult<bool>;

    /// Delete every refresh token whose expiry is before `now`
    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// A store that implements both repositories
pub trait CredentialStore: UserRepository + RefreshTokenRepository {}

impl<T: UserRepository + RefreshTokenRepository> CredentialStore for T {}

/// PostgreSQL implementation of the credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn stored_user_from_row(r: &PgRow) -> StoredUser {
    StoredUser {
        user: User {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
            created_at: r.get("created_at"),
        },
        password_hash: r.get("password_hash"),
    }
}

/// Map a unique-constraint violation on `users` to the matching conflict
fn map_user_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => AuthError::EmailTaken,
                _ => AuthError::UsernameTaken,
            };
        }
    }
    AuthError::Database(err)
}

#[async_trait]
impl UserRepository for PgCredentialStore {
    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(stored_user_from_row))
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(stored_user_from_row))
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_insert_error)?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl RefreshTokenRepository for PgCredentialStore {
    async fn save_refresh_token(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_digest, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token_digest)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_digest: &str,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        let row =
            sqlx::query("SELECT user_id, expires_at FROM refresh_tokens WHERE token_digest = $1")
                .bind(token_digest)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            user_id: r.get("user_id"),
            expires_at: r.get("expires_at"),
        }))
    }

    async fn delete_refresh_token(&self, token_digest: &str) -> AuthResult<bool> {
        // Concurrent deletes of one row serialize on its lock; only one sees it
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_digest = $1")
            .bind(token_digest)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
