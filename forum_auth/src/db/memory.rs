//! In-process credential store.
//!
//! Used by the test suites and for running the server without PostgreSQL.
//! A single lock guards users and refresh tokens, so every operation is
//! linearizable, including concurrent deletes of the same token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::{RefreshTokenRepository, UserRepository};
use crate::auth::{
    AuthError, AuthResult, NewUser, RefreshTokenRecord, StoredUser, User, UserId,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, StoredUser>,
    last_user_id: UserId,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Credential store held entirely in memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: RwLock<MemoryState>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user rows
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Number of refresh-token rows, live or expired
    pub async fn refresh_token_count(&self) -> usize {
        self.state.read().await.refresh_tokens.len()
    }

    /// Number of refresh-token rows owned by `user_id`
    pub async fn refresh_tokens_for(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl UserRepository for MemoryCredentialStore {
    async fn find_user_by_username(&self, username: &str) -> AuthResult<Option<StoredUser>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<StoredUser>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.user.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AuthResult<User> {
        let mut state = self.state.write().await;

        if state
            .users
            .values()
            .any(|u| u.user.username == user.username)
        {
            return Err(AuthError::UsernameTaken);
        }
        if state.users.values().any(|u| u.user.email == user.email) {
            return Err(AuthError::EmailTaken);
        }

        state.last_user_id += 1;
        let created = User {
            id: state.last_user_id,
            username: user.username,
            email: user.email,
            created_at: Utc::now(),
        };

        state.users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );

        Ok(created)
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryCredentialStore {
    async fn save_refresh_token(
        &self,
        user_id: UserId,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut state = self.state.write().await;
        state.refresh_tokens.insert(
            token_digest.to_string(),
            RefreshTokenRecord {
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token_digest: &str,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self.state.read().await.refresh_tokens.get(token_digest).copied())
    }

    async fn delete_refresh_token(&self, token_digest: &str) -> AuthResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .refresh_tokens
            .remove(token_digest)
            .is_some())
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.write().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, record| !record.is_expired_at(now));
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_assigns_sequential_ids() {
        let store = MemoryCredentialStore::new();

        let first = store.create_user(new_user("user1", "u1@x.com")).await.unwrap();
        let second = store.create_user(new_user("user2", "u2@x.com")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_create_user_enforces_uniqueness() {
        let store = MemoryCredentialStore::new();
        store.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        assert!(matches!(
            store.create_user(new_user("alice", "other@x.com")).await,
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            store.create_user(new_user("bob", "alice@x.com")).await,
            Err(AuthError::EmailTaken)
        ));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_find_user_by_username_and_email() {
        let store = MemoryCredentialStore::new();
        let created = store.create_user(new_user("alice", "alice@x.com")).await.unwrap();

        let by_name = store.find_user_by_username("alice").await.unwrap().unwrap();
        let by_email = store.find_user_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(by_name.user, created);
        assert_eq!(by_email.user, created);
        assert_eq!(by_email.password_hash, "hash");

        assert!(store.find_user_by_username("bob").await.unwrap().is_none());
        assert!(store.find_user_by_email("bob@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_refresh_token_is_idempotent() {
        let store = MemoryCredentialStore::new();
        let expires_at = Utc::now() + Duration::hours(1);
        store.save_refresh_token(1, "digest", expires_at).await.unwrap();

        let found = store.find_refresh_token("digest").await.unwrap().unwrap();
        assert_eq!(found.user_id, 1);
        assert_eq!(found.expires_at, expires_at);

        assert!(store.delete_refresh_token("digest").await.unwrap());
        assert!(!store.delete_refresh_token("digest").await.unwrap());
        assert!(store.find_refresh_token("digest").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_refresh_tokens() {
        let store = MemoryCredentialStore::new();
        let now = Utc::now();
        store.save_refresh_token(1, "old", now - Duration::seconds(1)).await.unwrap();
        store.save_refresh_token(1, "edge", now).await.unwrap();
        store.save_refresh_token(2, "live", now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.purge_expired_refresh_tokens(now).await.unwrap(), 1);
        assert_eq!(store.refresh_token_count().await, 2);
        assert!(store.find_refresh_token("old").await.unwrap().is_none());
        assert_eq!(store.refresh_tokens_for(1).await, 1);
    }
}
