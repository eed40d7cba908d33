//! Session manager implementation.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{
        AccessTokenClaims, AuthSession, LoginRequest, NewUser, RegisterRequest, SessionTokens,
        UserId,
    },
    tokens::{TokenCodec, expires_after},
};
use crate::db::{CredentialStore, RefreshTokenRepository, UserRepository};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;

/// Orchestrates registration, login, refresh-token rotation, and logout.
///
/// Stateless: every piece of mutable state lives in the credential store, so a
/// single instance is cloned into every request handler.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn RefreshTokenRepository>,
    codec: TokenCodec,
    config: Arc<AuthConfig>,
    dummy_hash: Arc<String>,
}

impl SessionManager {
    /// Create a new session manager
    ///
    /// # Arguments
    ///
    /// * `users` - User repository
    /// * `tokens` - Refresh-token repository
    /// * `config` - Secrets, pepper, and token lifetimes
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingSecret` - A signing secret is empty
    /// * `AuthError::LifetimeOutOfRange` - A token lifetime overflows the date range
    /// * `AuthError::HashingFailed` - The login timing decoy could not be prepared
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
        config: AuthConfig,
    ) -> AuthResult<Self> {
        let codec = TokenCodec::new(&config.access_token_secret, &config.refresh_token_secret)?;
        let now = Utc::now();
        expires_after(now, config.access_token_ttl)?;
        expires_after(now, config.refresh_token_ttl)?;
        let dummy_hash = hash_with_pepper("not-a-real-password", &config.password_pepper)?;

        Ok(Self {
            users,
            tokens,
            codec,
            config: Arc::new(config),
            dummy_hash: Arc::new(dummy_hash),
        })
    }

    /// Create a session manager over a single store implementing both repositories
    pub fn with_store<S>(store: Arc<S>, config: AuthConfig) -> AuthResult<Self>
    where
        S: CredentialStore + 'static,
    {
        Self::new(store.clone(), store, config)
    }

    /// Token codec used by this manager
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new user and open a session
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - A field is blank or the email is malformed
    /// * `AuthError::UsernameTaken` - Username already exists
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthSession> {
        validate_registration(&request)?;

        // Fast path only: the store's unique constraints are authoritative
        if self
            .users
            .find_user_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        if self
            .users
            .find_user_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(&request.password)?;

        let user = self
            .users
            .create_user(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        let tokens = self.open_session(user.id).await?;

        info!("Registered user {} ({})", user.id, user.username);

        Ok(AuthSession {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Login with email and password
    ///
    /// Prior refresh tokens of the user stay valid; each login opens an
    /// independent session.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthSession> {
        let stored = match self.users.find_user_by_email(&request.email).await? {
            Some(stored) => stored,
            None => {
                // Spend the same hashing work as a real verification
                let _ = self.verify_password(&request.password, &self.dummy_hash);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.verify_password(&request.password, &stored.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.open_session(stored.user.id).await?;

        info!("User {} logged in", stored.user.id);

        Ok(AuthSession {
            user: stored.user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Exchange a refresh token for a new access/refresh pair
    ///
    /// The presented token is consumed: it is deleted before the replacement is
    /// stored, so presenting it again fails.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Unknown or already consumed token
    /// * `AuthError::TokenExpired` - Token found but past its expiry
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<SessionTokens> {
        if refresh_token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let digest = self.codec.refresh_token_digest(refresh_token);

        let record = self
            .tokens
            .find_refresh_token(&digest)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if record.is_expired_at(Utc::now()) {
            self.tokens.delete_refresh_token(&digest).await?;
            return Err(AuthError::TokenExpired);
        }

        let access = self
            .codec
            .issue_access_token(record.user_id, self.config.access_token_ttl)?;
        let next = self.codec.issue_refresh_token(self.config.refresh_token_ttl)?;

        // Whoever removes the row wins; everyone else sees a consumed token
        if !self.tokens.delete_refresh_token(&digest).await? {
            warn!(
                "Refresh token for user {} was consumed concurrently",
                record.user_id
            );
            return Err(AuthError::InvalidToken);
        }

        let next_digest = self.codec.refresh_token_digest(&next.token);
        if let Err(e) = self
            .tokens
            .save_refresh_token(record.user_id, &next_digest, next.expires_at)
            .await
        {
            error!(
                "Rotated refresh token for user {} could not be stored; session lost: {}",
                record.user_id, e
            );
            return Err(e);
        }

        Ok(SessionTokens {
            access_token: access.token,
            refresh_token: next.token,
        })
    }

    /// Logout by deleting a refresh token. Unknown tokens are ignored.
    ///
    /// Access tokens already handed out stay valid until they expire.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        if refresh_token.is_empty() {
            return Ok(());
        }

        let digest = self.codec.refresh_token_digest(refresh_token);
        self.tokens.delete_refresh_token(&digest).await?;
        Ok(())
    }

    /// Verify an access token
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.codec.verify_access_token(token)
    }

    /// Issue an access/refresh pair and persist the refresh token
    async fn open_session(&self, user_id: UserId) -> AuthResult<SessionTokens> {
        let access = self
            .codec
            .issue_access_token(user_id, self.config.access_token_ttl)?;
        let refresh = self.codec.issue_refresh_token(self.config.refresh_token_ttl)?;

        let digest = self.codec.refresh_token_digest(&refresh.token);
        self.tokens
            .save_refresh_token(user_id, &digest, refresh.expires_at)
            .await?;

        Ok(SessionTokens {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        hash_with_pepper(password, &self.config.password_pepper)
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let peppered = format!("{}{}", password, self.config.password_pepper);
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

fn hash_with_pepper(password: &str, pepper: &str) -> AuthResult<String> {
    let peppered = format!("{}{}", password, pepper);
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(peppered.as_bytes(), &salt)
        .map_err(|_| AuthError::HashingFailed)?
        .to_string())
}

/// Validate registration fields
fn validate_registration(request: &RegisterRequest) -> AuthResult<()> {
    if request.username.trim().is_empty() {
        return Err(AuthError::Validation("username is required".to_string()));
    }

    if request.email.trim().is_empty() {
        return Err(AuthError::Validation("email is required".to_string()));
    }

    if request.password.is_empty() {
        return Err(AuthError::Validation("password is required".to_string()));
    }

    match request.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::Validation("email is malformed".to_string())),
    }
}
