//! Token codec: signs and verifies access tokens, mints opaque refresh tokens.
//!
//! Everything here is pure computation. Storage of refresh tokens is the
//! credential store's job; the codec only provides the keyed digest under which
//! a refresh token is stored.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, UserId},
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a refresh token (hex-encoded on the wire)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// A freshly signed access token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted refresh token
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access-token signer/verifier and refresh-token generator
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    refresh_mac: HmacSha256,
}

impl TokenCodec {
    /// Create a codec from the two server secrets
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingSecret` - Either secret is empty
    pub fn new(access_token_secret: &str, refresh_token_secret: &str) -> AuthResult<Self> {
        if access_token_secret.is_empty() {
            return Err(AuthError::MissingSecret("ACCESS_TOKEN_SECRET"));
        }
        if refresh_token_secret.is_empty() {
            return Err(AuthError::MissingSecret("REFRESH_TOKEN_SECRET"));
        }

        let refresh_mac = HmacSha256::new_from_slice(refresh_token_secret.as_bytes())
            .map_err(|_| AuthError::MissingSecret("REFRESH_TOKEN_SECRET"))?;

        // Expiry is checked by hand so the boundary instant is well defined.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(access_token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(access_token_secret.as_bytes()),
            validation,
            refresh_mac,
        })
    }

    /// Sign an access token for `user_id` that expires `ttl` from now
    pub fn issue_access_token(
        &self,
        user_id: UserId,
        ttl: Duration,
    ) -> AuthResult<IssuedAccessToken> {
        self.issue_access_token_at(user_id, ttl, Utc::now())
    }

    /// Sign an access token as if the current time were `now`
    pub fn issue_access_token_at(
        &self,
        user_id: UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedAccessToken> {
        let expires_at = expires_after(now, ttl)?;
        let claims = AccessTokenClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedAccessToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Verify signature, structure, and expiry of an access token
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Bad signature, wrong algorithm, malformed, or expired
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.verify_access_token_at(token, Utc::now())
    }

    /// Verify an access token against an explicit clock
    ///
    /// A token is rejected from its `exp` second onwards: at exactly the expiry
    /// instant it is already expired.
    pub fn verify_access_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                log::debug!("Access token rejected: {}", e);
                AuthError::InvalidToken
            })?;

        let claims = token_data.claims;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Mint an opaque refresh token that expires `ttl` from now
    ///
    /// # Errors
    ///
    /// * `AuthError::LifetimeOutOfRange` - `ttl` overflows the date range
    pub fn issue_refresh_token(&self, ttl: Duration) -> AuthResult<IssuedRefreshToken> {
        let expires_at = expires_after(Utc::now(), ttl)?;

        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        Ok(IssuedRefreshToken {
            token: hex::encode(bytes),
            expires_at,
        })
    }

    /// Keyed digest under which a refresh token is stored and looked up
    pub fn refresh_token_digest(&self, token: &str) -> String {
        let mut mac = self.refresh_mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// `now + ttl`, failing instead of overflowing
///
/// The expiry must also fit a JWT `exp` claim in whole seconds.
pub fn expires_after(now: DateTime<Utc>, ttl: Duration) -> AuthResult<DateTime<Utc>> {
    now.checked_add_signed(ttl).ok_or(AuthError::LifetimeOutOfRange(ttl))
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
