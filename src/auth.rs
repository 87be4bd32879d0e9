use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::AppError,
    models::{Role, User},
    repository::RepositoryState,
};

// --- Passwords ---

/// Pre-digests the password so bcrypt never sees more than 64 ASCII bytes. bcrypt silently
/// ignores everything past 72 bytes; hashing first keeps long passwords fully significant.
fn prepare_password(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

/// hash_password
///
/// SHA-256 pre-digest followed by bcrypt at the given work factor. The result is a standard
/// `$2b$` string carrying its own salt and cost.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(prepare_password(plain), cost)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// verify_password
///
/// Delegates the comparison to bcrypt. A stored hash that cannot be parsed simply fails to
/// verify.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(prepare_password(plain), hashed).unwrap_or(false)
}

// --- Tokens ---

/// Claims
///
/// Payload of an access token. `sub` carries the email for compatibility with existing
/// clients; `user_id` is what the server resolves the caller from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email.
    pub sub: String,
    pub user_id: i64,
    /// Expiration time (unix seconds). Tokens past this instant are rejected.
    pub exp: usize,
    /// Issued at (unix seconds).
    pub iat: usize,
}

/// TokenKeys
///
/// Signing and verification keys derived once from `AppConfig::jwt_secret`, plus the token
/// lifetime. Held in `AppState` and pulled into extractors through `FromRef`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // An expired token is expired; no grace window.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user` using the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_with_ttl(&user.email, user.id, self.ttl)
    }

    /// Issues a token with an explicit lifetime. A negative `ttl` yields an already-expired
    /// token.
    pub fn issue_with_ttl(&self, email: &str, user_id: i64, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            iat: now.timestamp().max(0) as usize,
            exp: (now + ttl).timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
    }

    /// verify
    ///
    /// Validates signature and expiry and returns the claims. Any failure is an
    /// `Authentication` error, which the boundary turns into a 401.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => {
                    Err(AppError::Authentication("Token has expired".to_string()))
                }
                _ => Err(AppError::Authentication("Invalid token".to_string())),
            },
        }
    }

    /// Check-only variant of `verify`: `None` for any invalid or expired token.
    pub fn check(&self, token: &str) -> Option<Claims> {
        self.verify(token).ok()
    }
}

// --- Authorization checks ---

/// Fails with `Authorization` unless the user is an admin.
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Administrator privileges are required".to_string(),
        ))
    }
}

/// Fails with `Authorization` unless the user authored the resource.
pub fn require_owner(author_id: i64, user: &AuthUser) -> Result<(), AppError> {
    if author_id == user.id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

/// Fails with `Authorization` unless the user authored the resource or is an admin.
pub fn require_owner_or_admin(author_id: i64, user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    require_owner(author_id, user)
}

// --- Extractors ---

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument and
/// pass it to the services, which use `id` and `role` for ownership and role checks.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Not authenticated".to_string()))?;

    // Scheme name is case-insensitive.
    value
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("Not authenticated".to_string()))
}

/// AuthUser Extractor Implementation
///
/// 1. Reads the bearer token from the `Authorization` header.
/// 2. Verifies signature and expiry with the process-wide `TokenKeys`.
/// 3. Loads the user named by the `user_id` claim, so a deleted account or a changed role takes
///    effect immediately.
///
/// Rejection: 401 for a missing/invalid/expired token, 404 when the user no longer exists.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let keys = TokenKeys::from_ref(state);

        let token = bearer_token(parts)?;
        let claims = keys.verify(token)?;

        let user = repo
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(AuthUser::from(user))
    }
}

/// AdminUser
///
/// An `AuthUser` that has passed `require_admin`. Used by the `/admin` routes so the role check
/// cannot be forgotten inside a handler.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
