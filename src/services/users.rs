use crate::{
    auth::{self, TokenKeys},
    error::AppError,
    mappers::{map_user_to_profile, map_user_to_public},
    models::{
        LoginRequest, NewUser, RegisterRequest, RegisterResponse, Role, TokenResponse, UserProfile,
    },
    repository::Repository,
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

/// A deliberately loose shape check: one `@`, something before it, a dot in the domain.
pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if !USERNAME_LEN.contains(&req.username.trim().chars().count()) {
        return Err(AppError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !looks_like_email(req.email.trim()) {
        return Err(AppError::Validation("Email address is not valid".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// register
///
/// Creates a regular (`user` role) account. Input problems and an already-registered email or
/// username are `Validation` errors (400); a registration racing another one for the same email
/// loses on the unique constraint and surfaces as `Conflict`.
pub async fn register(
    repo: &dyn Repository,
    req: RegisterRequest,
    bcrypt_cost: u32,
) -> Result<RegisterResponse, AppError> {
    validate_registration(&req)?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if repo.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("Email is already registered".to_string()));
    }
    if repo.get_user_by_username(&username).await?.is_some() {
        return Err(AppError::Validation("Username is already taken".to_string()));
    }

    // bcrypt is CPU bound; keep it off the async workers.
    let password = req.password;
    let hashed_password =
        tokio::task::spawn_blocking(move || auth::hash_password(&password, bcrypt_cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))??;

    let user = repo
        .create_user(NewUser {
            username,
            email,
            hashed_password,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = user.id, "user registered");

    Ok(RegisterResponse {
        message: "User created successfully".to_string(),
        user: map_user_to_public(&user),
    })
}

/// login
///
/// Unknown email and wrong password produce the same `Authentication` error so the response
/// does not reveal which accounts exist.
pub async fn login(
    repo: &dyn Repository,
    keys: &TokenKeys,
    req: LoginRequest,
) -> Result<TokenResponse, AppError> {
    let invalid = || AppError::Authentication("Invalid credentials".to_string());

    let email = req.email.trim().to_lowercase();
    let user = repo.get_user_by_email(&email).await?.ok_or_else(invalid)?;

    let password = req.password;
    let hashed = user.hashed_password.clone();
    let matches = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))?;

    if !matches {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(invalid());
    }

    Ok(TokenResponse {
        access_token: keys.issue(&user)?,
        token_type: "bearer".to_string(),
    })
}

pub async fn get_profile(repo: &dyn Repository, user_id: i64) -> Result<UserProfile, AppError> {
    repo.get_user(user_id)
        .await?
        .map(map_user_to_profile)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_users(repo: &dyn Repository) -> Result<Vec<UserProfile>, AppError> {
    Ok(repo
        .list_users()
        .await?
        .into_iter()
        .map(map_user_to_profile)
        .collect())
}

pub async fn set_role(
    repo: &dyn Repository,
    user_id: i64,
    role: Role,
) -> Result<UserProfile, AppError> {
    let user = repo
        .set_user_role(user_id, role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    tracing::info!(user_id, role = %role, "user role updated");
    Ok(map_user_to_profile(user))
}
