use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

// --- Roles ---

/// Role
///
/// Coarse authorization tier. Stored as lowercase text in `users.role`; a closed enum so an
/// invalid role can never reach the authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// Used by `#[sqlx(try_from = "String")]` when decoding the text column.
impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Rows (Mapped to Database) ---

/// User
///
/// Canonical account record from the `users` table. Never serialized directly: the password
/// hash stays inside the process, responses go through `UserProfile` or `UserPublic`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new account. The password is already hashed at this point.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

/// Post
///
/// A row of the `posts` table joined with its author's public identity.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Loaded via a JOIN on users.
    pub author_username: String,
    pub author_email: String,
}

/// Comment
///
/// A row of the `comments` table joined with its author's public identity.
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_email: String,
}

/// Like
///
/// Join row between a user and a post. At most one per `(user_id, post_id)`.
#[derive(Debug, Clone, FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Follow
///
/// Join row between two users. Unique per pair, and `follower_id != followed_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FollowListEntry
///
/// One line of a followers/following listing: the user on the other side of the relation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct FollowListEntry {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    #[ts(type = "string")]
    pub followed_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /auth/register`. The password is hashed before it reaches the
/// repository and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// PostRequest
///
/// Body for both `POST /posts` and `PUT /posts/{id}`. Updates replace title and content.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

/// PostQuery
///
/// Query parameters of `GET /posts`. Dates are calendar days (`YYYY-MM-DD`) and both bounds are
/// inclusive of the whole day. `author_id` is only honoured for admins.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostQuery {
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Page size, 1 to 100 (default 10).
    pub limit: Option<i64>,
    /// Case-insensitive substring matched against title or content.
    pub search: Option<String>,
    pub author_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

/// Body for creating or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentRequest {
    pub content: String,
}

/// Admin payload for `PUT /admin/users/{id}/role`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// `?role=` form of the same request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleQuery {
    pub role: Option<Role>,
}

// --- Response Records (Output Schemas) ---

/// UserPublic
///
/// The public identity attached to posts, comments and registration responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// UserProfile
///
/// The caller's own profile (`GET /auth/me`) and the admin user listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostResponse
///
/// A post as seen by a specific caller: live like count plus whether that caller liked it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: UserPublic,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub liked_by_me: bool,
}

/// PaginatedPosts
///
/// `total` counts every post matching the filters, not just the returned page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PaginatedPosts {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub data: Vec<PostResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub author: UserPublic,
    pub post_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// LikeStatus
///
/// Returned by like/unlike: the caller's new state and the post's new total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserPublic,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
