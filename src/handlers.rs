use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::AppError,
    extract::{Json, Path, Query},
    models::{
        CommentRequest, CommentResponse, Follow, FollowListEntry, LikeStatus, LoginRequest,
        MessageResponse, PaginatedPosts, PostQuery, PostRequest, PostResponse, RegisterRequest,
        RegisterResponse, RoleQuery, TokenResponse, UpdateRoleRequest, UserProfile,
    },
    services::{comments, follows, likes, posts, users},
};
use axum::{body::Bytes, extract::State, http::StatusCode};

// --- Auth ---

/// register_user
///
/// [Public Route] Creates a regular account. The password is hashed before storage and never
/// echoed back.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Invalid input or email already registered")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let created = users::register(state.repo.as_ref(), payload, state.config.bcrypt_cost).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// login_user
///
/// [Public Route] Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = users::login(state.repo.as_ref(), &state.tokens, payload).await?;
    Ok(Json(token))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(users::get_profile(state.repo.as_ref(), user.id).await?))
}

// --- Posts ---

#[utoipa::path(
    post,
    path = "/posts",
    request_body = PostRequest,
    responses((status = 200, description = "Created", body = PostResponse))
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    Ok(Json(posts::create_post(state.repo.as_ref(), payload, &user).await?))
}

/// list_posts
///
/// [Authenticated Route] Paginated listing. Regular users only ever see their own posts; admins
/// see everything and may filter by `author_id`.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostQuery),
    responses(
        (status = 200, description = "One page of posts", body = PaginatedPosts),
        (status = 400, description = "Invalid pagination")
    )
)]
pub async fn list_posts(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<Json<PaginatedPosts>, AppError> {
    Ok(Json(posts::list_posts(state.repo.as_ref(), &query, &user).await?))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostResponse),
        (status = 403, description = "Neither author nor admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, AppError> {
    Ok(Json(posts::get_post(state.repo.as_ref(), id, &user).await?))
}

/// update_post
///
/// [Authenticated Route] Author only; admins get a 403 here too.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Updated", body = PostResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    Ok(Json(posts::update_post(state.repo.as_ref(), id, payload, &user).await?))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Neither author nor admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(posts::delete_post(state.repo.as_ref(), id, &user).await?))
}

// --- Likes ---

#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Liked", body = LikeStatus),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Already liked")
    )
)]
pub async fn like_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<LikeStatus>), AppError> {
    let status = likes::like_post(state.repo.as_ref(), id, user.id).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/like",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Unliked", body = LikeStatus),
        (status = 404, description = "Like not found")
    )
)]
pub async fn unlike_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LikeStatus>, AppError> {
    Ok(Json(likes::unlike_post(state.repo.as_ref(), id, user.id).await?))
}

// --- Comments ---

#[utoipa::path(
    post,
    path = "/comments/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment added", body = CommentResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    Ok(Json(
        comments::create_comment(state.repo.as_ref(), post_id, payload, &user).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/comments/post/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentResponse]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    Ok(Json(comments::list_comments(state.repo.as_ref(), post_id).await?))
}

#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Updated", body = CommentResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    Ok(Json(
        comments::update_comment(state.repo.as_ref(), id, payload, &user).await?,
    ))
}

/// delete_comment
///
/// [Authenticated Route] Author or admin.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Neither author nor admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    comments::delete_comment(state.repo.as_ref(), id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Follows ---

#[utoipa::path(
    post,
    path = "/users/{id}/follow",
    params(("id" = i64, Path, description = "User to follow")),
    responses(
        (status = 201, description = "Following", body = Follow),
        (status = 400, description = "Self-follow"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already following")
    )
)]
pub async fn follow_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Follow>), AppError> {
    let follow = follows::follow_user(state.repo.as_ref(), user.id, id).await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/follow",
    params(("id" = i64, Path, description = "User to unfollow")),
    responses(
        (status = 200, description = "Unfollowed", body = MessageResponse),
        (status = 404, description = "Not following")
    )
)]
pub async fn unfollow_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(follows::unfollow_user(state.repo.as_ref(), user.id, id).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/followers",
    params(("id" = i64, Path, description = "User ID")),
    responses((status = 200, description = "Followers", body = [FollowListEntry]))
)]
pub async fn list_followers(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FollowListEntry>>, AppError> {
    Ok(Json(follows::list_followers(state.repo.as_ref(), id).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/following",
    params(("id" = i64, Path, description = "User ID")),
    responses((status = 200, description = "Followed users", body = [FollowListEntry]))
)]
pub async fn list_following(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FollowListEntry>>, AppError> {
    Ok(Json(follows::list_following(state.repo.as_ref(), id).await?))
}

// --- Admin ---

/// get_admin_users
///
/// [Admin Route] Every account with its role. The `AdminUser` extractor rejects non-admins
/// with a 403 before this runs.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(users::list_users(state.repo.as_ref()).await?))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = i64, Path, description = "User ID"), RoleQuery),
    request_body(content = UpdateRoleRequest, description = "Used when `role` is not in the query string"),
    responses(
        (status = 200, description = "Role updated", body = UserProfile),
        (status = 400, description = "Missing or unknown role"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RoleQuery>,
    body: Bytes,
) -> Result<Json<UserProfile>, AppError> {
    // `?role=` takes precedence; a JSON body `{"role": ...}` is accepted as well.
    let role = match query.role {
        Some(role) => role,
        None if !body.is_empty() => {
            serde_json::from_slice::<UpdateRoleRequest>(&body)
                .map_err(|e| AppError::Validation(format!("Invalid role payload: {}", e)))?
                .role
        }
        None => return Err(AppError::Validation("role is required".to_string())),
    };

    tracing::info!(admin_id = admin.id, target_id = id, "role change requested");
    Ok(Json(users::set_role(state.repo.as_ref(), id, role).await?))
}
