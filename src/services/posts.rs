use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::{
    auth::{AuthUser, require_owner, require_owner_or_admin},
    error::AppError,
    mappers::map_post_to_response,
    models::{PaginatedPosts, Post, PostQuery, PostRequest, PostResponse, MessageResponse},
    repository::{PostFilter, Repository},
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

fn validate_post(req: &PostRequest) -> Result<(), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    Ok(())
}

/// Start of `day` in UTC.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable microsecond of `day` in UTC.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    match day.succ_opt() {
        Some(next) => start_of_day(next) - chrono::Duration::microseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Resolves query parameters into a repository filter. Non-admin callers are always scoped to
/// their own posts, whatever `author_id` they asked for.
pub fn resolve_filter(query: &PostQuery, caller: &AuthUser) -> Result<(i64, i64, PostFilter), AppError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let author_id = if caller.is_admin() {
        query.author_id
    } else {
        Some(caller.id)
    };

    let filter = PostFilter {
        skip: (page - 1).saturating_mul(limit),
        limit,
        // Matched as given, surrounding whitespace included.
        search: query.search.clone().filter(|s| !s.is_empty()),
        author_id,
        created_from: query.from_date.map(start_of_day),
        created_to: query.to_date.map(end_of_day),
    };

    Ok((page, limit, filter))
}

async fn to_response(
    repo: &dyn Repository,
    post: Post,
    caller: &AuthUser,
) -> Result<PostResponse, AppError> {
    let likes_count = repo.count_likes(post.id).await?;
    let liked_by_me = repo.get_like(post.id, caller.id).await?.is_some();
    Ok(map_post_to_response(post, likes_count, liked_by_me))
}

pub async fn create_post(
    repo: &dyn Repository,
    req: PostRequest,
    caller: &AuthUser,
) -> Result<PostResponse, AppError> {
    validate_post(&req)?;
    let post = repo.create_post(caller.id, &req.title, &req.content).await?;
    tracing::info!(post_id = post.id, author_id = caller.id, "post created");
    Ok(map_post_to_response(post, 0, false))
}

/// list_posts
///
/// Paginated, filtered, role-scoped listing, newest first. Like counts and the caller's own
/// likes are fetched for the whole page in two queries.
pub async fn list_posts(
    repo: &dyn Repository,
    query: &PostQuery,
    caller: &AuthUser,
) -> Result<PaginatedPosts, AppError> {
    let (page, limit, filter) = resolve_filter(query, caller)?;
    let (total, posts) = repo.list_posts(filter).await?;

    let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let counts = repo.count_likes_for_posts(&post_ids).await?;
    let liked = repo.posts_liked_by(&post_ids, caller.id).await?;

    let data = posts
        .into_iter()
        .map(|post| {
            let likes_count = counts.get(&post.id).copied().unwrap_or(0);
            let liked_by_me = liked.contains(&post.id);
            map_post_to_response(post, likes_count, liked_by_me)
        })
        .collect();

    Ok(PaginatedPosts {
        page,
        limit,
        total,
        data,
    })
}

pub async fn get_post(
    repo: &dyn Repository,
    post_id: i64,
    caller: &AuthUser,
) -> Result<PostResponse, AppError> {
    let post = repo.get_post(post_id).await?.ok_or_else(post_not_found)?;
    require_owner_or_admin(post.author_id, caller)?;
    to_response(repo, post, caller).await
}

/// update_post
///
/// Author only. Admins may delete other users' posts but cannot rewrite them.
pub async fn update_post(
    repo: &dyn Repository,
    post_id: i64,
    req: PostRequest,
    caller: &AuthUser,
) -> Result<PostResponse, AppError> {
    let post = repo.get_post(post_id).await?.ok_or_else(post_not_found)?;
    require_owner(post.author_id, caller)?;
    validate_post(&req)?;

    let updated = repo
        .update_post(post_id, &req.title, &req.content)
        .await?
        .ok_or_else(post_not_found)?;
    tracing::info!(post_id, "post updated");
    to_response(repo, updated, caller).await
}

pub async fn delete_post(
    repo: &dyn Repository,
    post_id: i64,
    caller: &AuthUser,
) -> Result<MessageResponse, AppError> {
    let post = repo.get_post(post_id).await?.ok_or_else(post_not_found)?;
    require_owner_or_admin(post.author_id, caller)?;

    if !repo.delete_post(post_id).await? {
        return Err(post_not_found());
    }
    tracing::info!(post_id, deleted_by = caller.id, "post deleted");
    Ok(MessageResponse::new("Post deleted"))
}
