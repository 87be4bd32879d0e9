use crate::{error::AppError, models::LikeStatus, repository::Repository};

/// like_post
///
/// One like per user and post. The pre-check gives the common case a clear message; a
/// concurrent duplicate still fails on the `unique_like` constraint and maps to `Conflict`.
pub async fn like_post(
    repo: &dyn Repository,
    post_id: i64,
    user_id: i64,
) -> Result<LikeStatus, AppError> {
    if repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    if repo.get_like(post_id, user_id).await?.is_some() {
        return Err(AppError::Conflict("You already liked this post".to_string()));
    }

    repo.create_like(post_id, user_id).await?;
    let likes_count = repo.count_likes(post_id).await?;
    tracing::debug!(post_id, user_id, likes_count, "post liked");

    Ok(LikeStatus {
        liked: true,
        likes_count,
    })
}

pub async fn unlike_post(
    repo: &dyn Repository,
    post_id: i64,
    user_id: i64,
) -> Result<LikeStatus, AppError> {
    if !repo.delete_like(post_id, user_id).await? {
        return Err(AppError::NotFound("Like not found".to_string()));
    }

    let likes_count = repo.count_likes(post_id).await?;
    tracing::debug!(post_id, user_id, likes_count, "post unliked");

    Ok(LikeStatus {
        liked: false,
        likes_count,
    })
}
