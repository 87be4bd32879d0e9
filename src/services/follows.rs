use crate::{
    error::AppError,
    models::{Follow, FollowListEntry, MessageResponse},
    repository::Repository,
};

/// follow_user
///
/// Self-follow is rejected before any lookup, so it fails the same way whether or not the
/// user exists.
pub async fn follow_user(
    repo: &dyn Repository,
    follower_id: i64,
    followed_id: i64,
) -> Result<Follow, AppError> {
    if follower_id == followed_id {
        return Err(AppError::Validation("You cannot follow yourself".to_string()));
    }
    if repo.get_user(followed_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    if repo.get_follow(follower_id, followed_id).await?.is_some() {
        return Err(AppError::Conflict("Already following this user".to_string()));
    }

    let follow = repo.create_follow(follower_id, followed_id).await?;
    tracing::debug!(follower_id, followed_id, "follow created");
    Ok(follow)
}

pub async fn unfollow_user(
    repo: &dyn Repository,
    follower_id: i64,
    followed_id: i64,
) -> Result<MessageResponse, AppError> {
    if !repo.delete_follow(follower_id, followed_id).await? {
        return Err(AppError::NotFound("Not following this user".to_string()));
    }
    Ok(MessageResponse::new("Unfollowed successfully"))
}

pub async fn list_followers(
    repo: &dyn Repository,
    user_id: i64,
) -> Result<Vec<FollowListEntry>, AppError> {
    repo.list_followers(user_id).await
}

pub async fn list_following(
    repo: &dyn Repository,
    user_id: i64,
) -> Result<Vec<FollowListEntry>, AppError> {
    repo.list_following(user_id).await
}
