use crate::{
    auth::{AuthUser, require_owner, require_owner_or_admin},
    error::AppError,
    mappers::map_comment_to_response,
    models::{CommentRequest, CommentResponse},
    repository::Repository,
};

fn comment_not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

fn validate_comment(req: &CommentRequest) -> Result<(), AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::Validation("Comment must not be empty".to_string()));
    }
    Ok(())
}

async fn ensure_post_exists(repo: &dyn Repository, post_id: i64) -> Result<(), AppError> {
    match repo.get_post(post_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Post not found".to_string())),
    }
}

pub async fn create_comment(
    repo: &dyn Repository,
    post_id: i64,
    req: CommentRequest,
    caller: &AuthUser,
) -> Result<CommentResponse, AppError> {
    validate_comment(&req)?;
    ensure_post_exists(repo, post_id).await?;

    let comment = repo.create_comment(post_id, caller.id, &req.content).await?;
    tracing::info!(comment_id = comment.id, post_id, "comment created");
    Ok(map_comment_to_response(comment))
}

/// list_comments
///
/// All comments of a post, oldest first, each carrying its author's public identity.
pub async fn list_comments(
    repo: &dyn Repository,
    post_id: i64,
) -> Result<Vec<CommentResponse>, AppError> {
    ensure_post_exists(repo, post_id).await?;
    Ok(repo
        .list_comments(post_id)
        .await?
        .into_iter()
        .map(map_comment_to_response)
        .collect())
}

/// update_comment
///
/// Only the author may edit. Unlike deletion there is no admin override.
pub async fn update_comment(
    repo: &dyn Repository,
    comment_id: i64,
    req: CommentRequest,
    caller: &AuthUser,
) -> Result<CommentResponse, AppError> {
    let comment = repo
        .get_comment(comment_id)
        .await?
        .ok_or_else(comment_not_found)?;
    require_owner(comment.author_id, caller)?;
    validate_comment(&req)?;

    let updated = repo
        .update_comment(comment_id, &req.content)
        .await?
        .ok_or_else(comment_not_found)?;
    Ok(map_comment_to_response(updated))
}

pub async fn delete_comment(
    repo: &dyn Repository,
    comment_id: i64,
    caller: &AuthUser,
) -> Result<(), AppError> {
    let comment = repo
        .get_comment(comment_id)
        .await?
        .ok_or_else(comment_not_found)?;
    require_owner_or_admin(comment.author_id, caller)?;

    if !repo.delete_comment(comment_id).await? {
        return Err(comment_not_found());
    }
    tracing::info!(comment_id, deleted_by = caller.id, "comment deleted");
    Ok(())
}
