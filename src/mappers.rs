//! Shapes persisted rows into the records returned by the API.

use crate::models::{Comment, CommentResponse, Post, PostResponse, User, UserProfile, UserPublic};

pub fn map_post_to_response(post: Post, likes_count: i64, liked_by_me: bool) -> PostResponse {
    PostResponse {
        id: post.id,
        title: post.title,
        content: post.content,
        author: UserPublic {
            id: post.author_id,
            username: post.author_username,
            email: post.author_email,
        },
        created_at: post.created_at,
        updated_at: post.updated_at,
        likes_count,
        liked_by_me,
    }
}

pub fn map_comment_to_response(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        content: comment.content,
        author: UserPublic {
            id: comment.author_id,
            username: comment.author_username,
            email: comment.author_email,
        },
        post_id: comment.post_id,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

pub fn map_user_to_public(user: &User) -> UserPublic {
    UserPublic {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

pub fn map_user_to_profile(user: User) -> UserProfile {
    UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
    }
}
