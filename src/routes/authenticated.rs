use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. Ownership and role rules are enforced by
/// the services, not by the routes.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::get_me))
        // --- Posts ---
        // GET lists the caller's posts (all posts for admins), POST creates one.
        .route("/posts", get(handlers::list_posts).post(handlers::create_post))
        // GET: author or admin. PUT: author only. DELETE: author or admin.
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        // --- Likes ---
        .route(
            "/posts/{id}/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        // --- Comments ---
        // POST /comments/{post_id} creates; PUT/DELETE /comments/{id} edit and remove.
        // Both share one path pattern, so the segment is named once.
        .route(
            "/comments/{id}",
            post(handlers::create_comment)
                .put(handlers::update_comment)
                .delete(handlers::delete_comment),
        )
        .route("/comments/post/{post_id}", get(handlers::list_comments))
        // --- Follows ---
        .route(
            "/users/{id}/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/users/{id}/followers", get(handlers::list_followers))
        .route("/users/{id}/following", get(handlers::list_following))
}
