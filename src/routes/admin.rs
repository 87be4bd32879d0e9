use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. Each handler takes the `AdminUser` extractor, which authenticates the
/// caller and then rejects anyone without the `admin` role with a 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        .route("/users", get(handlers::get_admin_users))
        // PUT /admin/users/{id}/role
        // Promotes or demotes an account. Takes effect on the target's next request, since the
        // role is re-read from the database on every authentication.
        .route("/users/{id}/role", put(handlers::update_user_role))
}
