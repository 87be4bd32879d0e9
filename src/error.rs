use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// AppError
///
/// The single error type shared by the repository, the services and the request extractors.
/// Each variant maps to one fixed HTTP status at the boundary (see `IntoResponse` below), so
/// handlers can simply propagate with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller input rejected before touching the store (bad password length, self-follow...).
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed or expired token, or bad login credentials.
    #[error("{0}")]
    Authentication(String),

    /// Authenticated, but the role or ownership check failed.
    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (duplicate like, follow, email or username).
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message exposed to clients. Server-side failures are not leaked.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Unique violations become `Conflict` so that a racing duplicate insert is reported the same
/// way as the service-level pre-check. A foreign key violation means the referenced row was
/// deleted between the existence check and the insert.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict("Resource already exists".to_string());
            }
            if db_err.is_foreign_key_violation() {
                return AppError::NotFound("Referenced resource not found".to_string());
            }
        }
        AppError::Database(err)
    }
}

// Extractor rejections. Malformed client input is a `Validation` error so it gets the same
// JSON body as every other failure; a rejection axum itself classifies as 5xx stays internal.

fn from_rejection(status: StatusCode, message: String) -> AppError {
    if status.is_server_error() {
        AppError::Internal(message)
    } else {
        AppError::Validation(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        from_rejection(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }));

        match self {
            AppError::Authentication(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
