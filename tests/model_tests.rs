use axum::{
    extract::Query,
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use chrono::Utc;
use devcommunity_api::{
    error::AppError,
    models::{PostQuery, PostResponse, Role, UpdateRoleRequest, UserPublic},
    repository::escape_like,
};
use http_body_util::BodyExt;
use serde_json::json;

// --- Role ---

#[test]
fn test_role_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("user"));
    assert_eq!(Role::default(), Role::User);
}

#[test]
fn test_role_parsing() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!(Role::try_from("user".to_string()).unwrap(), Role::User);
    assert!("Admin".parse::<Role>().is_err());
    assert!("root".parse::<Role>().is_err());

    let req: UpdateRoleRequest = serde_json::from_value(json!({"role": "admin"})).unwrap();
    assert_eq!(req.role, Role::Admin);
    assert!(serde_json::from_value::<UpdateRoleRequest>(json!({"role": "owner"})).is_err());
}

// --- Responses ---

#[test]
fn test_post_response_shape() {
    let now = Utc::now();
    let post = PostResponse {
        id: 1,
        title: "Hello".to_string(),
        content: "World".to_string(),
        author: UserPublic {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        },
        created_at: now,
        updated_at: now,
        likes_count: 3,
        liked_by_me: true,
    };

    let value = serde_json::to_value(&post).unwrap();
    assert_eq!(value["author"]["id"], 7);
    assert_eq!(value["likes_count"], 3);
    assert_eq!(value["liked_by_me"], true);
    assert!(value["created_at"].is_string());
    assert!(value["author"].get("hashed_password").is_none());
}

#[test]
fn test_post_query_from_url() {
    let uri: Uri =
        "/posts?page=2&limit=5&search=rust&author_id=3&from_date=2024-01-01&to_date=2024-01-31"
            .parse()
            .unwrap();
    let Query(query) = Query::<PostQuery>::try_from_uri(&uri).unwrap();

    assert_eq!(query.page, Some(2));
    assert_eq!(query.limit, Some(5));
    assert_eq!(query.search.as_deref(), Some("rust"));
    assert_eq!(query.author_id, Some(3));
    assert_eq!(query.from_date.unwrap().to_string(), "2024-01-01");
    assert_eq!(query.to_date.unwrap().to_string(), "2024-01-31");
}

// --- Errors ---

#[test]
fn test_error_status_mapping() {
    let cases = [
        (AppError::Validation("v".into()), StatusCode::BAD_REQUEST),
        (AppError::Authentication("a".into()), StatusCode::UNAUTHORIZED),
        (AppError::Authorization("f".into()), StatusCode::FORBIDDEN),
        (AppError::NotFound("n".into()), StatusCode::NOT_FOUND),
        (AppError::Conflict("c".into()), StatusCode::CONFLICT),
        (AppError::Internal("i".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Database(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, status) in cases {
        assert_eq!(err.status_code(), status);
    }
}

#[tokio::test]
async fn test_error_body_hides_internal_details() {
    let response = AppError::Internal("connection string leaked".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"error": "Internal server error", "status": 500}));
}

#[tokio::test]
async fn test_error_body_for_client_errors() {
    let response = AppError::NotFound("Post not found".into()).into_response();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"error": "Post not found", "status": 404}));
}

#[test]
fn test_escape_like() {
    assert_eq!(escape_like("rust"), "rust");
    assert_eq!(escape_like("100%"), "100\\%");
    assert_eq!(escape_like("snake_case"), "snake\\_case");
    assert_eq!(escape_like("a\\b"), "a\\\\b");
}
