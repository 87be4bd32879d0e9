use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mappers;
pub mod models;
pub mod repository;
pub mod services;

// Access-segregated routing (Public, Authenticated, Admin).
pub mod routes;
use auth::{AuthUser, TokenKeys};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI document
/// served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login_user, handlers::get_me,
        handlers::create_post, handlers::list_posts, handlers::get_post,
        handlers::update_post, handlers::delete_post, handlers::like_post,
        handlers::unlike_post, handlers::create_comment, handlers::list_comments,
        handlers::update_comment, handlers::delete_comment, handlers::follow_user,
        handlers::unfollow_user, handlers::list_followers, handlers::list_following,
        handlers::get_admin_users, handlers::update_user_role
    ),
    components(
        schemas(
            models::Role, models::RegisterRequest, models::LoginRequest, models::PostRequest,
            models::CommentRequest, models::UpdateRoleRequest, models::UserPublic,
            models::UserProfile, models::PostResponse, models::PaginatedPosts,
            models::CommentResponse, models::LikeStatus, models::TokenResponse,
            models::RegisterResponse, models::MessageResponse, models::Follow,
            models::FollowListEntry,
        )
    ),
    tags(
        (name = "devcommunity", description = "Developer Community API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every request: persistence, configuration and the
/// token keys derived from it.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
    /// Built once from `config.jwt_secret` and `config.token_ttl_minutes`.
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        // `AppConfig::load` already range-checks this; a hand-built config may not have.
        let minutes = if config::TOKEN_TTL_RANGE.contains(&config.token_ttl_minutes) {
            config.token_ttl_minutes
        } else {
            tracing::warn!(
                "token lifetime of {} minutes is out of range, using {}",
                config.token_ttl_minutes,
                config::DEFAULT_TOKEN_TTL_MINUTES
            );
            config::DEFAULT_TOKEN_TTL_MINUTES
        };
        let ttl = chrono::Duration::minutes(minutes);
        let tokens = TokenKeys::new(&config.jwt_secret, ttl);
        Self {
            repo,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull only the parts of the state they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(app_state: &AppState) -> TokenKeys {
        app_state.tokens.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `AuthUser` runs the full token check, so a bad
/// request is rejected with 401 before any handler is matched.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring malformed CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(AllowOrigin::list(allowed))
}

/// create_router
///
/// Assembles the routing tree, scoped middleware and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Role enforcement lives in the `AdminUser` extractor of each admin handler.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` so every log line of one request
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
