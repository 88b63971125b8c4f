use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

pub mod routes;
use auth::CurrentAuthor;
use error::ApiError;
use routes::{authors, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// AuthorsApi
///
/// OpenAPI description of the author routes, relative to their mount prefix.
/// Served at `/api-docs/openapi.json` after being nested under the prefix.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_author, handlers::list_authors, handlers::get_me,
        handlers::update_me, handlers::delete_me, handlers::get_my_stories,
        handlers::get_author, handlers::update_author, handlers::delete_author,
    ),
    components(
        schemas(
            models::Author, models::Role, models::AuthorSummary, models::BlogPost,
            models::ReadTime, models::CreateAuthorRequest, models::UpdateAuthorRequest,
            models::ErrorBody,
        )
    ),
    tags(
        (name = "authors", description = "Blog author management API")
    )
)]
struct AuthorsApi;

/// Builds the served OpenAPI document with author paths placed under `prefix`.
pub fn api_doc(prefix: &str) -> utoipa::openapi::OpenApi {
    if prefix == "/" {
        AuthorsApi::openapi()
    } else {
        let root = utoipa::openapi::OpenApiBuilder::new()
            .info(utoipa::openapi::InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build())
            .build();
        root.nest(prefix, AuthorsApi::openapi())
    }
}

/// AppState
///
/// The shared, immutable container of services and configuration handed to every
/// request. The store is injected here, so tests can swap in `MemoryRepository`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests and local runs.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

/// auth_middleware
///
/// Runs the credential guard for every author route and stores the resolved
/// identity in the request extensions, so handlers and the admin guard reuse it.
/// Rejects with 401 before the handler executes.
async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let author = auth::evaluate_guards(auth::AUTHENTICATED, &parts, &state.repo).await?;
    parts.extensions.insert(CurrentAuthor(author));
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let prefix = state.config.authors_prefix.clone();

    // Author routes: every route passes the credential guard first.
    let author_routes = authors::author_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc(&prefix)))
        .merge(public::public_routes());

    // axum refuses to nest at the root.
    let base_router = if prefix == "/" {
        base_router.merge(author_routes)
    } else {
        base_router.nest(&prefix, author_routes)
    };

    base_router
        .with_state(state)
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
/// Builds the per-request span with method, uri and the `x-request-id` so every
/// log line of one request can be correlated.
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
