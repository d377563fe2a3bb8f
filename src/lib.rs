use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Listing pipeline, leaves first.
pub mod models;
pub mod error;
pub mod registry;
pub mod repository;
pub mod structure;
pub mod batch;
pub mod formatter;
pub mod strings;
pub mod assembler;
pub mod service;
pub mod render;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use registry::{CapabilityCatalog, ModuleRegistry};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use service::ListingService;

/// ApiDoc
///
/// OpenAPI document for the service, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_course_resources),
    tags(
        (name = "course-resources", description = "Course resource listing")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Course store, also used by the `AuthUser` extractor.
    pub repo: RepositoryState,
    /// The listing pipeline with its registry, structure cache and formatters.
    pub listing: ListingService,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the listing service around `repo` and `registry`.
    pub fn new(repo: RepositoryState, registry: ModuleRegistry, config: AppConfig) -> Self {
        let listing = ListingService::new(Arc::clone(&repo), Arc::new(registry), &config);
        Self { repo, listing, config }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects unauthenticated requests with 401 before they reach a handler: extracting
/// `AuthUser` fails when there is no valid session.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the auth layer and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
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
/// Span for `TraceLayer` carrying method, URI and the `x-request-id` so every log
/// line of one request can be correlated.
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
