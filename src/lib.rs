pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::archive_store::{ArchiveStore, LocalArchiveStore};
use crate::services::batch::SipBatchService;
use crate::services::upload_resolver::{InferDetector, MediaDetector};
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::config::client_config,
        api::handlers::generate::generate_sips,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            models::RowDescriptor,
            models::GenerateResponse,
            models::NetworkInfo,
            models::ClientConfigResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "sip", description = "SIP batch generation"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn ArchiveStore>,
    pub batch: Arc<SipBatchService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ArchiveStore>,
        detector: Arc<dyn MediaDetector>,
    ) -> Self {
        let batch = Arc::new(SipBatchService::new(&config, store.clone(), detector));
        Self {
            config,
            store,
            batch,
        }
    }

    /// Filesystem store under `config.output_dir` with magic-byte detection.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn ArchiveStore> = Arc::new(LocalArchiveStore::new(&config.output_dir));
        Self::new(config, store, Arc::new(InferDetector))
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_app(state: AppState) -> Router {
    let downloads = ServeDir::new(&state.config.output_dir);
    let base_path = state.config.public_base_path.clone();

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/config",
            get(api::handlers::config::client_config).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/generate",
            post(api::handlers::generate::generate_sips).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        );

    // Absolute URLs point at another host; nothing to serve locally
    let router = if base_path == "/" {
        router.fallback_service(downloads)
    } else if base_path.starts_with('/') {
        router.nest_service(&base_path, downloads)
    } else {
        router
    };

    router
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_request_size,
        ))
        .with_state(state)
}
