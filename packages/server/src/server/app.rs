//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{
    catalog_handler, company_jobs_handler, health_handler, tech_jobs_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: ServerDeps,
}

/// CORS policy: any origin when `allowed_origins` is empty, otherwise only
/// the listed ones. Unparseable origins are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE])
}

/// Build the router. Routes live under `api_prefix` (empty for the root).
pub fn build_app(deps: ServerDeps, api_prefix: &str, allowed_origins: &[String]) -> Router {
    let app_state = AxumAppState { deps };

    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/jobs", get(catalog_handler))
        .route("/jobs/all", get(tech_jobs_handler))
        .route("/jobs/:company", get(company_jobs_handler));

    let router = if api_prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(api_prefix, api)
    };

    router
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
