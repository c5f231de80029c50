//! emr-server library crate
//!
//! Exposes `build_app` and the pieces needed to assemble its state, so
//! integration tests can drive the router without binding to a TCP port.
//! The binary entrypoint is in `main.rs`.

pub mod ai;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod fhir;
mod middleware;
pub mod models;
mod routes;
pub mod smart;
pub mod state;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::ApiKeyAuth;
use state::AppState;

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the full application router with all routes and middleware.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let auth = ApiKeyAuth::new(config.api_key.clone());
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Everything under /api is rate limited; all of it but the OAuth
    // callback needs the API key
    let api = Router::new()
        .merge(
            routes::api_routes()
                .layer(axum_mw::from_fn(middleware::auth_middleware))
                .layer(Extension(auth)),
        )
        .merge(routes::ehr_public_routes())
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // Repeated installs (one per test app) keep the first global recorder;
    // each app still gets a handle to render
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    Router::new()
        .merge(public_routes)
        .nest("/api", api)
        .with_state(state.clone())
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(Extension(state.audit))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}
