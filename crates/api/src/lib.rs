//! HTTP API server with observability for the cart service.
//!
//! Provides REST endpoints for carts, coupons and checkout, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use cart_store::{CartStore, CouponStore};
use domain::CartService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::carts::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CartStore + CouponStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/carts",
            post(routes::carts::create::<S>).get(routes::carts::list::<S>),
        )
        .route("/carts/{id}", get(routes::carts::get::<S>))
        .route("/carts/{id}/items", post(routes::carts::add_items::<S>))
        .route(
            "/carts/{id}/items/{item_id}",
            patch(routes::carts::update_item::<S>).delete(routes::carts::remove_item::<S>),
        )
        .route("/carts/{id}/coupon", post(routes::coupons::apply::<S>))
        .route("/carts/{id}/validate", post(routes::checkout::validate::<S>))
        .route("/carts/{id}/checkout", post(routes::checkout::initiate::<S>))
        .route("/carts/{id}/order", post(routes::checkout::place_order::<S>))
        .route(
            "/carts/{id}/payment",
            post(routes::checkout::trigger_payment::<S>),
        )
        .route(
            "/carts/{id}/validation-failure",
            post(routes::checkout::validation_failure::<S>),
        )
        .route("/carts/{id}/abandon", post(routes::carts::abandon::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Builds the CORS layer. An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the application state around a store that holds both carts and coupons.
pub fn create_default_state<S: CartStore + CouponStore + Clone + 'static>(
    store: S,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart_service: CartService::new(store.clone(), store),
    })
}
