use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all potato endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/v1/potatoes",
            get(handler::list_potatoes).post(handler::create_potato),
        )
        .route("/v1/potatoes/:id", get(handler::get_potato))
        .route("/v1/potatoes/:id/transfer", post(handler::transfer_potato))
        .route("/v1/actors/:actor/potatoes", get(handler::actor_potatoes))
        .route("/v1/audit", get(handler::audit_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
