//! API 模块
//!
//! 提供 REST API 支持。

#[cfg(test)]
mod api_tests;
pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::error::AppError;
use crate::observability::{ObservabilityState, create_observability_router, track_requests};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new().merge(routes::research_routes::create_research_router());

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// API 路由加上健康检查和指标端点，所有请求计入指标
pub fn create_app(app_state: AppState, observability: Arc<ObservabilityState>) -> Router {
    create_observability_router(observability.clone())
        .merge(create_router(app_state))
        .layer(axum::middleware::from_fn_with_state(
            observability,
            track_requests,
        ))
}

pub async fn initialize_api(
    app_state: AppState,
    observability: Arc<ObservabilityState>,
) -> Result<Router, AppError> {
    tracing::info!("Initializing API router...");
    Ok(create_app(app_state, observability))
}
