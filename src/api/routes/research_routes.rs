//! Research Routes
//!
//! 定义研究相关的 API 路由。

use crate::api::handlers::research_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建研究路由器
pub fn create_research_router() -> Router<AppState> {
    Router::new()
        .route("/research", post(run_research))
        .route("/analyze-url", post(analyze_url))
        .route("/backends", get(list_backends))
}
