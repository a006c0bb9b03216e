use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    api::{
        app_state::AppState,
        dto::{AnalyzeUrlRequest, ResearchRequest},
    },
    error::AppError,
};

/// 执行一次研究
///
/// 完成返回 200，失败返回 502，两者都携带完整的研究记录；超时返回 408。
pub async fn run_research(
    State(state): State<AppState>,
    Json(request): Json<ResearchRequest>,
) -> Result<Response, AppError> {
    let (query, max_results, depth) = request.validated()?;
    debug!(
        "Research request: query={:?}, max_results={}, depth={}",
        query, max_results, depth
    );

    let record = tokio::time::timeout(
        state.request_timeout,
        state.orchestrator.run(&query, max_results, depth),
    )
    .await
    .map_err(|_| {
        AppError::Timeout(format!(
            "research did not finish within {:?}",
            state.request_timeout
        ))
    })?;

    let status = if record.is_completed() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(record)).into_response())
}

/// 分析单个网页
///
/// 成功返回 200；抓取失败返回 502 并携带带错误标记的结果；URL 无效返回 400。
pub async fn analyze_url(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeUrlRequest>,
) -> Result<Response, AppError> {
    let (url, depth) = request.validated()?;
    debug!("Page analysis request: url={}, depth={}", url, depth);

    let result = tokio::time::timeout(
        state.request_timeout,
        state.page_analyzer.analyze_url(&url, depth),
    )
    .await
    .map_err(|_| {
        AppError::Timeout(format!(
            "page analysis did not finish within {:?}",
            state.request_timeout
        ))
    })??;

    let status = if result.is_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)).into_response())
}

/// 列出已配置的搜索后端（按优先级）
pub async fn list_backends(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "backends": state.backend_names.as_slice() }))
}
