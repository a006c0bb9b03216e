//! 可观测性模块
//!
//! 提供 Prometheus 文本指标、结构化日志和健康检查。

use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

// ===== Research Metrics =====

/// 研究流水线指标
#[derive(Debug, Default)]
pub struct ResearchMetrics {
    runs_total: AtomicU64,
    runs_failed: AtomicU64,
    runs_degraded: AtomicU64,
    backend_failures: AtomicU64,
    completion_failures: AtomicU64,
    run_duration_ms_sum: AtomicU64,
    http_requests_total: AtomicU64,
    http_request_duration_ms_sum: AtomicU64,
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_total: u64,
    pub runs_failed: u64,
    pub runs_degraded: u64,
    pub backend_failures: u64,
    pub completion_failures: u64,
    pub run_duration_ms_sum: u64,
    pub http_requests_total: u64,
}

impl ResearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次研究运行
    pub fn record_run(&self, duration_ms: u64, failed: bool, degraded: bool) {
        self.runs_total.fetch_add(1, Ordering::SeqCst);
        self.run_duration_ms_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
        if failed {
            self.runs_failed.fetch_add(1, Ordering::SeqCst);
        }
        if degraded {
            self.runs_degraded.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录搜索后端失败
    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录文本生成失败
    pub fn record_completion_failure(&self) {
        self.completion_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        self.http_request_duration_ms_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_total: self.runs_total.load(Ordering::SeqCst),
            runs_failed: self.runs_failed.load(Ordering::SeqCst),
            runs_degraded: self.runs_degraded.load(Ordering::SeqCst),
            backend_failures: self.backend_failures.load(Ordering::SeqCst),
            completion_failures: self.completion_failures.load(Ordering::SeqCst),
            run_duration_ms_sum: self.run_duration_ms_sum.load(Ordering::SeqCst),
            http_requests_total: self.http_requests_total.load(Ordering::SeqCst),
        }
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP research_runs_total Total research runs
# TYPE research_runs_total counter
research_runs_total {}
# HELP research_runs_failed_total Research runs that ended in the failed state
# TYPE research_runs_failed_total counter
research_runs_failed_total {}
# HELP research_runs_degraded_total Completed runs with a degraded analysis
# TYPE research_runs_degraded_total counter
research_runs_degraded_total {}
# HELP research_run_duration_seconds Research run duration in seconds
# TYPE research_run_duration_seconds summary
research_run_duration_seconds_sum {}
research_run_duration_seconds_count {}
# HELP search_backend_failures_total Search backend attempts that failed or timed out
# TYPE search_backend_failures_total counter
search_backend_failures_total {}
# HELP completion_failures_total Text completion calls that failed
# TYPE completion_failures_total counter
completion_failures_total {}
# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds summary
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
"#,
            s.runs_total,
            s.runs_failed,
            s.runs_degraded,
            s.run_duration_ms_sum as f64 / 1000.0,
            s.runs_total,
            s.backend_failures,
            s.completion_failures,
            s.http_requests_total,
            self.http_request_duration_ms_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            s.http_requests_total,
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
}

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
}

impl HealthCheckResult {
    pub fn new(name: &str, healthy: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            healthy,
            message: message.into(),
        }
    }
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<ResearchMetrics>,
    pub health_checks: Arc<Mutex<Vec<HealthCheckResult>>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: &str, metrics: Arc<ResearchMetrics>) -> Self {
        Self {
            metrics,
            health_checks: Arc::new(Mutex::new(Vec::new())),
            start_time: Utc::now(),
            version: version.to_string(),
        }
    }

    /// 添加健康检查结果，保留最近 10 条
    pub async fn add_health_check(&self, result: HealthCheckResult) {
        let mut checks = self.health_checks.lock().await;
        checks.push(result);
        if checks.len() > 10 {
            checks.remove(0);
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

fn status_label(healthy: bool) -> String {
    if healthy { "healthy" } else { "unhealthy" }.to_string()
}

/// 获取完整健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: status_label(all_healthy),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: checks
            .iter()
            .map(|c| HealthCheck {
                name: c.name.clone(),
                status: status_label(c.healthy),
                message: Some(c.message.clone()),
            })
            .collect(),
    };

    let status_code = if all_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        state.metrics.gather(),
    )
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// 记录请求指标的中间件
pub async fn track_requests(
    State(state): State<Arc<ObservabilityState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(req).await;
    state
        .metrics
        .record_http_request(start.elapsed().as_millis() as u64);
    response
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外按天滚动写入文件，
/// 返回的 guard 需要在进程生命周期内持有。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "deepdive.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true))
            .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {e}");
    }
    guard
}
