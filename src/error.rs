//! 错误处理模块
//!
//! 定义应用程序的错误类型和研究流水线的错误分类。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 上游服务错误（搜索后端、语言模型）
    #[error("上游服务错误: {0}")]
    Upstream(String),

    /// 研究流水线错误
    #[error(transparent)]
    Research(#[from] ResearchError),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        let body = Json(ErrorResponse::new(&code, &self.to_string()));
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response()
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息
    pub message: String,
    /// 详细信息
    pub details: Option<String>,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    /// 添加详细信息
    pub fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::NotFound(_) => (404, "NOT_FOUND".to_string()),
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::Timeout(_) => (408, "TIMEOUT".to_string()),
            AppError::Upstream(_) => (502, "BAD_GATEWAY".to_string()),
            AppError::Research(ResearchError::InvalidRequest(_)) => {
                (400, "BAD_REQUEST".to_string())
            }
            AppError::Research(ResearchError::AllBackendsFailed(_)) => {
                (502, "ALL_BACKENDS_FAILED".to_string())
            }
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 单个搜索后端的失败记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFailure {
    /// 后端名称
    pub backend: String,
    /// 失败原因
    pub reason: String,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.backend, self.reason)
    }
}

/// 研究流水线错误分类
///
/// 只有 `AllBackendsFailed` 和 `InvalidRequest` 会让一次研究进入 `Failed` 状态，
/// 其余错误都会被吸收为降级数据。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResearchError {
    /// 某个搜索后端不可用（可恢复，触发回退）
    #[error("search backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// 所有搜索后端均失败
    #[error("all search backends failed: {}", format_failures(.0))]
    AllBackendsFailed(Vec<BackendFailure>),

    /// 文本生成能力失败（在分析器内部恢复）
    #[error("text completion failed: {0}")]
    CompletionFailure(String),

    /// 实体/关系输入格式错误（逐条跳过）
    #[error("graph construction skipped item: {0}")]
    GraphConstruction(String),

    /// 无效的研究请求
    #[error("invalid research request: {0}")]
    InvalidRequest(String),
}

fn format_failures(failures: &[BackendFailure]) -> String {
    if failures.is_empty() {
        return "no backends configured".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
