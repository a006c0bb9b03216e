//! 研究 DTO
//!
//! 定义研究请求与单页分析请求的数据结构。响应直接返回
//! `ResearchRecord` / `PageAnalysis`。

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 默认返回结果数量
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// 单次请求允许的最大结果数量
pub const MAX_RESULTS_LIMIT: usize = 50;

/// 默认分析深度
pub const DEFAULT_DEPTH: u8 = 2;

/// 研究请求
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResearchRequest {
    /// 研究查询
    pub query: String,
    /// 返回结果数量
    #[serde(default)]
    pub max_results: Option<usize>,
    /// 分析深度 (1-3)
    #[serde(default)]
    pub depth: Option<u8>,
}

impl ResearchRequest {
    /// 校验请求并填充默认值，返回 (query, max_results, depth)
    pub fn validated(&self) -> Result<(String, usize, u8), AppError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Query cannot be empty".to_string()));
        }

        let max_results = self.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
            return Err(AppError::Validation(format!(
                "max_results must be between 1 and {MAX_RESULTS_LIMIT}"
            )));
        }

        Ok((
            query.to_string(),
            max_results,
            self.depth.unwrap_or(DEFAULT_DEPTH),
        ))
    }
}

/// 单页分析请求
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyzeUrlRequest {
    /// 网页地址
    pub url: String,
    /// 分析深度 (1-3)
    #[serde(default)]
    pub depth: Option<u8>,
}

impl AnalyzeUrlRequest {
    /// 校验请求并填充默认值，返回 (url, depth)
    pub fn validated(&self) -> Result<(String, u8), AppError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("URL cannot be empty".to_string()));
        }
        Ok((url.to_string(), self.depth.unwrap_or(DEFAULT_DEPTH)))
    }
}
