//! 搜索结果数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 情感倾向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// 正面
    Positive,
    /// 负面
    Negative,
    /// 中性
    #[default]
    Neutral,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

/// 搜索后端返回的原始结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// 标题
    pub title: String,
    /// 链接
    pub url: String,
    /// 正文
    #[serde(default)]
    pub content: String,
    /// 摘要
    #[serde(default)]
    pub snippet: String,
    /// 后端附加的元数据
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawHit {
    /// 创建原始结果
    pub fn new(title: &str, url: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            snippet: String::new(),
            metadata: HashMap::new(),
        }
    }

    /// 设置摘要
    pub fn with_snippet(mut self, snippet: &str) -> Self {
        self.snippet = snippet.to_string();
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// 正文为空时退回到摘要
    pub fn body(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.snippet
        } else {
            &self.content
        }
    }
}

/// 经过聚合与增强的搜索结果
///
/// 唯一键为规范化后的 URL，聚合完成后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 原始链接
    pub url: String,
    /// 标题
    pub title: String,
    /// 正文
    pub content: String,
    /// 摘要
    pub snippet: String,
    /// 来源后端
    pub source_tag: String,
    /// 聚合时间
    pub timestamp: DateTime<Utc>,
    /// 词典情感分析结果
    pub sentiment: Sentiment,
    /// 洞察句
    pub insights: Vec<String>,
    /// 元数据
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SearchHit {
    /// 元数据中的字符串字段
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// 用于提示词的摘要：优先元数据中的 summary，其次正文，最后 snippet
    pub fn summary(&self) -> &str {
        if let Some(summary) = self.metadata_str("summary") {
            return summary;
        }
        if !self.content.trim().is_empty() {
            &self.content
        } else {
            &self.snippet
        }
    }
}

/// 截断为指定字符数，超出时追加省略号
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_hit_body_falls_back_to_snippet() {
        let hit = RawHit::new("t", "https://a.example", "  ").with_snippet("short snippet");
        assert_eq!(hit.body(), "short snippet");

        let hit = RawHit::new("t", "https://a.example", "full text");
        assert_eq!(hit.body(), "full text");
    }

    #[test]
    fn test_truncate_with_ellipsis_counts_chars() {
        assert_eq!(truncate_with_ellipsis("abc", 5), "abc");
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("量子計算機の研究", 4), "量子計算...");
    }

    #[test]
    fn test_sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Negative).unwrap();
        assert_eq!(json, "\"negative\"");
    }
}
