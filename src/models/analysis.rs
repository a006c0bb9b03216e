//! 分析结果数据模型

use serde::{Deserialize, Serialize};

use crate::models::entity::{EntityInput, RelationshipInput};
use crate::models::hit::{SearchHit, Sentiment};

/// 分析失败时的摘要占位
pub const ANALYSIS_UNAVAILABLE: &str = "analysis unavailable";

/// 默认假设置信度
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// 可证伪的假设
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// 假设陈述
    pub statement: String,
    /// 支持证据
    pub supporting_evidence: Vec<String>,
    /// 反驳证据
    pub contradicting_evidence: Vec<String>,
    /// 置信度 (0.0-1.0)
    pub confidence: f32,
}

impl Hypothesis {
    /// 创建只有陈述的假设
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            supporting_evidence: Vec::new(),
            contradicting_evidence: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// 一次研究的结构化分析
///
/// `raw_text` 始终保留模型原始输出，解析是启发式且有损的。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// 查询
    pub query: String,
    /// 摘要
    pub summary: String,
    /// 关键词
    pub keywords: Vec<String>,
    /// 整体情感
    pub sentiment: Sentiment,
    /// 主要洞察
    pub insights: Vec<String>,
    /// 模式与关联
    pub patterns: Vec<String>,
    /// 假设
    pub hypotheses: Vec<Hypothesis>,
    /// 最可能的结论
    pub conclusion: String,
    /// 信息源可靠性说明
    pub reliability_note: String,
    /// 需要进一步调查的问题
    pub open_questions: Vec<String>,
    /// 抽取的实体
    pub entities: Vec<EntityInput>,
    /// 抽取的关系
    pub relationships: Vec<RelationshipInput>,
    /// 未能解析到的章节
    pub missing_sections: Vec<String>,
    /// 是否为降级结果
    pub degraded: bool,
    /// 模型原始输出
    pub raw_text: String,
}

impl Analysis {
    /// 空分析
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            summary: String::new(),
            keywords: Vec::new(),
            sentiment: Sentiment::Neutral,
            insights: Vec::new(),
            patterns: Vec::new(),
            hypotheses: Vec::new(),
            conclusion: String::new(),
            reliability_note: String::new(),
            open_questions: Vec::new(),
            entities: Vec::new(),
            relationships: Vec::new(),
            missing_sections: Vec::new(),
            degraded: false,
            raw_text: String::new(),
        }
    }

    /// 文本生成失败时的降级分析，错误记录在 `reliability_note`
    pub fn unavailable(query: &str, reason: &str) -> Self {
        Self {
            summary: ANALYSIS_UNAVAILABLE.to_string(),
            reliability_note: reason.to_string(),
            degraded: true,
            ..Self::empty(query)
        }
    }

    /// 没有任何搜索结果时的分析
    pub fn no_findings(query: &str) -> Self {
        Self {
            summary: format!("no findings for query \"{query}\""),
            reliability_note: "no sources were found by any search backend".to_string(),
            ..Self::empty(query)
        }
    }

    /// 是否包含可用于构建图谱的结构化输出
    pub fn has_graph_data(&self) -> bool {
        !self.entities.is_empty() || !self.relationships.is_empty()
    }
}

/// 单个网页的分析结果
///
/// 抓取失败时 `page.source_tag` 为 `"error"`，`error` 记录原因，分析为降级结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// 被分析的网页
    pub page: SearchHit,
    /// 分析结果
    pub analysis: Analysis,
    /// 失败原因
    pub error: Option<String>,
}

impl PageAnalysis {
    /// 是否抓取或分析失败
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_degraded_and_empty() {
        let analysis = Analysis::unavailable("q", "timed out after 5s");
        assert_eq!(analysis.summary, ANALYSIS_UNAVAILABLE);
        assert!(analysis.degraded);
        assert!(analysis.hypotheses.is_empty());
        assert!(analysis.insights.is_empty());
        assert_eq!(analysis.reliability_note, "timed out after 5s");
    }

    #[test]
    fn test_no_findings_is_not_degraded() {
        let analysis = Analysis::no_findings("quantum");
        assert!(!analysis.degraded);
        assert!(analysis.summary.contains("no findings"));
        assert!(!analysis.has_graph_data());
    }
}
