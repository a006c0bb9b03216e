//! 研究记录与运行状态机

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::analysis::Analysis;
use crate::models::graph::{CentralEntity, Visualization};
use crate::models::hit::SearchHit;

/// 单次研究的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// 已开始
    Started,
    /// 搜索中
    Crawling,
    /// 分析中
    Analyzing,
    /// 构建图谱中
    GraphBuilding,
    /// 已完成（可能是降级结果）
    Completed,
    /// 已失败
    Failed,
}

impl RunState {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    /// 状态转换是否合法
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Started, Crawling)
            | (Crawling, Analyzing)
            | (Analyzing, GraphBuilding)
            | (GraphBuilding, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Started => write!(f, "started"),
            RunState::Crawling => write!(f, "crawling"),
            RunState::Analyzing => write!(f, "analyzing"),
            RunState::GraphBuilding => write!(f, "graph_building"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// 状态变更记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: RunState,
    pub at: DateTime<Utc>,
}

/// 记录元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub max_results: usize,
    pub depth: u8,
    pub hit_count: usize,
    pub entity_count: usize,
    pub degraded: bool,
}

/// 研究记录
///
/// 返回给所有外部协作者的单元。图谱以渲染后的值拷贝保存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRecord {
    /// 记录 ID
    pub id: String,
    /// 查询
    pub query: String,
    /// 最终状态
    pub state: RunState,
    /// 失败原因（仅 `Failed`）
    pub error: Option<String>,
    /// 聚合后的搜索结果
    pub hits: Vec<SearchHit>,
    /// 分析结果
    pub analysis: Analysis,
    /// 图谱可视化
    pub graph: Visualization,
    /// 中心实体
    pub central_entities: Vec<CentralEntity>,
    /// 状态历史
    pub state_history: Vec<StateChange>,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间
    pub finished_at: DateTime<Utc>,
    /// 元数据
    pub metadata: RecordMetadata,
}

impl ResearchRecord {
    /// 是否成功完成
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// 建议的快照文件名（附带记录 ID，同一秒内的运行互不覆盖）
    pub fn suggested_filename(&self) -> String {
        format!(
            "cot_research_{}_{}.json",
            self.started_at.format("%Y%m%d_%H%M%S"),
            self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RunState::Started, RunState::Crawling, true)]
    #[case(RunState::Crawling, RunState::Analyzing, true)]
    #[case(RunState::Analyzing, RunState::GraphBuilding, true)]
    #[case(RunState::GraphBuilding, RunState::Completed, true)]
    #[case(RunState::Started, RunState::Failed, true)]
    #[case(RunState::GraphBuilding, RunState::Failed, true)]
    #[case(RunState::Started, RunState::Analyzing, false)]
    #[case(RunState::Crawling, RunState::Completed, false)]
    #[case(RunState::Completed, RunState::Failed, false)]
    #[case(RunState::Failed, RunState::Crawling, false)]
    #[case(RunState::Failed, RunState::Failed, false)]
    fn test_transitions(#[case] from: RunState, #[case] to: RunState, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::GraphBuilding.is_terminal());
    }

    fn record(id: &str, started_at: DateTime<Utc>) -> ResearchRecord {
        ResearchRecord {
            id: id.to_string(),
            query: "quantum".to_string(),
            state: RunState::Completed,
            error: None,
            hits: Vec::new(),
            analysis: Analysis::no_findings("quantum"),
            graph: Visualization::empty(),
            central_entities: Vec::new(),
            state_history: Vec::new(),
            started_at,
            finished_at: started_at,
            metadata: RecordMetadata {
                max_results: 10,
                depth: 2,
                hit_count: 0,
                entity_count: 0,
                degraded: false,
            },
        }
    }

    #[test]
    fn test_filenames_distinct_within_one_second() {
        let started_at = Utc::now();
        let first = record("run-a", started_at);
        let second = record("run-b", started_at);

        assert_ne!(first.suggested_filename(), second.suggested_filename());
        let name = first.suggested_filename();
        assert!(name.starts_with("cot_research_"));
        assert!(name.ends_with("_run-a.json"));
    }
}
