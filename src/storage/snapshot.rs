//! 研究结果快照
//!
//! 将完成的 `ResearchRecord` 以 JSON 文件形式保存。写入失败只记录日志，
//! 不影响研究运行的状态。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::models::ResearchRecord;

/// 研究结果持久化接口
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// 保存记录，返回写入位置
    async fn persist(&self, record: &ResearchRecord, filename: &str) -> Result<PathBuf>;
}

/// JSON 文件快照
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    /// 创建快照写入器
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 根据配置创建，未启用时返回 None
    pub fn from_config(config: &StorageConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.output_dir.clone()))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, record: &ResearchRecord, filename: &str) -> Result<PathBuf> {
        if filename.contains(['/', '\\']) || filename.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "invalid snapshot filename: {filename}"
            )));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(filename);
        let body = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, body).await?;

        info!("Saved research snapshot to {}", path.display());
        Ok(path)
    }
}

/// 尽力保存：失败只记录警告
pub async fn persist_best_effort(sink: &dyn ResultSink, record: &ResearchRecord) -> Option<PathBuf> {
    let filename = record.suggested_filename();
    match sink.persist(record, &filename).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Failed to save research snapshot {}: {}", filename, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, RecordMetadata, RunState, Visualization};
    use chrono::Utc;

    fn record() -> ResearchRecord {
        let now = Utc::now();
        ResearchRecord {
            id: "run-1".to_string(),
            query: "quantum computing breakthroughs".to_string(),
            state: RunState::Completed,
            error: None,
            hits: Vec::new(),
            analysis: Analysis::no_findings("quantum computing breakthroughs"),
            graph: Visualization::empty(),
            central_entities: Vec::new(),
            state_history: Vec::new(),
            started_at: now,
            finished_at: now,
            metadata: RecordMetadata {
                max_results: 10,
                depth: 2,
                hit_count: 0,
                entity_count: 0,
                degraded: false,
            },
        }
    }

    #[tokio::test]
    async fn test_persist_writes_pretty_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path().join("results"));
        let record = record();

        let path = sink
            .persist(&record, &record.suggested_filename())
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"id\": \"run-1\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["state"], "completed");
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("cot_research_")
        );
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path());
        assert!(sink.persist(&record(), "../escape.json").await.is_err());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        // a regular file where the output directory should be
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();
        let sink = JsonFileSink::new(&blocker);

        assert!(persist_best_effort(&sink, &record()).await.is_none());
    }

    #[test]
    fn test_disabled_config() {
        let config = StorageConfig {
            enabled: false,
            ..StorageConfig::default()
        };
        assert!(JsonFileSink::from_config(&config).is_none());
    }
}
