//! 实体和关系数据模型
//!
//! 用于构建知识图谱，描述从分析文本中抽取出的实体及其关系

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResearchError;

/// 未指定类型时使用的实体类型
pub const UNKNOWN_ENTITY_TYPE: &str = "unknown";

/// 未指定类型时使用的关系类型
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "related";

/// 未指定时的默认重要度
pub const DEFAULT_IMPORTANCE: f32 = 0.5;

/// 未指定时的默认关系权重
pub const DEFAULT_WEIGHT: f32 = 0.5;

/// 实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInput {
    /// 实体名称（图内唯一键）
    pub name: String,

    /// 实体类型
    #[serde(rename = "type", default = "unknown_type")]
    pub entity_type: String,

    /// 重要度 (0.0-1.0)
    #[serde(default = "default_importance")]
    pub importance: f32,
}

fn unknown_type() -> String {
    UNKNOWN_ENTITY_TYPE.to_string()
}

fn related_type() -> String {
    DEFAULT_RELATIONSHIP_TYPE.to_string()
}

fn default_importance() -> f32 {
    DEFAULT_IMPORTANCE
}

fn default_weight() -> f32 {
    DEFAULT_WEIGHT
}

impl EntityInput {
    /// 创建实体
    pub fn new(name: &str, entity_type: &str, importance: f32) -> Self {
        Self {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            importance,
        }
    }

    /// 只有名称的实体，类型为 unknown
    pub fn bare(name: &str) -> Self {
        Self::new(name, UNKNOWN_ENTITY_TYPE, DEFAULT_IMPORTANCE)
    }

    /// 从模型输出的 JSON 值宽松解析
    ///
    /// 接受字符串（仅名称）或对象；对象中 `importance` 缺失时尝试 `relevance`。
    pub fn from_value(value: &Value) -> Result<Self, ResearchError> {
        match value {
            Value::String(name) => non_blank(name, "entity name").map(|n| Self::bare(&n)),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ResearchError::GraphConstruction("entity without a name".into())
                    })
                    .and_then(|n| non_blank(n, "entity name"))?;
                let entity_type = map
                    .get("type")
                    .or_else(|| map.get("entity_type"))
                    .and_then(Value::as_str)
                    .map(normalize_label)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(unknown_type);
                let importance = match map.get("importance").or_else(|| map.get("relevance")) {
                    Some(v) => number(v, "importance")?,
                    None => DEFAULT_IMPORTANCE,
                };
                Ok(Self {
                    name,
                    entity_type,
                    importance,
                })
            }
            other => Err(ResearchError::GraphConstruction(format!(
                "unsupported entity value: {other}"
            ))),
        }
    }
}

/// 关系
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipInput {
    /// 源实体名称
    pub source: String,

    /// 目标实体名称
    pub target: String,

    /// 关系类型
    #[serde(rename = "type", default = "related_type")]
    pub relationship_type: String,

    /// 关系权重 (0.0-1.0)
    #[serde(default = "default_weight")]
    pub weight: f32,
}

impl RelationshipInput {
    /// 创建关系
    pub fn new(source: &str, target: &str, relationship_type: &str, weight: f32) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: relationship_type.to_string(),
            weight,
        }
    }

    /// 从模型输出的 JSON 值宽松解析
    pub fn from_value(value: &Value) -> Result<Self, ResearchError> {
        let map = value.as_object().ok_or_else(|| {
            ResearchError::GraphConstruction(format!("unsupported relationship value: {value}"))
        })?;
        let endpoint = |keys: &[&str], label: &str| -> Result<String, ResearchError> {
            let raw = keys
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .ok_or_else(|| {
                    ResearchError::GraphConstruction(format!("relationship without {label}"))
                })?;
            non_blank(raw, label)
        };

        let source = endpoint(&["source", "from"], "source")?;
        let target = endpoint(&["target", "to"], "target")?;
        let relationship_type = map
            .get("type")
            .or_else(|| map.get("relation"))
            .and_then(Value::as_str)
            .map(normalize_label)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(related_type);
        let weight = match map.get("weight").or_else(|| map.get("strength")) {
            Some(v) => number(v, "weight")?,
            None => DEFAULT_WEIGHT,
        };

        Ok(Self {
            source,
            target,
            relationship_type,
            weight,
        })
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_blank(raw: &str, label: &str) -> Result<String, ResearchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ResearchError::GraphConstruction(format!("blank {label}")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn number(value: &Value, label: &str) -> Result<f32, ResearchError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(n as f32),
        _ => Err(ResearchError::GraphConstruction(format!(
            "{label} is not a finite number: {value}"
        ))),
    }
}
