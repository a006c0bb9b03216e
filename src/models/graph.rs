//! 知识图谱可视化数据模型
//!
//! 渲染结果是图的值拷贝，供前端等消费方使用。

use serde::{Deserialize, Serialize};

use crate::config::LayoutAlgorithm;

/// 可视化节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// importance * node_size_scale
    pub size: f32,
    pub importance: f32,
    pub x: f64,
    pub y: f64,
}

/// 可视化边
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub weight: f32,
    /// weight * edge_width_scale
    pub width: f32,
}

/// 可视化元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub layout_algorithm: LayoutAlgorithm,
}

/// 图谱可视化
///
/// 空图渲染为 `{"nodes": [], "edges": []}`，不包含元数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Visualization {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VisualizationMetadata>,
}

impl Visualization {
    /// 空图
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// 中心性排名中的实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralEntity {
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub importance: f32,
    pub centrality: f64,
}
