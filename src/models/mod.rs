//! 核心数据模型模块
//!
//! 定义 Deepdive 的核心数据结构：SearchHit, Analysis, 实体/关系,
//! 图谱可视化以及 ResearchRecord。

pub mod analysis;
pub mod entity;
pub mod graph;
pub mod hit;
pub mod record;

pub use analysis::*;
pub use entity::*;
pub use graph::*;
pub use hit::*;
pub use record::*;
