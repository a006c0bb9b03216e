//! Deepdive - 思维链深度研究服务
//!
//! 将多个搜索后端的结果聚合去重，通过多假设思维链分析生成结构化结论，
//! 并从分析中抽取实体关系构建知识图谱。

pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod models;
pub mod observability;
pub mod search;
pub mod services;
pub mod storage;
