//! 存储层模块
//!
//! 研究记录的快照持久化。

pub mod snapshot;

pub use snapshot::{JsonFileSink, ResultSink, persist_best_effort};
