//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod research_handler;

pub use research_handler::*;
