//! 服务模块

pub mod aggregator;
pub mod analyzer;
pub mod cot_parser;
pub mod enrichment;
pub mod orchestrator;
pub mod page_analysis;

pub use aggregator::ResultAggregator;
pub use analyzer::{HypothesisAnalyzer, MAX_DEPTH, MIN_DEPTH, build_prompt};
pub use cot_parser::{ParsedAnalysis, parse_cot_response};
pub use enrichment::{analyze_sentiment, extract_insights, extract_keywords};
pub use orchestrator::ResearchOrchestrator;
pub use page_analysis::PageAnalyzer;
