//! Research run sequencing
//!
//! One run: validate, aggregate, analyze, build the entity graph, assemble the
//! record and hand it to the snapshot sink.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::GraphConfig;
use crate::error::ResearchError;
use crate::graph::EntityGraphBuilder;
use crate::models::{
    Analysis, CentralEntity, RecordMetadata, ResearchRecord, RunState, SearchHit, StateChange,
    Visualization,
};
use crate::observability::ResearchMetrics;
use crate::services::aggregator::ResultAggregator;
use crate::services::analyzer::{HypothesisAnalyzer, clamp_depth};
use crate::storage::{ResultSink, persist_best_effort};

/// Run state with its timestamped history
struct RunProgress {
    state: RunState,
    history: Vec<StateChange>,
}

impl RunProgress {
    fn start() -> Self {
        Self {
            state: RunState::Started,
            history: vec![StateChange {
                state: RunState::Started,
                at: Utc::now(),
            }],
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            error!("Rejected run state transition {} -> {}", self.state, next);
            return;
        }
        self.state = next;
        self.history.push(StateChange {
            state: next,
            at: Utc::now(),
        });
    }
}

/// Output of the pipeline stages for a run that reached the graph step
struct Findings {
    hits: Vec<SearchHit>,
    analysis: Analysis,
    graph: Visualization,
    central_entities: Vec<CentralEntity>,
}

/// Composes aggregation, analysis and graph building into one research run
pub struct ResearchOrchestrator {
    aggregator: Arc<ResultAggregator>,
    analyzer: Arc<HypothesisAnalyzer>,
    graph_builder: EntityGraphBuilder,
    sink: Option<Arc<dyn ResultSink>>,
    metrics: Option<Arc<ResearchMetrics>>,
}

impl ResearchOrchestrator {
    pub fn new(
        aggregator: Arc<ResultAggregator>,
        analyzer: Arc<HypothesisAnalyzer>,
        graph_config: GraphConfig,
    ) -> Self {
        Self {
            aggregator,
            analyzer,
            graph_builder: EntityGraphBuilder::new(graph_config),
            sink: None,
            metrics: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ResearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs one research request to a terminal state.
    ///
    /// Never returns an error: failures are reported through
    /// `ResearchRecord::state` and `ResearchRecord::error`.
    pub async fn run(&self, query: &str, max_results: usize, depth: u8) -> ResearchRecord {
        let started_at = Utc::now();
        let timer = Instant::now();
        let query = query.trim();
        let depth = clamp_depth(depth);
        let mut progress = RunProgress::start();

        info!(
            "Starting research run for {:?} (max_results={}, depth={})",
            query, max_results, depth
        );

        let outcome = self.execute(query, max_results, depth, &mut progress).await;

        let (findings, error) = match outcome {
            Ok(findings) => {
                progress.advance(RunState::Completed);
                (findings, None)
            }
            Err(e) => {
                warn!("Research run for {:?} failed: {}", query, e);
                progress.advance(RunState::Failed);
                let findings = Findings {
                    hits: Vec::new(),
                    analysis: Analysis::empty(query),
                    graph: Visualization::empty(),
                    central_entities: Vec::new(),
                };
                (findings, Some(e.to_string()))
            }
        };

        let record = ResearchRecord {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            state: progress.state,
            error,
            metadata: RecordMetadata {
                max_results,
                depth,
                hit_count: findings.hits.len(),
                entity_count: findings.graph.nodes.len(),
                degraded: findings.analysis.degraded,
            },
            hits: findings.hits,
            analysis: findings.analysis,
            graph: findings.graph,
            central_entities: findings.central_entities,
            state_history: progress.history,
            started_at,
            finished_at: Utc::now(),
        };

        let elapsed_ms = timer.elapsed().as_millis() as u64;
        if let Some(metrics) = &self.metrics {
            metrics.record_run(elapsed_ms, !record.is_completed(), record.metadata.degraded);
        }

        info!(
            "Research run {} finished as {} in {}ms ({} hits, {} entities)",
            record.id,
            record.state,
            elapsed_ms,
            record.metadata.hit_count,
            record.metadata.entity_count
        );

        if let Some(sink) = &self.sink {
            if record.is_completed() {
                persist_best_effort(sink.as_ref(), &record).await;
            }
        }

        record
    }

    async fn execute(
        &self,
        query: &str,
        max_results: usize,
        depth: u8,
        progress: &mut RunProgress,
    ) -> Result<Findings, ResearchError> {
        validate(query, max_results)?;

        progress.advance(RunState::Crawling);
        let hits = self.aggregator.aggregate(query, max_results).await?;

        progress.advance(RunState::Analyzing);
        let analysis = self.analyzer.analyze(query, &hits, depth).await;

        progress.advance(RunState::GraphBuilding);
        let (graph, central_entities) = if analysis.has_graph_data() {
            let graph = self
                .graph_builder
                .build(&analysis.entities, &analysis.relationships);
            let top_k = self.graph_builder.config().top_k;
            (graph.render(), graph.central_entities(top_k))
        } else {
            info!("No entities extracted for {:?}, skipping graph", query);
            (Visualization::empty(), Vec::new())
        };

        Ok(Findings {
            hits,
            analysis,
            graph,
            central_entities,
        })
    }
}

fn validate(query: &str, max_results: usize) -> Result<(), ResearchError> {
    if query.is_empty() {
        return Err(ResearchError::InvalidRequest("query must not be blank".into()));
    }
    if max_results == 0 {
        return Err(ResearchError::InvalidRequest(
            "max_results must be at least 1".into(),
        ));
    }
    Ok(())
}
