//! Multi-hypothesis chain-of-thought analysis

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::{CompletionError, CompletionOptions, TextCompletion};
use crate::models::{Analysis, SearchHit};
use crate::observability::ResearchMetrics;
use crate::services::cot_parser::parse_cot_response;
use crate::services::enrichment::{DEFAULT_KEYWORD_LIMIT, analyze_sentiment, extract_keywords};

/// Supported analysis depths
pub const MIN_DEPTH: u8 = 1;
pub const MAX_DEPTH: u8 = 3;

/// Builds the CoT prompt, calls the completion backend and parses the answer
pub struct HypothesisAnalyzer {
    completion: Arc<dyn TextCompletion>,
    options: CompletionOptions,
    timeout: Duration,
    metrics: Option<Arc<ResearchMetrics>>,
}

impl HypothesisAnalyzer {
    pub fn new(completion: Arc<dyn TextCompletion>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            completion,
            options,
            timeout,
            metrics: None,
        }
    }

    pub fn from_config(completion: Arc<dyn TextCompletion>, config: &LlmConfig) -> Self {
        Self::new(
            completion,
            CompletionOptions::from(config),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<ResearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Analyzes `hits` for `query`. Never fails: completion problems yield a
    /// degraded analysis and an empty hit list yields a "no findings" one.
    pub async fn analyze(&self, query: &str, hits: &[SearchHit], depth: u8) -> Analysis {
        if hits.is_empty() {
            info!("No hits for {:?}, skipping completion", query);
            return Analysis::no_findings(query);
        }

        let depth = clamp_depth(depth);
        let corpus = hits
            .iter()
            .map(|h| format!("{} {}", h.title, h.content))
            .collect::<Vec<_>>()
            .join("\n");
        let keywords = extract_keywords(&corpus, DEFAULT_KEYWORD_LIMIT);
        let sentiment = analyze_sentiment(&corpus);

        let prompt = build_prompt(query, hits, depth);
        debug!("CoT prompt built ({} chars, depth {})", prompt.chars().count(), depth);

        let text = match self.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Analysis degraded for {:?}: {}", query, e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_completion_failure();
                }
                return Analysis {
                    keywords,
                    sentiment,
                    ..Analysis::unavailable(query, &e.to_string())
                };
            }
        };

        let parsed = parse_cot_response(&text);
        if !parsed.missing_sections.is_empty() {
            debug!("Sections not found in analysis: {:?}", parsed.missing_sections);
        }
        info!(
            "Analysis parsed: {} hypotheses, {} entities, {} relationships",
            parsed.hypotheses.len(),
            parsed.entities.len(),
            parsed.relationships.len()
        );

        Analysis {
            query: query.to_string(),
            summary: parsed.summary,
            keywords,
            sentiment,
            insights: parsed.insights,
            patterns: parsed.patterns,
            hypotheses: parsed.hypotheses,
            conclusion: parsed.conclusion,
            reliability_note: parsed.reliability_note,
            open_questions: parsed.open_questions,
            entities: parsed.entities,
            relationships: parsed.relationships,
            missing_sections: parsed.missing_sections,
            degraded: false,
            raw_text: text,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let text = tokio::time::timeout(self.timeout, self.completion.complete(prompt, self.options))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;
        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}

pub fn clamp_depth(depth: u8) -> u8 {
    depth.clamp(MIN_DEPTH, MAX_DEPTH)
}

/// Title / URL / summary (plus date and author when known) for every hit
pub fn combined_text(hits: &[SearchHit]) -> String {
    let mut text = String::new();
    for hit in hits {
        let _ = writeln!(text, "Title: {}", hit.title);
        let _ = writeln!(text, "URL: {}", hit.url);
        let _ = writeln!(text, "Summary: {}", hit.summary());
        if let Some(date) = hit.metadata_str("date") {
            let _ = writeln!(text, "Published: {date}");
        }
        if let Some(author) = hit.metadata_str("author") {
            let _ = writeln!(text, "Author: {author}");
        }
        text.push('\n');
    }
    text
}

/// Deterministic chain-of-thought prompt for the given depth (clamped to 1..=3)
pub fn build_prompt(query: &str, hits: &[SearchHit], depth: u8) -> String {
    let depth = clamp_depth(depth);
    let framing = if depth >= 2 { "detailed" } else { "basic" };
    let hypothesis_count = if depth >= 2 { 3 } else { 2 };

    let mut prompt = format!(
        "# Chain-of-Thought Deep Research: {query}\n\n\
         Perform a {framing} analysis with hypothesis evaluation based on the web search results below.\n\n\
         ## Step 1: Organize sources\n\
         Organize the search results and assess each source's reliability, relevance and recency.\n\n\
         ## Step 2: Extract key facts\n\
         Extract the key facts, claims and data points from each result. Call out contradictory information explicitly.\n\n\
         ## Step 3: Form hypotheses\n\
         Based on the extracted facts, form at least {hypothesis_count} distinct hypotheses. Each hypothesis must be clearly distinguishable and falsifiable.\n\n\
         ## Step 4: Evaluate hypotheses\n\
         For each hypothesis, identify and weigh the evidence found in the search results:\n\
         - What evidence supports the hypothesis?\n\
         - What evidence contradicts the hypothesis?\n\
         - How strong and reliable is that evidence?\n\n\
         ## Step 5: Most likely conclusion\n\
         Based on the weighed evidence, derive the most likely conclusion. State the degree of uncertainty.\n\n\
         ## Step 6: Further research\n\
         Identify areas that need further investigation and important questions the current information cannot answer.\n\n"
    );

    if depth >= 3 {
        prompt.push_str(
            "## Additional analysis requirements\n\
             1. Identify the bias and perspective of each source and how it affects the conclusion.\n\
             2. Identify temporal changes or trends.\n\
             3. Consider the problem from multiple perspectives, including interpretations in different cultural and social contexts.\n\
             4. Discuss practical applications and implications of the conclusion.\n\n",
        );
    }

    prompt.push_str(
        "## Response format\n\
         Answer using exactly the following headers:\n\
         ## 1. Summary\n\
         ## 2. Key Insights\n\
         ## 3. Patterns and Connections\n\
         ## 4. Hypotheses\n\
         ### Hypothesis N: <statement>\n\
         Supporting evidence:\n\
         - <evidence>\n\
         Contradicting evidence:\n\
         - <evidence>\n\
         Confidence: <number between 0.0 and 1.0>\n\
         ## 5. Conclusion\n\
         ## 6. Source Reliability\n\
         ## 7. Open Questions\n\n\
         Finally, list the important entities and the relationships between them in a fenced ```json block:\n\
         ```json\n\
         {\"entities\": [{\"name\": \"...\", \"type\": \"person|organization|technology|concept|location|event\", \"importance\": 0.0}],\n \
         \"relationships\": [{\"source\": \"...\", \"target\": \"...\", \"type\": \"...\", \"weight\": 0.0}]}\n\
         ```\n\n",
    );

    prompt.push_str("## Search results:\n");
    prompt.push_str(&combined_text(hits));
    prompt
}
