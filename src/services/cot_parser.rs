//! Section parser for chain-of-thought analysis text
//!
//! The parse is a small state machine over the current section. Header lines
//! switch sections; every other line accumulates into the current one. A
//! fenced JSON block carries extracted entities and relationships. Anything
//! the parser cannot place is dropped, never raised: the caller keeps the raw
//! text and gets the list of sections that were not found.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{DEFAULT_CONFIDENCE, EntityInput, Hypothesis, RelationshipInput};

/// Section currently being accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Preamble,
    Summary,
    Insights,
    Patterns,
    Hypotheses,
    Conclusion,
    Reliability,
    OpenQuestions,
}

impl Section {
    /// Sections expected in every response, in prompt order
    pub const EXPECTED: [Section; 7] = [
        Section::Summary,
        Section::Insights,
        Section::Patterns,
        Section::Hypotheses,
        Section::Conclusion,
        Section::Reliability,
        Section::OpenQuestions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Preamble => "preamble",
            Section::Summary => "summary",
            Section::Insights => "insights",
            Section::Patterns => "patterns",
            Section::Hypotheses => "hypotheses",
            Section::Conclusion => "conclusion",
            Section::Reliability => "reliability",
            Section::OpenQuestions => "open_questions",
        }
    }

    fn from_label(label: &str) -> Option<Section> {
        let section = match label {
            "summary" | "executive summary" | "要約" | "概要" => Section::Summary,
            "key insights" | "insights" | "main insights" | "key facts" | "主要な洞察" | "洞察"
            | "主要な事実" => Section::Insights,
            "patterns" | "patterns and connections" | "patterns and relationships"
            | "パターンと関連性" | "パターン" => Section::Patterns,
            "hypotheses" | "hypothesis evaluation" | "hypothesis testing" | "form hypotheses"
            | "evaluate hypotheses" | "仮説" | "仮説の形成" | "仮説の検証" | "仮説検証"
            | "複数の仮説の形成" => {
                Section::Hypotheses
            }
            "conclusion" | "most likely conclusion" | "conclusions" | "結論"
            | "最も可能性の高い結論" => Section::Conclusion,
            "source reliability" | "reliability" | "reliability assessment" | "信頼性評価"
            | "信頼性" => Section::Reliability,
            "open questions" | "further research" | "further investigation"
            | "areas for further research" | "追加調査" | "追加調査が必要な領域"
            | "さらなる調査" => {
                Section::OpenQuestions
            }
            _ => return None,
        };
        Some(section)
    }
}

/// Structured fields recovered from the response text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnalysis {
    pub summary: String,
    pub insights: Vec<String>,
    pub patterns: Vec<String>,
    pub hypotheses: Vec<Hypothesis>,
    pub conclusion: String,
    pub reliability_note: String,
    pub open_questions: Vec<String>,
    pub entities: Vec<EntityInput>,
    pub relationships: Vec<RelationshipInput>,
    pub missing_sections: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EvidenceTarget {
    Statement,
    Supporting,
    Contradicting,
}

struct Fence {
    json: bool,
    lines: Vec<String>,
}

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*•・]+\s*|\d+[.)、．](?:\s+|$)|[a-z]\)\s+)").expect("Invalid list marker pattern")
});

static NUMBERING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:step|ステップ)\s*\d+\s*[:：.]?\s*|\d+\s*[.)．]\s*)")
        .expect("Invalid numbering pattern")
});

static HYPOTHESIS_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:#{1,6}\s*)?(?:[-*•]\s+)?(?:\*\*|__)?\s*(?:hypothesis|仮説)\s*([0-9０-９]+|[a-z])\b\s*(?:\*\*|__)?\s*[:：.)]?\s*(?:\*\*|__)?\s*(.*)$",
    )
    .expect("Invalid hypothesis pattern")
});

static CONFIDENCE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(%)?").expect("Invalid confidence pattern"));

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with('•')
        || line.starts_with('・')
}

fn strip_emphasis(text: &str) -> &str {
    text.trim().trim_matches(|c| c == '*' || c == '_').trim()
}

/// Splits `label: inline` at the first ASCII or full-width colon
fn split_label(text: &str) -> (&str, &str) {
    match text
        .char_indices()
        .find(|(_, c)| *c == ':' || *c == '：')
    {
        Some((i, c)) => (&text[..i], &text[i + c.len_utf8()..]),
        None => (text, ""),
    }
}

/// Recognises a section header, returning the section and any inline content
fn parse_header(line: &str) -> Option<(Section, String)> {
    if is_bullet(line) {
        return None;
    }
    let rest = line.trim_start_matches('#').trim();
    let rest = rest.trim_start_matches(|c| c == '*' || c == '_').trim_start();
    let rest = match NUMBERING.find(rest) {
        Some(m) => &rest[m.end()..],
        None => rest,
    };
    let (label, inline) = split_label(rest);
    let label = strip_emphasis(label).to_lowercase();
    let section = Section::from_label(&label)?;
    Some((section, strip_emphasis(inline).to_string()))
}

/// Removes a leading bullet or enumeration marker
fn strip_list_marker(line: &str) -> String {
    let stripped = LIST_MARKER.replace(line, "");
    strip_emphasis(&stripped).to_string()
}

fn parse_confidence(text: &str) -> Option<f32> {
    if let Some(caps) = CONFIDENCE_NUMBER.captures(text) {
        let value: f32 = caps.get(1)?.as_str().parse().ok()?;
        let value = if caps.get(2).is_some() || value > 1.0 {
            value / 100.0
        } else {
            value
        };
        return value.is_finite().then(|| value.clamp(0.0, 1.0));
    }

    let lower = text.to_lowercase();
    if lower.contains("high") || text.contains('高') {
        Some(0.8)
    } else if lower.contains("medium") || lower.contains("moderate") || text.contains('中') {
        Some(0.5)
    } else if lower.contains("low") || text.contains('低') {
        Some(0.2)
    } else {
        None
    }
}

struct CotParser {
    section: Section,
    seen: HashSet<Section>,
    fence: Option<Fence>,
    summary: Vec<String>,
    conclusion: Vec<String>,
    reliability: Vec<String>,
    current: Option<Hypothesis>,
    target: EvidenceTarget,
    out: ParsedAnalysis,
}

impl CotParser {
    fn new() -> Self {
        Self {
            section: Section::Preamble,
            seen: HashSet::new(),
            fence: None,
            summary: Vec::new(),
            conclusion: Vec::new(),
            reliability: Vec::new(),
            current: None,
            target: EvidenceTarget::Statement,
            out: ParsedAnalysis::default(),
        }
    }

    fn feed(&mut self, raw_line: &str) {
        let line = raw_line.trim();

        if let Some(fence) = self.fence.as_mut() {
            if line.starts_with("```") {
                if let Some(fence) = self.fence.take() {
                    self.close_fence(fence);
                }
            } else {
                fence.lines.push(raw_line.to_string());
            }
            return;
        }

        if let Some(lang) = line.strip_prefix("```") {
            let lang = lang.trim().to_lowercase();
            self.fence = Some(Fence {
                json: lang.is_empty() || lang == "json",
                lines: Vec::new(),
            });
            return;
        }

        if line.is_empty() {
            return;
        }

        if let Some(caps) = HYPOTHESIS_OPENER.captures(line) {
            let statement = caps.get(2).map(|m| strip_emphasis(m.as_str())).unwrap_or("");
            self.open_hypothesis(statement);
            return;
        }

        if let Some((section, inline)) = parse_header(line) {
            self.enter(section);
            if !inline.is_empty() {
                self.accumulate(&inline);
            }
            return;
        }

        self.accumulate(line);
    }

    fn enter(&mut self, section: Section) {
        if section != self.section {
            debug!("CoT parser entering section {}", section.as_str());
        }
        self.finish_hypothesis();
        self.section = section;
        self.seen.insert(section);
    }

    fn open_hypothesis(&mut self, statement: &str) {
        if self.section != Section::Hypotheses {
            self.enter(Section::Hypotheses);
        }
        self.finish_hypothesis();
        self.current = Some(Hypothesis::new(statement));
        self.target = EvidenceTarget::Statement;
    }

    fn finish_hypothesis(&mut self) {
        if let Some(hypothesis) = self.current.take() {
            if !hypothesis.statement.is_empty()
                || !hypothesis.supporting_evidence.is_empty()
                || !hypothesis.contradicting_evidence.is_empty()
            {
                self.out.hypotheses.push(hypothesis);
            }
        }
    }

    fn accumulate(&mut self, line: &str) {
        match self.section {
            Section::Preamble => {}
            Section::Summary => self.summary.push(strip_list_marker(line)),
            Section::Insights => push_item(&mut self.out.insights, line),
            Section::Patterns => push_item(&mut self.out.patterns, line),
            Section::OpenQuestions => push_item(&mut self.out.open_questions, line),
            Section::Conclusion => self.conclusion.push(strip_list_marker(line)),
            Section::Reliability => self.reliability.push(strip_list_marker(line)),
            Section::Hypotheses => self.accumulate_hypothesis(line),
        }
    }

    fn accumulate_hypothesis(&mut self, line: &str) {
        let Some(hypothesis) = self.current.as_mut() else {
            debug!("Ignoring text before the first hypothesis: {}", line);
            return;
        };

        let item = strip_list_marker(line);
        let (label, inline) = split_label(&item);
        let label = strip_emphasis(label).to_lowercase();
        let inline = strip_emphasis(inline);

        if label.starts_with("supporting")
            || label.starts_with("evidence for")
            || label.starts_with("支持")
        {
            self.target = EvidenceTarget::Supporting;
            if !inline.is_empty() {
                hypothesis.supporting_evidence.push(inline.to_string());
            }
        } else if label.starts_with("contradicting")
            || label.starts_with("evidence against")
            || label.starts_with("反証")
            || label.starts_with("反する")
        {
            self.target = EvidenceTarget::Contradicting;
            if !inline.is_empty() {
                hypothesis.contradicting_evidence.push(inline.to_string());
            }
        } else if label.starts_with("confidence")
            || label.starts_with("確信度")
            || label.starts_with("信頼度")
        {
            hypothesis.confidence = parse_confidence(inline).unwrap_or(DEFAULT_CONFIDENCE);
        } else {
            match self.target {
                EvidenceTarget::Supporting => hypothesis.supporting_evidence.push(item),
                EvidenceTarget::Contradicting => hypothesis.contradicting_evidence.push(item),
                EvidenceTarget::Statement if hypothesis.statement.is_empty() => {
                    hypothesis.statement = item
                }
                EvidenceTarget::Statement => {
                    hypothesis.statement.push(' ');
                    hypothesis.statement.push_str(&item);
                }
            }
        }
    }

    fn close_fence(&mut self, fence: Fence) {
        if !fence.json {
            return;
        }
        let body = fence.lines.join("\n");
        let Some(value) = decode_lenient(&body) else {
            warn!("Skipping undecodable JSON block in analysis output");
            return;
        };
        self.absorb_graph_json(&value);
    }

    fn absorb_graph_json(&mut self, value: &Value) {
        let entities = value
            .get("entities")
            .or_else(|| value.get("nodes"))
            .and_then(Value::as_array);
        for item in entities.into_iter().flatten() {
            match EntityInput::from_value(item) {
                Ok(entity) => self.out.entities.push(entity),
                Err(e) => warn!("Skipping malformed entity: {}", e),
            }
        }

        let relationships = value
            .get("relationships")
            .or_else(|| value.get("relations"))
            .or_else(|| value.get("edges"))
            .and_then(Value::as_array);
        for item in relationships.into_iter().flatten() {
            match RelationshipInput::from_value(item) {
                Ok(rel) => self.out.relationships.push(rel),
                Err(e) => warn!("Skipping malformed relationship: {}", e),
            }
        }
    }

    fn finish(mut self) -> ParsedAnalysis {
        if let Some(fence) = self.fence.take() {
            // unterminated fence at end of output
            self.close_fence(fence);
        }
        self.finish_hypothesis();

        self.out.summary = self.summary.join("\n");
        self.out.conclusion = self.conclusion.join("\n");
        self.out.reliability_note = self.reliability.join("\n");
        self.out.missing_sections = Section::EXPECTED
            .iter()
            .filter(|s| !self.seen.contains(s))
            .map(|s| s.as_str().to_string())
            .collect();
        self.out
    }
}

fn push_item(items: &mut Vec<String>, line: &str) {
    let item = strip_list_marker(line);
    if !item.is_empty() {
        items.push(item);
    }
}

/// Decodes a JSON object, falling back to the outermost `{...}` span
fn decode_lenient(body: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
        return value.is_object().then_some(value);
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&body[start..=end])
        .ok()
        .filter(Value::is_object)
}

/// Parses chain-of-thought response text into structured fields.
pub fn parse_cot_response(text: &str) -> ParsedAnalysis {
    let mut parser = CotParser::new();
    for line in text.lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"Here is the analysis you asked for.

## 1. Summary
Quantum error correction crossed a practical threshold in 2024.

## 2. Key Insights
- Logical qubits now outlive physical qubits.
- Error rates fell below the surface-code threshold.

## 3. Patterns and Connections
* Hardware and decoder improvements arrive together.

## 4. Hypotheses
### Hypothesis 1: Error correction is now the bottleneck
Supporting evidence:
- Google reported below-threshold scaling.
Contradicting evidence:
- Only small code distances were shown.
Confidence: 0.7

### Hypothesis 2: Qubit counts will dominate progress
- **Supporting evidence:** IBM roadmap targets 100k qubits.
- **Contradicting evidence:** Noise grows with scale.
- **Confidence:** 40%

## 5. Conclusion
Error correction, not qubit count, is the main driver.

## 6. Source Reliability
Mostly vendor announcements; few peer-reviewed papers.

## 7. Open Questions
1. How does decoding latency scale?
2. When will logical gates reach 1e-6 error?

```json
{
  "entities": [
    {"name": "Google", "type": "organization", "importance": 0.9},
    {"name": "Surface code", "type": "concept", "importance": 0.8},
    {"type": "person"}
  ],
  "relationships": [
    {"source": "Google", "target": "Surface code", "type": "develops", "weight": 0.8},
    {"source": "Google"}
  ]
}
```
"#;

    #[test]
    fn test_parse_full_response() {
        let parsed = parse_cot_response(FULL_RESPONSE);

        assert_eq!(
            parsed.summary,
            "Quantum error correction crossed a practical threshold in 2024."
        );
        assert_eq!(parsed.insights.len(), 2);
        assert_eq!(parsed.insights[0], "Logical qubits now outlive physical qubits.");
        assert_eq!(parsed.patterns, vec!["Hardware and decoder improvements arrive together."]);
        assert_eq!(
            parsed.conclusion,
            "Error correction, not qubit count, is the main driver."
        );
        assert_eq!(
            parsed.reliability_note,
            "Mostly vendor announcements; few peer-reviewed papers."
        );
        assert_eq!(
            parsed.open_questions,
            vec![
                "How does decoding latency scale?",
                "When will logical gates reach 1e-6 error?"
            ]
        );
        assert!(parsed.missing_sections.is_empty());
    }

    #[test]
    fn test_parse_hypotheses() {
        let parsed = parse_cot_response(FULL_RESPONSE);
        assert_eq!(parsed.hypotheses.len(), 2);

        let first = &parsed.hypotheses[0];
        assert_eq!(first.statement, "Error correction is now the bottleneck");
        assert_eq!(first.supporting_evidence, vec!["Google reported below-threshold scaling."]);
        assert_eq!(first.contradicting_evidence, vec!["Only small code distances were shown."]);
        assert!((first.confidence - 0.7).abs() < 1e-6);

        let second = &parsed.hypotheses[1];
        assert_eq!(second.statement, "Qubit counts will dominate progress");
        assert_eq!(second.supporting_evidence, vec!["IBM roadmap targets 100k qubits."]);
        assert_eq!(second.contradicting_evidence, vec!["Noise grows with scale."]);
        assert!((second.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_graph_json_skips_malformed_items() {
        let parsed = parse_cot_response(FULL_RESPONSE);
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[0].name, "Google");
        assert_eq!(parsed.relationships.len(), 1);
        assert_eq!(parsed.relationships[0].relationship_type, "develops");
    }

    #[test]
    fn test_missing_reliability_section() {
        let text = FULL_RESPONSE
            .replace("## 6. Source Reliability\n", "")
            .replace("Mostly vendor announcements; few peer-reviewed papers.\n", "");

        let parsed = parse_cot_response(&text);
        assert_eq!(parsed.reliability_note, "");
        assert_eq!(parsed.missing_sections, vec!["reliability"]);
        assert_eq!(parsed.hypotheses.len(), 2);
        assert_eq!(parsed.open_questions.len(), 2);
        assert!(!parsed.summary.is_empty());
        assert!(!parsed.conclusion.is_empty());
    }

    #[test]
    fn test_reordered_sections_still_parse() {
        let text = "**Conclusion:** Probably yes.\n\
                    **Summary:** Short summary.\n\
                    Open questions:\n\
                    - Why?\n";

        let parsed = parse_cot_response(text);
        assert_eq!(parsed.conclusion, "Probably yes.");
        assert_eq!(parsed.summary, "Short summary.");
        assert_eq!(parsed.open_questions, vec!["Why?"]);
        assert_eq!(
            parsed.missing_sections,
            vec!["insights", "patterns", "hypotheses", "reliability"]
        );
    }

    #[test]
    fn test_japanese_headers() {
        let text = "1. 要約: 量子計算は進歩している\n\
                    2. 主要な洞察:\n\
                    ・誤り訂正が進んだ\n\
                    仮説1: 誤り訂正が鍵である\n\
                    支持する証拠: 実験結果\n\
                    確信度: 高\n\
                    4. 信頼性評価: 高い\n\
                    5. 追加調査が必要な領域:\n\
                    - コスト\n";

        let parsed = parse_cot_response(text);
        assert_eq!(parsed.summary, "量子計算は進歩している");
        assert_eq!(parsed.insights, vec!["誤り訂正が進んだ"]);
        assert_eq!(parsed.hypotheses.len(), 1);
        assert_eq!(parsed.hypotheses[0].statement, "誤り訂正が鍵である");
        assert_eq!(parsed.hypotheses[0].supporting_evidence, vec!["実験結果"]);
        assert!((parsed.hypotheses[0].confidence - 0.8).abs() < 1e-6);
        assert_eq!(parsed.reliability_note, "高い");
        assert_eq!(parsed.open_questions, vec!["コスト"]);
    }

    #[test]
    fn test_unstructured_text_degrades_to_empty() {
        let parsed = parse_cot_response("The model rambled without any structure at all.");
        assert!(parsed.summary.is_empty());
        assert!(parsed.hypotheses.is_empty());
        assert_eq!(parsed.missing_sections.len(), Section::EXPECTED.len());
    }

    #[test]
    fn test_bullet_with_section_word_is_not_a_header() {
        let text = "## Key Insights\n- Summary: the field is moving fast\n";
        let parsed = parse_cot_response(text);
        assert_eq!(parsed.insights, vec!["Summary: the field is moving fast"]);
        assert!(parsed.missing_sections.contains(&"summary".to_string()));
    }

    #[test]
    fn test_unterminated_and_prefixed_json() {
        let text = "## Summary\nok\n```json\nEntities follow: {\"entities\": [\"Qubit\"]}\n";
        let parsed = parse_cot_response(text);
        assert_eq!(parsed.entities, vec![EntityInput::bare("Qubit")]);
    }

    #[test]
    fn test_parse_confidence_forms() {
        assert_eq!(parse_confidence("0.65"), Some(0.65));
        assert_eq!(parse_confidence("70%"), Some(0.7));
        assert_eq!(parse_confidence("85 out of 100"), Some(0.85));
        assert_eq!(parse_confidence("Medium"), Some(0.5));
        assert_eq!(parse_confidence("unclear"), None);
    }
}
