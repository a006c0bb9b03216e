//! Lexicon-based hit enrichment
//!
//! Sentiment, insight sentences and frequency keywords. These heuristics are
//! intentionally simple and bilingual (English / Japanese).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::Sentiment;

const POSITIVE_WORDS: &[&str] = &[
    "良い", "素晴らしい", "優れた", "最高", "成功", "幸せ", "positive", "excellent", "good", "great",
];

const NEGATIVE_WORDS: &[&str] = &[
    "悪い", "最悪", "失敗", "問題", "危険", "不満", "negative", "bad", "worst", "problem",
];

const IMPORTANCE_KEYWORDS: &[&str] = &[
    "重要", "主要", "特徴", "特性", "結論", "研究", "調査", "分析", "important", "key", "significant",
];

const STOP_WORDS: &[&str] = &[
    "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある", "いる", "する",
    "から", "など", "まで", "として", "について", "the", "a", "an", "in", "on", "at", "of", "for",
    "with", "by", "to", "and", "or", "but",
];

/// Maximum insight sentences per hit
pub const MAX_INSIGHTS: usize = 5;

/// Default number of keywords returned by `extract_keywords`
pub const DEFAULT_KEYWORD_LIMIT: usize = 10;

static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?。！？]").expect("Invalid sentence boundary pattern"));

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("Invalid word pattern"));

/// Counts distinct lexicon words present in the lower-cased text.
/// Majority wins; a tie is neutral.
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// Picks up to five insight sentences.
///
/// Sentences of 21..=199 chars mentioning an importance keyword come first.
/// With fewer than three of those, any sentence longer than 30 chars is added.
pub fn extract_insights(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let sentences: Vec<&str> = SENTENCE_BOUNDARY.split(text).map(str::trim).collect();
    let mut insights: Vec<String> = Vec::new();

    for sentence in &sentences {
        let len = sentence.chars().count();
        if len > 20 && len < 200 {
            let lower = sentence.to_lowercase();
            if IMPORTANCE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                insights.push(sentence.to_string());
            }
            if insights.len() >= MAX_INSIGHTS {
                break;
            }
        }
    }

    if insights.len() < 3 {
        for sentence in &sentences {
            if sentence.chars().count() > 30 && !insights.iter().any(|i| i == sentence) {
                insights.push(sentence.to_string());
            }
            if insights.len() >= MAX_INSIGHTS {
                break;
            }
        }
    }

    insights
}

/// Most frequent words (length > 1, stop words removed), ties in first-seen order.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for (position, word) in WORD_PATTERN.find_iter(&lower).map(|m| m.as_str()).enumerate() {
        if word.chars().count() <= 1 || STOP_WORDS.contains(&word) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, _, _)| word.to_string())
        .collect()
}
