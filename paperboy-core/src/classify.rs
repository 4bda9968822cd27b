//! Batched industry/academia classification.
//!
//! Papers are classified in the pipeline's canonical order (published date
//! descending, then id), in batches of at most `batch_size`, one API call
//! per batch. When the shared call budget runs out, the remaining papers
//! are left `Unknown` — a deliberate cost-control stop, not an error. A
//! malformed batch response degrades only that batch.

use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::llm::{CallBudget, GenerateRequest, LlmClient};
use crate::types::{Classification, ClassifiedPaper, PaperRecord};

/// Pause between classification batches, to stay well under provider QPS.
const BATCH_PAUSE: Duration = Duration::from_secs(1);
const CLASSIFY_MAX_OUTPUT_TOKENS: usize = 4096;
const AUTHORS_PER_PROMPT: usize = 15;
const ABSTRACT_SNIPPET_CHARS: usize = 400;

pub const CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are an expert at classifying academic papers. Given a batch of papers, perform TWO checks for each paper:

## Step A - Relevance gate

Is this paper about ONE of the following topics?
1. **Recommendation systems** (collaborative filtering, CTR prediction, session-based recommendations, sequential recommendation, conversational recommendation, etc.)
2. **RecSys x LLM** (using large language models for recommendations, LLM-based ranking or scoring in recommender systems, prompt-based recommendations, etc.)
3. **LLM research with direct applications to ranking/retrieval for recommendations** (learning to rank, re-ranking with LLMs, generative retrieval for recommendations, etc.)

If the paper is NOT about any of these topics, mark it as `"relevant": false`. Papers about generic NLP, computer vision, speech, pure information extraction, general RAG without a recommendation angle, or other unrelated topics are NOT relevant.

## Step B - Industry affiliation (only for relevant papers)

Does **at least one author** have an affiliation with an industry company? Classify based on AUTHOR AFFILIATIONS, not paper content.

**How to determine author affiliation:**
- Check author names against your knowledge of well-known researchers at major companies - many industry researchers in RecSys, IR, and LLM publish actively
- Look for affiliation info in the comments field (e.g. "Work done at Google")
- Look for company email domains or explicit affiliations in abstract/comments
- Do NOT classify as "industry" based solely on content signals like "A/B test", "production system", or "deployed" - the author must actually be with a company

**Common industry companies** (non-exhaustive): Google, DeepMind, Meta, FAIR, Amazon, AWS, Microsoft, MSR, Apple, Netflix, Spotify, Alibaba, Ant Group, Tencent, ByteDance, TikTok, Huawei, JD.com, Baidu, LinkedIn, Pinterest, Uber, Airbnb, eBay, Yahoo, Snap, NVIDIA, Samsung, Adobe, Salesforce, Kuaishou, Meituan, Shopee, Grab, Yandex, Criteo, Booking, PayPal, Bloomberg, IBM Research, Walmart, Instacart, DoorDash, Lyft, Etsy, Cohere, OpenAI, Anthropic, Mistral, AI21 Labs, etc.

## Output format:
Respond with ONLY a JSON array. Each element:
  {"paper_index": <int>, "relevant": true|false, "classification": "industry"|"academia"|"unknown", "company": "<specific company name(s) if industry, empty string otherwise>", "reason": "<brief reason for relevance and classification decisions>"}

For irrelevant papers, set classification to "irrelevant" and company to ""."#;

/// Classify `papers` (already in canonical order), returning one
/// `ClassifiedPaper` per input in the same order.
pub async fn classify_papers(
    llm: &dyn LlmClient,
    papers: Vec<PaperRecord>,
    batch_size: usize,
    budget: &mut CallBudget,
) -> Vec<ClassifiedPaper> {
    let total = papers.len();
    let mut classified: Vec<ClassifiedPaper> = papers
        .into_iter()
        .map(ClassifiedPaper::unclassified)
        .collect();
    if total == 0 || batch_size == 0 {
        return classified;
    }

    let mut budget_hit = false;
    let batch_count = total.div_ceil(batch_size);

    for (batch_no, batch_start) in (0..total).step_by(batch_size).enumerate() {
        if !budget.try_acquire() {
            warn!(
                "Reached LLM call limit ({}). Remaining papers left unclassified.",
                budget.max()
            );
            budget_hit = true;
            break;
        }

        let batch = &mut classified[batch_start..(batch_start + batch_size).min(total)];
        let prompt = build_batch_prompt(batch);

        info!(
            "LLM call {}: classifying papers {}-{} of {}",
            budget.used(),
            batch_start,
            batch_start + batch.len() - 1,
            total
        );

        let request = GenerateRequest::json(prompt)
            .with_system(CLASSIFICATION_SYSTEM_PROMPT)
            .with_max_output_tokens(CLASSIFY_MAX_OUTPUT_TOKENS);

        match llm.generate(request).await {
            Ok(raw) => apply_batch_response(&raw, batch),
            Err(e) => {
                // The attempted call already consumed budget.
                error!("Classification batch failed: {}", e);
            }
        }

        if batch_no + 1 < batch_count {
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }

    if !budget_hit {
        info!("Classification done in {} call(s)", budget.used());
    }
    classified
}

/// Render one batch into the user prompt.
fn build_batch_prompt(batch: &[ClassifiedPaper]) -> String {
    let mut parts = Vec::with_capacity(batch.len() + 1);
    parts.push("Classify each paper below as industry or academia.\n".to_string());
    for (i, cp) in batch.iter().enumerate() {
        let p = &cp.paper;
        parts.push(format!(
            "Paper {}:\n  Title: {}\n  Authors: {}\n  Abstract: {}\n  Comment: {}\n",
            i,
            p.title,
            p.authors_abbrev(AUTHORS_PER_PROMPT),
            truncate_chars(&p.abstract_text, ABSTRACT_SNIPPET_CHARS),
            p.comment,
        ));
    }
    parts.join("\n")
}

/// Parse a batch response and write classifications into `batch`.
///
/// Papers the response does not mention, and whole responses that fail to
/// parse, stay `Unknown`.
fn apply_batch_response(raw: &str, batch: &mut [ClassifiedPaper]) {
    let parsed: Value = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to parse classification response as JSON: {}", e);
            error!("Raw response: {}", truncate_chars(raw, 500));
            return;
        }
    };

    let Some(items) = parsed.as_array() else {
        error!("Expected JSON array from classifier, got {}", json_type_name(&parsed));
        return;
    };

    for item in items {
        let Some(idx) = item["paper_index"].as_u64().map(|i| i as usize) else {
            continue;
        };
        let Some(entry) = batch.get_mut(idx) else {
            continue;
        };

        let relevant = item["relevant"].as_bool().unwrap_or(true);
        entry.classification = if !relevant {
            Classification::Irrelevant
        } else {
            match item["classification"].as_str().unwrap_or("unknown") {
                "industry" => Classification::Industry {
                    companies: item["company"].as_str().unwrap_or("").to_string(),
                    evidence: item["reason"].as_str().unwrap_or("").to_string(),
                },
                "academia" => Classification::Academia,
                "irrelevant" => Classification::Irrelevant,
                _ => Classification::Unknown,
            }
        };
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_support::MockLlm;
    use crate::types::test_support::paper;

    fn papers(n: usize) -> Vec<crate::types::PaperRecord> {
        (0..n)
            .map(|i| paper(&format!("2506.{:05}", i), &format!("Paper {i}"), "2025-06-09"))
            .collect()
    }

    fn industry_response(indices: &[usize]) -> String {
        let items: Vec<String> = indices
            .iter()
            .map(|i| {
                format!(
                    r#"{{"paper_index": {i}, "relevant": true, "classification": "industry", "company": "Netflix", "reason": "author affiliation"}}"#
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    #[tokio::test]
    async fn test_classify_single_batch() {
        let mock = MockLlm::new(vec![Ok(
            r#"[
                {"paper_index": 0, "relevant": true, "classification": "industry", "company": "Spotify", "reason": "comment says Spotify"},
                {"paper_index": 1, "relevant": true, "classification": "academia", "company": "", "reason": "university authors"},
                {"paper_index": 2, "relevant": false, "classification": "irrelevant", "company": "", "reason": "computer vision"}
            ]"#
            .to_string(),
        )]);
        let mut budget = CallBudget::new(10);
        let result = classify_papers(&mock, papers(3), 10, &mut budget).await;

        assert_eq!(result.len(), 3);
        assert!(result[0].classification.is_industry());
        assert_eq!(result[1].classification, Classification::Academia);
        assert_eq!(result[2].classification, Classification::Irrelevant);
        assert_eq!(budget.used(), 1);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_classify_respects_call_budget() {
        // 5 papers, batch size 2 => 3 batches wanted, but budget allows 2.
        let mock = MockLlm::new(vec![
            Ok(industry_response(&[0, 1])),
            Ok(industry_response(&[0, 1])),
            Ok(industry_response(&[0])),
        ]);
        let mut budget = CallBudget::new(2);
        let result = classify_papers(&mock, papers(5), 2, &mut budget).await;

        assert_eq!(mock.request_count(), 2);
        assert_eq!(budget.used(), 2);
        // Papers beyond the budget default to Unknown (not industry).
        assert!(result[0].classification.is_industry());
        assert!(result[3].classification.is_industry());
        assert_eq!(result[4].classification, Classification::Unknown);
        assert!(!result[4].classification.is_industry());
    }

    #[tokio::test]
    async fn test_malformed_batch_poisons_only_that_batch() {
        // 3 batches; the middle one is unparseable.
        let mock = MockLlm::new(vec![
            Ok(industry_response(&[0])),
            Ok("this is not json".to_string()),
            Ok(industry_response(&[0])),
        ]);
        let mut budget = CallBudget::new(10);
        let result = classify_papers(&mock, papers(3), 1, &mut budget).await;

        assert!(result[0].classification.is_industry());
        assert_eq!(result[1].classification, Classification::Unknown);
        assert!(result[2].classification.is_industry());
        // All three calls were attempted and counted.
        assert_eq!(budget.used(), 3);
    }

    #[tokio::test]
    async fn test_api_error_defaults_batch_and_counts_budget() {
        let mock = MockLlm::new(vec![Err(crate::error::LlmError::ApiRequest {
            message: "boom".into(),
        })]);
        let mut budget = CallBudget::new(10);
        let result = classify_papers(&mock, papers(2), 10, &mut budget).await;

        assert!(result.iter().all(|p| p.classification == Classification::Unknown));
        assert_eq!(budget.used(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_and_missing_indices_ignored() {
        let mock = MockLlm::new(vec![Ok(
            r#"[
                {"paper_index": 7, "classification": "industry", "company": "X", "reason": ""},
                {"classification": "industry", "company": "X", "reason": ""},
                {"paper_index": 1, "relevant": true, "classification": "academia"}
            ]"#
            .to_string(),
        )]);
        let mut budget = CallBudget::new(10);
        let result = classify_papers(&mock, papers(2), 10, &mut budget).await;

        assert_eq!(result[0].classification, Classification::Unknown);
        assert_eq!(result[1].classification, Classification::Academia);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mock = MockLlm::new(vec![]);
        let mut budget = CallBudget::new(10);
        let result = classify_papers(&mock, Vec::new(), 10, &mut budget).await;
        assert!(result.is_empty());
        assert_eq!(mock.request_count(), 0);
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_prompt_contains_batch_fields() {
        let mut ps = papers(2);
        ps[0].comment = "Work done at Google".to_string();
        let batch: Vec<ClassifiedPaper> =
            ps.into_iter().map(ClassifiedPaper::unclassified).collect();
        let prompt = build_batch_prompt(&batch);

        assert!(prompt.starts_with("Classify each paper below"));
        assert!(prompt.contains("Paper 0:"));
        assert!(prompt.contains("Paper 1:"));
        assert!(prompt.contains("Work done at Google"));
        assert!(prompt.contains("Ada Lovelace"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters are never split.
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
