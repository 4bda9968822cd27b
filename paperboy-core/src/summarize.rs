//! Contribution summaries for industry-classified papers.
//!
//! One batched JSON call covering up to `cap` industry papers, drawing
//! from the same call budget as classification. If the budget is already
//! spent, papers simply render without a summary.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::llm::{CallBudget, GenerateRequest, LlmClient};
use crate::types::ClassifiedPaper;

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_OUTPUT_TOKENS: usize = 8192;
const AUTHORS_PER_PROMPT: usize = 10;
const ABSTRACT_SNIPPET_CHARS: usize = 500;

/// Attach summaries to the industry papers in `papers`, in place.
///
/// `papers` is the full classified list in canonical order; only the
/// industry subset (its first `cap` members) is summarized.
pub async fn summarize_industry(
    llm: &dyn LlmClient,
    papers: &mut [ClassifiedPaper],
    cap: usize,
    budget: &mut CallBudget,
) {
    let mut industry: Vec<&mut ClassifiedPaper> = papers
        .iter_mut()
        .filter(|p| p.classification.is_industry())
        .collect();
    if industry.is_empty() || cap == 0 {
        return;
    }

    if !budget.try_acquire() {
        warn!(
            "No LLM budget left for summaries ({} papers go without)",
            industry.len()
        );
        return;
    }

    if industry.len() > cap {
        info!(
            "Limiting summary generation to first {} of {} industry papers",
            cap,
            industry.len()
        );
    }
    let count = industry.len().min(cap);
    let batch = &mut industry[..count];

    let prompt = build_summary_prompt(batch);
    let request = GenerateRequest::json(prompt)
        .with_temperature(SUMMARY_TEMPERATURE)
        .with_max_output_tokens(SUMMARY_MAX_OUTPUT_TOKENS);

    info!("LLM call {}: summarizing {} industry papers", budget.used(), count);

    match llm.generate(request).await {
        Ok(raw) => apply_summary_response(&raw, batch),
        Err(e) => {
            // The attempted call already consumed budget.
            error!("Summary generation failed: {}", e);
        }
    }
}

fn build_summary_prompt(batch: &[&mut ClassifiedPaper]) -> String {
    let mut parts = Vec::with_capacity(batch.len() + 2);
    parts.push(
        "For each paper below, write a 2-3 sentence summary highlighting the key \
         contribution and why it matters for recommendation systems, information \
         retrieval, or LLM research. Focus on practical implications.\n"
            .to_string(),
    );
    for (i, cp) in batch.iter().enumerate() {
        let p = &cp.paper;
        let company = match &cp.classification {
            crate::types::Classification::Industry { companies, .. } if !companies.is_empty() => {
                companies.as_str()
            }
            _ => "N/A",
        };
        parts.push(format!(
            "Paper {}:\n  Title: {}\n  Authors: {}\n  Company: {}\n  Abstract: {}\n",
            i,
            p.title,
            p.authors_abbrev(AUTHORS_PER_PROMPT),
            company,
            truncate_chars(&p.abstract_text, ABSTRACT_SNIPPET_CHARS),
        ));
    }
    parts.push(
        "\nReturn a JSON array: [{\"paper_index\": <int>, \"summary\": \"...\"}]".to_string(),
    );
    parts.join("\n")
}

/// Parse the summary response and attach summaries by index. A failed
/// parse leaves every summary `None`.
fn apply_summary_response(raw: &str, batch: &mut [&mut ClassifiedPaper]) {
    let parsed: Value = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to parse summary response as JSON: {}", e);
            return;
        }
    };

    let Some(items) = parsed.as_array() else {
        error!("Expected JSON array for summaries");
        return;
    };

    for item in items {
        let Some(idx) = item["paper_index"].as_u64().map(|i| i as usize) else {
            continue;
        };
        let Some(entry) = batch.get_mut(idx) else {
            continue;
        };
        if let Some(summary) = item["summary"].as_str()
            && !summary.is_empty()
        {
            entry.summary = Some(summary.to_string());
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
