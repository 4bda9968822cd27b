//! Fetch orchestration across all configured sources.
//!
//! Sources run in priority order (arXiv queries as configured, then
//! Semantic Scholar, then HuggingFace) and the combined list is passed
//! through cross-source deduplication, so the kept record for any paper
//! comes from the most authoritative source that saw it. A failing query
//! or source is logged and skipped; an empty result is a valid outcome.

use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::dedup::deduplicate_papers;
use crate::sources::{ArxivClient, HuggingFaceClient, SemanticScholarClient};
use crate::types::{PaperRecord, Window};

/// Marker recorded as `source_query` for HuggingFace daily papers, which
/// have no query of their own.
const HF_QUERY_LABEL: &str = "hf:daily_papers";

/// Fetch every configured source for `window` and return the deduplicated
/// paper set. Never fails: the worst case is an empty vector.
pub async fn fetch_papers(config: &FetchConfig, window: &Window) -> Vec<PaperRecord> {
    let mut arxiv_batches: Vec<Vec<PaperRecord>> = Vec::new();
    match ArxivClient::new() {
        Ok(client) => {
            for query in &config.arxiv_queries {
                info!(query = query.as_str(), "ArXiv query");
                match client
                    .search_since(query, window, config.max_results_per_query)
                    .await
                {
                    Ok(mut papers) => {
                        for p in &mut papers {
                            p.source_query = query.clone();
                        }
                        arxiv_batches.push(papers);
                    }
                    Err(e) => warn!("ArXiv query failed, skipping: {}", e),
                }
            }
        }
        Err(e) => warn!("ArXiv client unavailable, skipping all arXiv queries: {}", e),
    }

    let mut s2_papers = Vec::new();
    if config.s2_enabled {
        match SemanticScholarClient::new(&config.s2_api_key_env) {
            Ok(client) => {
                s2_papers = client.search_since(&config.s2_queries, window).await;
            }
            Err(e) => warn!("Semantic Scholar client unavailable, skipping: {}", e),
        }
    }

    let mut hf_papers = Vec::new();
    if config.hf_enabled {
        match HuggingFaceClient::new() {
            Ok(client) => match client.fetch_daily(&config.hf_keywords).await {
                Ok(mut papers) => {
                    for p in &mut papers {
                        p.source_query = HF_QUERY_LABEL.to_string();
                    }
                    hf_papers = papers;
                }
                Err(e) => warn!("HuggingFace fetch failed, skipping: {}", e),
            },
            Err(e) => warn!("HuggingFace client unavailable, skipping: {}", e),
        }
    }

    let unique = merge_sources(arxiv_batches, s2_papers, hf_papers);
    info!(
        count = unique.len(),
        since = %window.start,
        "Fetched unique papers"
    );
    unique
}

/// Concatenate per-source results in priority order and deduplicate.
/// Within arXiv, earlier queries win attribution for shared papers.
pub fn merge_sources(
    arxiv_batches: Vec<Vec<PaperRecord>>,
    s2_papers: Vec<PaperRecord>,
    hf_papers: Vec<PaperRecord>,
) -> Vec<PaperRecord> {
    let mut all: Vec<PaperRecord> = arxiv_batches.into_iter().flatten().collect();
    all.extend(s2_papers);
    all.extend(hf_papers);
    deduplicate_papers(all)
}
