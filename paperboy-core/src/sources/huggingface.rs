//! HuggingFace Daily Papers source.
//!
//! A single JSON endpoint listing community-curated trending papers. There
//! is no query parameter, so relevance is enforced with a keyword filter
//! over title + abstract.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::types::{PaperRecord, PaperSourceKind};

const HF_DAILY_PAPERS_URL: &str = "https://huggingface.co/api/daily_papers";

pub struct HuggingFaceClient {
    client: reqwest::Client,
    url: String,
}

impl HuggingFaceClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Request {
                source_name: "hf".into(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            url: HF_DAILY_PAPERS_URL.to_string(),
        })
    }

    /// Fetch today's daily papers, keeping only those matching `keywords`.
    pub async fn fetch_daily(&self, keywords: &[String]) -> Result<Vec<PaperRecord>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                source_name: "hf".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: "hf".into(),
                status: status.as_u16(),
            });
        }

        let data: Value = response.json().await.map_err(|e| FetchError::Parse {
            source_name: "hf".into(),
            message: e.to_string(),
        })?;

        let papers = parse_daily_papers(&data, keywords);
        debug!(count = papers.len(), "HuggingFace daily papers kept after filter");
        Ok(papers)
    }
}

/// Whether a paper matches any configured relevance keyword.
fn is_relevant(title: &str, abstract_text: &str, keywords: &[String]) -> bool {
    let text = format!("{} {}", title, abstract_text).to_lowercase();
    keywords.iter().any(|kw| text.contains(kw.as_str()))
}

/// Parse the daily-papers JSON array into records, deduplicated by id.
pub fn parse_daily_papers(data: &Value, keywords: &[String]) -> Vec<PaperRecord> {
    let mut papers = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for entry in data.as_array().map(|a| a.as_slice()).unwrap_or_default() {
        let paper = &entry["paper"];
        let Some(arxiv_id) = paper["id"].as_str().filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen_ids.insert(arxiv_id.to_string()) {
            continue;
        }

        let title = normalize(paper["title"].as_str().unwrap_or(""));
        let abstract_text = normalize(paper["summary"].as_str().unwrap_or(""));
        if title.is_empty() || !is_relevant(&title, &abstract_text, keywords) {
            continue;
        }

        let authors: Vec<String> = paper["authors"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|author| author["name"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let upvotes = paper["upvotes"]
            .as_u64()
            .or_else(|| entry["numUpvotes"].as_u64())
            .unwrap_or(0) as u32;

        let Some(published) = parse_published(paper["publishedAt"].as_str().unwrap_or("")) else {
            continue;
        };

        papers.push(PaperRecord {
            id: arxiv_id.to_string(),
            title,
            authors,
            abstract_text,
            categories: Vec::new(),
            published,
            url: format!("https://arxiv.org/abs/{}", arxiv_id),
            pdf_url: format!("https://arxiv.org/pdf/{}", arxiv_id),
            comment: String::new(),
            doi: None,
            source: PaperSourceKind::HuggingFace,
            source_query: String::new(),
            hf_upvotes: upvotes,
        });
    }

    papers
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the `publishedAt` timestamp, accepting a full RFC 3339 instant or
/// a bare date.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    let date_part = raw.get(..10)?;
    let date = date_part.parse::<NaiveDate>().ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keywords() -> Vec<String> {
        vec!["retrieval".to_string(), "recommend".to_string()]
    }

    fn sample() -> Value {
        json!([
            {
                "paper": {
                    "id": "2506.04444",
                    "title": "Generative  Retrieval at Scale",
                    "summary": "We study generative retrieval\nfor web search.",
                    "authors": [{"name": "Ada Lovelace"}, {"name": "Alan Turing"}],
                    "publishedAt": "2025-06-09T01:30:00.000Z",
                    "upvotes": 41
                }
            },
            {
                "paper": {
                    "id": "2506.05555",
                    "title": "Protein Folding With Diffusion",
                    "summary": "Not about search at all.",
                    "authors": [],
                    "publishedAt": "2025-06-09T01:30:00.000Z",
                    "upvotes": 99
                }
            },
            {
                "paper": {
                    "id": "2506.04444",
                    "title": "Generative Retrieval at Scale (duplicate)",
                    "summary": "retrieval again",
                    "authors": [],
                    "publishedAt": "2025-06-09T01:30:00.000Z"
                }
            }
        ])
    }

    #[test]
    fn test_parse_filters_and_dedups() {
        let papers = parse_daily_papers(&sample(), &keywords());
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.id, "2506.04444");
        assert_eq!(p.title, "Generative Retrieval at Scale");
        assert_eq!(p.hf_upvotes, 41);
        assert_eq!(p.source, PaperSourceKind::HuggingFace);
        assert_eq!(p.url, "https://arxiv.org/abs/2506.04444");
    }

    #[test]
    fn test_relevance_is_case_insensitive() {
        assert!(is_relevant("Dense RETRIEVAL", "", &keywords()));
        assert!(!is_relevant("Protein folding", "diffusion models", &keywords()));
    }

    #[test]
    fn test_parse_published_formats() {
        assert!(parse_published("2025-06-09T01:30:00.000Z").is_some());
        assert!(parse_published("2025-06-09").is_some());
        assert!(parse_published("").is_none());
        assert!(parse_published("soon").is_none());
    }

    #[test]
    fn test_missing_id_skipped() {
        let data = json!([{"paper": {"title": "retrieval", "summary": ""}}]);
        assert!(parse_daily_papers(&data, &keywords()).is_empty());
    }
}
