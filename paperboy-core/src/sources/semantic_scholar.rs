//! Semantic Scholar Graph API source.
//!
//! One search request per configured query, scoped server-side with
//! `publicationDateOrYear`. The free tier allows roughly one request per
//! second, so queries are spaced a few seconds apart.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::types::{PaperRecord, PaperSourceKind, Window};

const S2_SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const S2_FIELDS: &str = "title,abstract,authors,externalIds,publicationDate,url,venue,openAccessPdf";
const MAX_RESULTS_PER_QUERY: usize = 100;
const QUERY_DELAY: Duration = Duration::from_secs(3);

pub struct SemanticScholarClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    /// Create a client. The API key env var is optional; without it the
    /// public rate limits apply.
    pub fn new(api_key_env: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Request {
                source_name: "s2".into(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            url: S2_SEARCH_URL.to_string(),
            api_key: std::env::var(api_key_env).ok(),
        })
    }

    /// Run every configured query and collect the unique results.
    ///
    /// A failing query is logged and skipped; it never aborts the batch.
    pub async fn search_since(&self, queries: &[String], window: &Window) -> Vec<PaperRecord> {
        let cutoff = window.start.format("%Y-%m-%d").to_string();
        let mut seen_ids = std::collections::HashSet::new();
        let mut papers = Vec::new();

        for (qi, query) in queries.iter().enumerate() {
            debug!(query = query.as_str(), "S2 query {}/{}", qi + 1, queries.len());

            match self.search_one(query, &cutoff).await {
                Ok(data) => {
                    collect_papers(&data, query, window, &mut seen_ids, &mut papers);
                }
                Err(e) => {
                    warn!("S2 query {}/{} failed, skipping: {}", qi + 1, queries.len(), e);
                }
            }

            if qi + 1 < queries.len() {
                tokio::time::sleep(QUERY_DELAY).await;
            }
        }

        debug!(count = papers.len(), since = cutoff.as_str(), "S2 papers fetched");
        papers
    }

    async fn search_one(&self, query: &str, cutoff: &str) -> Result<Value, FetchError> {
        let limit = MAX_RESULTS_PER_QUERY.to_string();
        let date_range = format!("{}:", cutoff);
        let mut request = self
            .client
            .get(&self.url)
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("fields", S2_FIELDS),
                ("publicationDateOrYear", date_range.as_str()),
                ("fieldsOfStudy", "Computer Science"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| FetchError::Request {
            source_name: "s2".into(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: "s2".into(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| FetchError::Parse {
            source_name: "s2".into(),
            message: e.to_string(),
        })
    }
}

/// Fold one response's `data` array into the accumulated paper list.
pub fn collect_papers(
    data: &Value,
    query: &str,
    window: &Window,
    seen_ids: &mut std::collections::HashSet<String>,
    papers: &mut Vec<PaperRecord>,
) {
    for item in data["data"].as_array().map(|a| a.as_slice()).unwrap_or_default() {
        let Some(s2_id) = item["paperId"].as_str().filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen_ids.insert(s2_id.to_string()) {
            continue;
        }

        let title = normalize(item["title"].as_str().unwrap_or(""));
        if title.is_empty() {
            continue;
        }
        let abstract_text = normalize(item["abstract"].as_str().unwrap_or(""));

        let ext_ids = &item["externalIds"];
        let arxiv_id = ext_ids["ArXiv"].as_str().unwrap_or("");
        let doi = ext_ids["DOI"].as_str().map(|s| s.to_string());

        // Prefer arXiv links when the paper has an arXiv id.
        let (id, url, pdf_url) = if !arxiv_id.is_empty() {
            (
                arxiv_id.to_string(),
                format!("https://arxiv.org/abs/{}", arxiv_id),
                format!("https://arxiv.org/pdf/{}", arxiv_id),
            )
        } else {
            let url = item["url"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("https://www.semanticscholar.org/paper/{}", s2_id));
            let pdf = item["openAccessPdf"]["url"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| url.clone());
            (format!("s2:{}", s2_id), url, pdf)
        };

        let Some(published) = parse_publication_date(item["publicationDate"].as_str().unwrap_or(""))
        else {
            continue;
        };
        if !window.contains(published) {
            continue;
        }

        let authors: Vec<String> = item["authors"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|author| author["name"].as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        papers.push(PaperRecord {
            id,
            title,
            authors,
            abstract_text,
            categories: Vec::new(),
            published,
            url,
            pdf_url,
            comment: item["venue"].as_str().unwrap_or("").to_string(),
            doi,
            source: PaperSourceKind::SemanticScholar,
            source_query: query.to_string(),
            hf_upvotes: 0,
        });
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// S2 publication dates are bare `YYYY-MM-DD` strings.
fn parse_publication_date(raw: &str) -> Option<DateTime<Utc>> {
    let date = raw.parse::<NaiveDate>().ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2025, 6, 7, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap(),
        )
    }

    fn sample() -> Value {
        json!({
            "total": 3,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "LLM Ranking  in Production",
                    "abstract": "Deployed at a large marketplace.",
                    "authors": [{"name": "Jane Doe"}],
                    "externalIds": {"ArXiv": "2506.07777", "DOI": "10.1145/123.456"},
                    "publicationDate": "2025-06-08",
                    "venue": "SIGIR",
                    "url": "https://www.semanticscholar.org/paper/abc123"
                },
                {
                    "paperId": "def456",
                    "title": "A Venue-Only Paper",
                    "abstract": null,
                    "authors": [],
                    "externalIds": {},
                    "publicationDate": "2025-06-09",
                    "url": "https://example.org/paper",
                    "openAccessPdf": {"url": "https://example.org/paper.pdf"}
                },
                {
                    "paperId": "old789",
                    "title": "Too Old",
                    "authors": [],
                    "externalIds": {},
                    "publicationDate": "2025-05-01"
                }
            ]
        })
    }

    #[test]
    fn test_collect_papers_window_and_ids() {
        let mut seen = std::collections::HashSet::new();
        let mut papers = Vec::new();
        collect_papers(&sample(), "recommender system", &window(), &mut seen, &mut papers);

        assert_eq!(papers.len(), 2);
        // ArXiv-backed entry uses arXiv id and links.
        assert_eq!(papers[0].id, "2506.07777");
        assert_eq!(papers[0].url, "https://arxiv.org/abs/2506.07777");
        assert_eq!(papers[0].doi.as_deref(), Some("10.1145/123.456"));
        assert_eq!(papers[0].comment, "SIGIR");
        // Non-arXiv entry falls back to the s2 id and open-access pdf.
        assert_eq!(papers[1].id, "s2:def456");
        assert_eq!(papers[1].pdf_url, "https://example.org/paper.pdf");
    }

    #[test]
    fn test_collect_papers_dedups_across_calls() {
        let mut seen = std::collections::HashSet::new();
        let mut papers = Vec::new();
        collect_papers(&sample(), "recommender system", &window(), &mut seen, &mut papers);
        collect_papers(&sample(), "recommender system", &window(), &mut seen, &mut papers);
        assert_eq!(papers.len(), 2);
    }

    #[test]
    fn test_missing_publication_date_skipped() {
        let data = json!({"data": [{"paperId": "x", "title": "No Date", "externalIds": {}}]});
        let mut seen = std::collections::HashSet::new();
        let mut papers = Vec::new();
        collect_papers(&data, "recommender system", &window(), &mut seen, &mut papers);
        assert!(papers.is_empty());
    }
}
