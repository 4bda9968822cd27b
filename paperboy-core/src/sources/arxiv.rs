//! ArXiv Atom API client — HTTP client, query building, and feed parsing.
//!
//! ArXiv asks clients to keep at least 3 seconds between API requests, so
//! the client tracks its last request time and sleeps as needed.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::types::{PaperRecord, PaperSourceKind, Window};

const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = "paperboy/0.3 (https://github.com/DevJadhav/paperboy)";

/// HTTP client for the arXiv API.
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    last_request: std::sync::Mutex<Option<std::time::Instant>>,
}

impl ArxivClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Request {
                source_name: "arxiv".into(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: ARXIV_API_BASE.to_string(),
            last_request: std::sync::Mutex::new(None),
        })
    }

    /// Enforce a minimum 3-second delay between arXiv API requests.
    async fn rate_limit(&self) {
        let wait_duration = {
            let last = self.last_request.lock().unwrap();
            if let Some(instant) = *last {
                let elapsed = instant.elapsed();
                if elapsed < Duration::from_secs(3) {
                    Some(Duration::from_secs(3) - elapsed)
                } else {
                    None
                }
            } else {
                None
            }
        }; // MutexGuard is dropped here before any .await

        if let Some(wait) = wait_duration {
            tokio::time::sleep(wait).await;
        }

        let mut last = self.last_request.lock().unwrap();
        *last = Some(std::time::Instant::now());
    }

    /// Run one query and return the papers submitted inside `window`.
    ///
    /// Results come back sorted by submission date descending, so parsing
    /// stops at the first entry older than `window.start`.
    pub async fn search_since(
        &self,
        query: &str,
        window: &Window,
        max_results: usize,
    ) -> Result<Vec<PaperRecord>, FetchError> {
        self.rate_limit().await;
        let url = build_search_url(&self.base_url, query, max_results);
        debug!(url = url.as_str(), "ArXiv search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                source_name: "arxiv".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: "arxiv".into(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Request {
            source_name: "arxiv".into(),
            message: format!("Failed to read response body: {}", e),
        })?;

        let mut papers = Vec::new();
        for entry_xml in extract_entries(&body) {
            let Some(paper) = parse_entry(&entry_xml) else {
                continue;
            };
            if paper.published < window.start {
                // Sorted descending by submittedDate, nothing newer follows.
                break;
            }
            if !window.contains(paper.published) {
                continue;
            }
            papers.push(paper);
        }
        Ok(papers)
    }
}

/// Build the arXiv API search URL for one query.
pub fn build_search_url(base_url: &str, query: &str, max_results: usize) -> String {
    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
        base_url,
        urlencoding::encode(query),
        max_results,
    )
}

// ── Atom parsing ──────────────────────────────────────────────

/// Extract all `<entry>...</entry>` blocks from the feed.
fn extract_entries(xml: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut search_from = 0;

    loop {
        let start_tag = "<entry>";
        let end_tag = "</entry>";

        let start = match xml[search_from..].find(start_tag) {
            Some(pos) => search_from + pos,
            None => break,
        };
        let end = match xml[start..].find(end_tag) {
            Some(pos) => start + pos + end_tag.len(),
            None => break,
        };

        entries.push(xml[start..end].to_string());
        search_from = end;
    }

    entries
}

/// Parse a single `<entry>` block into a `PaperRecord`.
fn parse_entry(entry: &str) -> Option<PaperRecord> {
    let id_url = extract_tag_text(entry, "id")?;
    let id = arxiv_id_from_url(&id_url);
    let title = normalize_whitespace(&extract_tag_text(entry, "title")?);
    let published_raw = extract_tag_text(entry, "published")?;
    let published = published_raw
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            DateTime::parse_from_rfc3339(&published_raw).map(|dt| dt.with_timezone(&Utc))
        })
        .ok()?;

    // Authors: every <name> inside an <author> block.
    let mut authors = Vec::new();
    let mut author_search = 0;
    while let Some(pos) = entry[author_search..].find("<author>") {
        let author_start = author_search + pos;
        let Some(end_pos) = entry[author_start..].find("</author>") else {
            break;
        };
        let author_end = author_start + end_pos + "</author>".len();
        if let Some(name) = extract_tag_text(&entry[author_start..author_end], "name") {
            authors.push(name);
        }
        author_search = author_end;
    }

    let abstract_text = normalize_whitespace(&extract_tag_text(entry, "summary").unwrap_or_default());
    let comment = extract_tag_text(entry, "arxiv:comment")
        .map(|c| normalize_whitespace(&c))
        .unwrap_or_default();
    let doi = extract_tag_text(entry, "arxiv:doi");

    // Category terms.
    let mut categories = Vec::new();
    let mut cat_search = 0;
    while let Some(pos) = entry[cat_search..].find("<category") {
        let cat_start = cat_search + pos;
        let cat_end = match entry[cat_start..].find('>') {
            Some(end_pos) => cat_start + end_pos + 1,
            None => break,
        };
        if let Some(term) = extract_attribute(&entry[cat_start..cat_end], "term") {
            categories.push(term);
        }
        cat_search = cat_end;
    }

    // Links: the pdf link carries title="pdf" or type="application/pdf".
    let mut pdf_url = String::new();
    let mut abs_url = id_url.clone();
    let mut link_search = 0;
    while let Some(pos) = entry[link_search..].find("<link") {
        let link_start = link_search + pos;
        let Some(end_pos) = entry[link_start..].find('>') else {
            break;
        };
        let link_end = link_start + end_pos + 1;
        let link_tag = &entry[link_start..link_end];
        let href = extract_attribute(link_tag, "href").unwrap_or_default();
        let title_attr = extract_attribute(link_tag, "title").unwrap_or_default();
        let link_type = extract_attribute(link_tag, "type").unwrap_or_default();

        if title_attr == "pdf" || link_type == "application/pdf" {
            pdf_url = href;
        } else if href.contains("/abs/") {
            abs_url = href;
        }
        link_search = link_end;
    }

    if pdf_url.is_empty() {
        pdf_url = format!("https://arxiv.org/pdf/{}", id);
    }

    Some(PaperRecord {
        id,
        title,
        authors,
        abstract_text,
        categories,
        published,
        url: abs_url,
        pdf_url,
        comment,
        doi,
        source: PaperSourceKind::Arxiv,
        source_query: String::new(),
        hf_upvotes: 0,
    })
}

/// Extract the text content of the first `<tag>text</tag>` occurrence.
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let start_pos = xml.find(&open)?;
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    Some(xml[content_start..content_end].trim().to_string())
}

/// Extract an attribute value from a tag string.
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!("{}=\"", attr);
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(tag[start..end].to_string())
}

/// Extract the arXiv ID from a URL like "http://arxiv.org/abs/2501.01234v1".
pub fn arxiv_id_from_url(url: &str) -> String {
    if let Some(pos) = url.rfind("/abs/") {
        url[pos + 5..].to_string()
    } else if let Some(pos) = url.rfind("/pdf/") {
        url[pos + 5..].trim_end_matches(".pdf").to_string()
    } else {
        url.to_string()
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
