//! Core data model shared across the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The half-open time range `[start, end)` a single run searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether a publication timestamp falls inside this window.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

/// Which upstream repository a paper record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSourceKind {
    Arxiv,
    SemanticScholar,
    HuggingFace,
}

impl std::fmt::Display for PaperSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaperSourceKind::Arxiv => write!(f, "arxiv"),
            PaperSourceKind::SemanticScholar => write!(f, "s2"),
            PaperSourceKind::HuggingFace => write!(f, "hf"),
        }
    }
}

/// A paper fetched from one of the sources.
///
/// `id` is unique within a run after deduplication. `source_query` records
/// the query string that first produced the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
    pub url: String,
    pub pdf_url: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub source: PaperSourceKind,
    #[serde(default)]
    pub source_query: String,
    #[serde(default)]
    pub hf_upvotes: u32,
}

impl PaperRecord {
    /// Author list truncated for prompts and rendering: first `max` names,
    /// with a "+N more" suffix when the list is longer.
    pub fn authors_abbrev(&self, max: usize) -> String {
        if self.authors.len() <= max {
            self.authors.join(", ")
        } else {
            format!(
                "{} ... (+{} more)",
                self.authors[..max].join(", "),
                self.authors.len() - max
            )
        }
    }
}

/// Outcome of the industry/academia classification for one paper.
///
/// Every parse failure degrades to `Unknown` rather than an error, so a
/// classification is always present downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum Classification {
    /// At least one author is affiliated with a commercial entity.
    Industry {
        /// Company name(s) named by the classifier, comma-separated.
        companies: String,
        /// Brief reasoning returned by the classifier.
        evidence: String,
    },
    Academia,
    /// Off-topic for the digest (fails the relevance gate).
    Irrelevant,
    /// Not classified: budget exhausted or the batch response was unusable.
    Unknown,
}

impl Classification {
    pub fn is_industry(&self) -> bool {
        matches!(self, Classification::Industry { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Industry { .. } => "industry",
            Classification::Academia => "academia",
            Classification::Irrelevant => "irrelevant",
            Classification::Unknown => "unknown",
        }
    }
}

/// A paper enriched with its classification and optional summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedPaper {
    #[serde(flatten)]
    pub paper: PaperRecord,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ClassifiedPaper {
    pub fn unclassified(paper: PaperRecord) -> Self {
        Self {
            paper,
            classification: Classification::Unknown,
            summary: None,
        }
    }
}

/// Sort papers into the pipeline's canonical order: published date
/// descending, then id ascending. Classification, summarization, and
/// rendering all iterate in this order, so budget truncation and report
/// layout are deterministic.
pub fn sort_canonical(papers: &mut [PaperRecord]) {
    papers.sort_by(|a, b| b.published.cmp(&a.published).then_with(|| a.id.cmp(&b.id)));
}


#[cfg(test)]
mod tests {
    use super::test_support::paper;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_contains_half_open() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let w = Window::new(start, end);
        assert!(w.contains(start));
        assert!(!w.contains(end));
        assert!(w.contains(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_authors_abbrev_truncates() {
        let mut p = paper("2501.00001", "A Paper", "2025-01-02");
        p.authors = (0..10).map(|i| format!("Author {i}")).collect();
        let s = p.authors_abbrev(8);
        assert!(s.ends_with("(+2 more)"));
        assert!(s.starts_with("Author 0, Author 1"));

        p.authors.truncate(3);
        assert_eq!(p.authors_abbrev(8), "Author 0, Author 1, Author 2");
    }

    #[test]
    fn test_classification_labels() {
        let c = Classification::Industry {
            companies: "Netflix".into(),
            evidence: "author affiliation".into(),
        };
        assert!(c.is_industry());
        assert_eq!(c.label(), "industry");
        assert!(!Classification::Unknown.is_industry());
        assert_eq!(Classification::Irrelevant.label(), "irrelevant");
    }

    #[test]
    fn test_sort_canonical_order() {
        let mut papers = vec![
            paper("2501.00002", "B", "2025-01-01"),
            paper("2501.00003", "C", "2025-01-03"),
            paper("2501.00001", "A", "2025-01-01"),
        ];
        sort_canonical(&mut papers);
        // Newest first, ties broken by ascending id.
        assert_eq!(papers[0].id, "2501.00003");
        assert_eq!(papers[1].id, "2501.00001");
        assert_eq!(papers[2].id, "2501.00002");
    }

    #[test]
    fn test_classified_paper_json_roundtrip() {
        let cp = ClassifiedPaper {
            paper: paper("2501.00001", "A Paper", "2025-01-02"),
            classification: Classification::Industry {
                companies: "Spotify".into(),
                evidence: "company email domain".into(),
            },
            summary: Some("Two sentences.".into()),
        };
        let json = serde_json::to_string(&cp).unwrap();
        let parsed: ClassifiedPaper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.paper.id, "2501.00001");
        assert!(parsed.classification.is_industry());
        assert_eq!(parsed.summary.as_deref(), Some("Two sentences."));
    }
}
