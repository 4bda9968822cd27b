//! Cross-source deduplication.
//!
//! Papers arrive from arXiv, Semantic Scholar, and HuggingFace, often
//! describing the same work under different identifiers. Three matching
//! layers are tried in order: normalized arXiv id, normalized DOI, then
//! normalized title. The first occurrence wins (sources are queried in
//! priority order), and later duplicates merge their metadata in.

use std::collections::HashMap;
use tracing::info;

use crate::types::PaperRecord;

/// Minimum normalized-title length for fuzzy matching. Shorter titles are
/// too likely to collide.
const MIN_TITLE_KEY_LEN: usize = 30;

/// Normalize an arXiv id: strip URL prefixes and the version suffix.
pub fn normalize_arxiv_id(raw: &str) -> String {
    let mut s = raw.trim();
    for prefix in [
        "https://arxiv.org/abs/",
        "http://arxiv.org/abs/",
        "https://arxiv.org/pdf/",
        "http://arxiv.org/pdf/",
        "arXiv:",
    ] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    // Strip a trailing version marker like "v2".
    if let Some(v_pos) = s.rfind('v')
        && v_pos > 0
        && s[v_pos + 1..].chars().all(|c| c.is_ascii_digit())
        && !s[v_pos + 1..].is_empty()
    {
        s = &s[..v_pos];
    }
    s.to_string()
}

/// Normalize a DOI: lowercase, strip resolver URL prefixes.
pub fn normalize_doi(raw: &str) -> String {
    let mut s = raw.trim();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    s.to_lowercase()
}

/// Normalize a title for fuzzy matching: drop simple LaTeX markup,
/// lowercase, keep only alphanumerics and single spaces.
pub fn normalize_title(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    let mut chars = title.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // Skip LaTeX commands like \textbf, keeping the braced argument.
            '\\' => {
                while let Some(next) = chars.peek() {
                    if next.is_ascii_alphabetic() {
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            '{' | '}' | '$' => {}
            _ => cleaned.push(c),
        }
    }

    let lowered = cleaned.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_space = true;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Merge metadata from `new` into `existing` when they describe the same
/// paper: keep the longer abstract, the higher upvote count, and fill in a
/// missing DOI or category list.
fn merge_paper(existing: &mut PaperRecord, new: &PaperRecord) {
    if new.abstract_text.len() > existing.abstract_text.len() {
        existing.abstract_text = new.abstract_text.clone();
    }
    if new.hf_upvotes > existing.hf_upvotes {
        existing.hf_upvotes = new.hf_upvotes;
    }
    if existing.doi.is_none() && new.doi.is_some() {
        existing.doi = new.doi.clone();
    }
    if existing.categories.is_empty() && !new.categories.is_empty() {
        existing.categories = new.categories.clone();
    }
}

/// Deduplicate papers, preserving input order for first occurrences.
///
/// Input order is source-priority order (arXiv first), so the kept record
/// is always the one from the most authoritative source.
pub fn deduplicate_papers(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let total = papers.len();
    let mut seen_arxiv: HashMap<String, usize> = HashMap::new();
    let mut seen_doi: HashMap<String, usize> = HashMap::new();
    let mut seen_title: HashMap<String, usize> = HashMap::new();
    let mut result: Vec<PaperRecord> = Vec::with_capacity(total);

    for paper in papers {
        // Layer 1: arXiv id (ignores synthetic "s2:..." ids).
        let arxiv_key = if paper.id.starts_with("s2:") {
            String::new()
        } else {
            normalize_arxiv_id(&paper.id)
        };
        if !arxiv_key.is_empty()
            && let Some(&idx) = seen_arxiv.get(&arxiv_key)
        {
            merge_paper(&mut result[idx], &paper);
            continue;
        }

        // Layer 2: DOI.
        let doi_key = paper.doi.as_deref().map(normalize_doi).unwrap_or_default();
        if !doi_key.is_empty()
            && let Some(&idx) = seen_doi.get(&doi_key)
        {
            merge_paper(&mut result[idx], &paper);
            continue;
        }

        // Layer 3: normalized title.
        let title_key = normalize_title(&paper.title);
        if title_key.len() >= MIN_TITLE_KEY_LEN
            && let Some(&idx) = seen_title.get(&title_key)
        {
            merge_paper(&mut result[idx], &paper);
            continue;
        }

        let idx = result.len();
        if !arxiv_key.is_empty() {
            seen_arxiv.insert(arxiv_key, idx);
        }
        if !doi_key.is_empty() {
            seen_doi.insert(doi_key, idx);
        }
        if title_key.len() >= MIN_TITLE_KEY_LEN {
            seen_title.insert(title_key, idx);
        }
        result.push(paper);
    }

    info!(
        "Dedup: {} papers in, {} unique out ({} duplicates removed)",
        total,
        result.len(),
        total - result.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::paper;
    use crate::types::PaperSourceKind;

    #[test]
    fn test_normalize_arxiv_id() {
        assert_eq!(normalize_arxiv_id("2501.12345v2"), "2501.12345");
        assert_eq!(
            normalize_arxiv_id("https://arxiv.org/abs/2501.12345v1"),
            "2501.12345"
        );
        assert_eq!(normalize_arxiv_id("arXiv:2501.12345"), "2501.12345");
        assert_eq!(normalize_arxiv_id("hep-th/9901001"), "hep-th/9901001");
        assert_eq!(normalize_arxiv_id(""), "");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1145/ABC.123"),
            "10.1145/abc.123"
        );
        assert_eq!(normalize_doi("10.1145/abc.123"), "10.1145/abc.123");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("BERT: Pre-training of Deep   Bidirectional Transformers"),
            "bert pre training of deep bidirectional transformers"
        );
        assert_eq!(
            normalize_title(r"\textbf{Attention} Is $All$ You Need"),
            "attention is all you need"
        );
    }

    #[test]
    fn test_dedup_by_arxiv_id_version_insensitive() {
        let a = paper("2501.00001v1", "A Long Enough Paper Title For Matching", "2025-01-02");
        let mut b = paper("2501.00001v2", "A Long Enough Paper Title For Matching", "2025-01-02");
        b.hf_upvotes = 12;
        b.source = PaperSourceKind::HuggingFace;

        let result = deduplicate_papers(vec![a, b]);
        assert_eq!(result.len(), 1);
        // First occurrence wins identity, merge carries the upvotes over.
        assert_eq!(result[0].id, "2501.00001v1");
        assert_eq!(result[0].hf_upvotes, 12);
        assert_eq!(result[0].source, PaperSourceKind::Arxiv);
    }

    #[test]
    fn test_dedup_by_doi() {
        let mut a = paper("s2:abc", "Short A", "2025-01-02");
        a.id = "s2:abc".into();
        a.doi = Some("10.1145/XYZ".into());
        let mut b = paper("s2:def", "Short B", "2025-01-02");
        b.id = "s2:def".into();
        b.doi = Some("https://doi.org/10.1145/xyz".into());
        b.abstract_text = "A much longer abstract that should be merged into the kept record.".into();

        let result = deduplicate_papers(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert!(result[0].abstract_text.starts_with("A much longer abstract"));
    }

    #[test]
    fn test_dedup_by_title_requires_min_length() {
        // Short titles never fuzzy-match.
        let a = paper("2501.00001", "Attention", "2025-01-02");
        let mut b = paper("s2:xyz", "Attention", "2025-01-02");
        b.id = "s2:xyz".into();
        assert_eq!(deduplicate_papers(vec![a, b]).len(), 2);

        let long = "A Sufficiently Long Title About Generative Retrieval Systems";
        let c = paper("2501.00002", long, "2025-01-02");
        let mut d = paper("s2:pqr", long, "2025-01-02");
        d.id = "s2:pqr".into();
        assert_eq!(deduplicate_papers(vec![c, d]).len(), 1);
    }

    #[test]
    fn test_dedup_fills_missing_categories() {
        let mut a = paper("s2:abc", "A Sufficiently Long Title About Ranking Models", "2025-01-02");
        a.id = "s2:abc".into();
        a.categories.clear();
        let b = paper("2501.00003", "A Sufficiently Long Title About Ranking Models", "2025-01-02");

        let result = deduplicate_papers(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].categories, vec!["cs.IR"]);
    }

    #[test]
    fn test_dedup_distinct_papers_kept_in_order() {
        let a = paper("2501.00001", "First Distinct Paper About Dense Retrieval", "2025-01-02");
        let b = paper("2501.00002", "Second Distinct Paper About CTR Prediction", "2025-01-03");
        let result = deduplicate_papers(vec![a.clone(), b.clone()]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, a.id);
        assert_eq!(result[1].id, b.id);
    }
}
