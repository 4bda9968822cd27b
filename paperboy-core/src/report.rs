//! Digest assembly and rendering.
//!
//! `render_html` is a pure function of the report: identical input yields
//! byte-identical output, with the generation timestamp carried inside the
//! report rather than read from the clock. Every interpolated string is
//! HTML-escaped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Classification, ClassifiedPaper, Window};

/// Per-label tallies over the full classified set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub industry: usize,
    pub academia: usize,
    pub irrelevant: usize,
    pub unknown: usize,
}

/// The final per-run digest: industry papers plus run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestReport {
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    /// Unique papers fetched across all sources, before classification.
    pub total_fetched: usize,
    pub counts: LabelCounts,
    /// Industry papers only, in canonical order (published desc, then id).
    pub papers: Vec<ClassifiedPaper>,
}

impl DigestReport {
    /// Build a report from the full classified list (canonical order),
    /// keeping only the industry subset in the body.
    pub fn build(
        window: Window,
        generated_at: DateTime<Utc>,
        classified: Vec<ClassifiedPaper>,
    ) -> Self {
        let total_fetched = classified.len();
        let mut counts = LabelCounts::default();
        for cp in &classified {
            match cp.classification {
                Classification::Industry { .. } => counts.industry += 1,
                Classification::Academia => counts.academia += 1,
                Classification::Irrelevant => counts.irrelevant += 1,
                Classification::Unknown => counts.unknown += 1,
            }
        }
        let papers = classified
            .into_iter()
            .filter(|cp| cp.classification.is_industry())
            .collect();
        Self {
            window,
            generated_at,
            total_fetched,
            counts,
            papers,
        }
    }

    /// Email subject line, e.g. "RecSys & LLM Industry Papers - Jun 10 (3 papers)".
    pub fn email_subject(&self) -> String {
        format!(
            "RecSys & LLM Industry Papers - {} ({} papers)",
            self.generated_at.format("%b %d"),
            self.papers.len()
        )
    }

    /// Deterministic basename for the report files, e.g.
    /// "industry-digest-2025-06-10".
    pub fn file_stem(&self) -> String {
        format!("industry-digest-{}", self.generated_at.format("%Y-%m-%d"))
    }
}

/// Escape a string for interpolation into HTML text or attribute context.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize the report to pretty JSON (the structured companion file).
pub fn render_json(report: &DigestReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render the digest as a self-contained HTML email document.
pub fn render_html(report: &DigestReport) -> String {
    let today = report.generated_at.format("%B %d, %Y").to_string();
    let since = report.window.start.format("%b %d").to_string();

    let mut papers_html = String::new();
    for (i, cp) in report.papers.iter().enumerate() {
        let p = &cp.paper;
        let title_safe = escape_html(&p.title);
        let authors_safe = escape_html(&p.authors_abbrev(8));
        let published_safe = escape_html(&p.published.format("%Y-%m-%d").to_string());
        let categories_safe = escape_html(&p.categories.join(", "));
        let url_safe = escape_html(&p.url);
        let pdf_safe = escape_html(if p.pdf_url.is_empty() { &p.url } else { &p.pdf_url });

        let company_html = match &cp.classification {
            Classification::Industry { companies, .. } if !companies.is_empty() => format!(
                r#"<span style="background: #fef3c7; color: #92400e; font-size: 11px; padding: 2px 8px; border-radius: 10px; margin-left: 4px; font-weight: 600;">{}</span>"#,
                escape_html(companies)
            ),
            _ => String::new(),
        };

        let summary_html = match &cp.summary {
            Some(summary) if !summary.is_empty() => format!(
                r#"<div style="color: #374151; font-size: 14px; margin-top: 8px; line-height: 1.5;">{}</div>"#,
                escape_html(summary)
            ),
            _ => String::new(),
        };

        papers_html.push_str(&format!(
            r#"
        <tr>
            <td style="padding: 16px 20px; border-bottom: 1px solid #e5e7eb;">
                <div style="margin-bottom: 6px;">
                    <span style="background: #dbeafe; color: #1e40af; font-size: 11px; padding: 2px 8px; border-radius: 10px; font-weight: 600;">#{rank}</span>
                    {company_html}
                </div>
                <a href="{url_safe}" style="color: #1d4ed8; text-decoration: none; font-size: 16px; font-weight: 600; line-height: 1.4;">{title_safe}</a>
                <div style="color: #6b7280; font-size: 13px; margin-top: 4px;">{authors_safe}</div>
                <div style="color: #9ca3af; font-size: 12px; margin-top: 2px;">{published_safe} &middot; {categories_safe}</div>
                {summary_html}
                <div style="margin-top: 8px;">
                    <a href="{url_safe}" style="color: #6366f1; font-size: 12px; text-decoration: none; margin-right: 12px;">Abstract</a>
                    <a href="{pdf_safe}" style="color: #6366f1; font-size: 12px; text-decoration: none;">PDF</a>
                </div>
            </td>
        </tr>"#,
            rank = i + 1,
        ));
    }

    if papers_html.is_empty() {
        papers_html = r#"
        <tr>
            <td style="padding: 32px 20px; text-align: center; color: #9ca3af;">
                No industry papers found in this period.
            </td>
        </tr>"#
            .to_string();
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="margin: 0; padding: 0; background: #f3f4f6; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background: #f3f4f6; padding: 24px 0;">
<tr><td align="center">
<table width="600" cellpadding="0" cellspacing="0" style="background: #ffffff; border-radius: 12px; overflow: hidden; box-shadow: 0 1px 3px rgba(0,0,0,0.1);">

    <!-- Header -->
    <tr>
        <td style="background: linear-gradient(135deg, #4f46e5, #7c3aed); padding: 28px 24px; text-align: center;">
            <div style="color: #ffffff; font-size: 22px; font-weight: 700;">RecSys &amp; LLM Industry Papers</div>
            <div style="color: #c4b5fd; font-size: 14px; margin-top: 4px;">{today} &middot; Since {since}</div>
        </td>
    </tr>

    <!-- Stats bar -->
    <tr>
        <td style="padding: 14px 20px; background: #fafafa; border-bottom: 1px solid #e5e7eb;">
            <table width="100%"><tr>
                <td style="color: #6b7280; font-size: 13px;">
                    <strong style="color: #111827; font-size: 20px;">{industry_count}</strong> industry papers
                </td>
                <td style="color: #6b7280; font-size: 13px; text-align: right;">
                    out of <strong>{total_count}</strong> total papers
                </td>
            </tr></table>
        </td>
    </tr>

    <!-- Papers -->
    {papers_html}

    <!-- Footer -->
    <tr>
        <td style="padding: 20px; text-align: center; color: #9ca3af; font-size: 12px; border-top: 1px solid #e5e7eb;">
            Generated by paperboy &middot;
            <a href="https://arxiv.org/list/cs.IR/recent" style="color: #6366f1; text-decoration: none;">Browse cs.IR</a>
            &middot;
            <a href="https://arxiv.org/list/cs.CL/recent" style="color: #6366f1; text-decoration: none;">Browse cs.CL</a>
        </td>
    </tr>

</table>
</td></tr></table>
</body>
</html>"#,
        industry_count = report.papers.len(),
        total_count = report.total_fetched,
    )
}
