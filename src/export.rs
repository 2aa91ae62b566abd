//! Human-readable research export writer (§6). Out of scope for the engine's
//! own semantics — a thin formatter over [`ResearchState`] consumed by the
//! launcher binary, not the `CycleController`.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::core::types::ResearchState;

fn slugify(question: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for c in question.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "research".to_string()
    } else {
        trimmed.chars().take(60).collect()
    }
}

/// Builds the export filename `research_export_{slug}_{timestamp}.txt`.
pub fn export_filename(question: &str, timestamp: chrono::DateTime<Utc>) -> String {
    format!("research_export_{}_{}.txt", slugify(question), timestamp.format("%Y%m%d%H%M%S"))
}

/// Renders the header block plus one delimited record per gathered result.
pub fn render_export(research: &ResearchState, generated_at: chrono::DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("question: {}\n", research.original_question));
    out.push_str(&format!("generated_at: {}\n", generated_at.to_rfc3339()));
    out.push_str(&format!("cycles_run: {}\n", research.cycle_summaries.len()));
    out.push_str(&format!("results_gathered: {}\n", research.result_history.len()));
    out.push_str(&format!("sources_cited: {}\n", research.global_citation_map.len()));
    out.push_str("===\n");

    for (index, record) in research.result_history.iter().enumerate() {
        out.push_str(&format!("index: {}\n", index + 1));
        out.push_str(&format!("timestamp: {}\n", generated_at.to_rfc3339()));
        out.push_str(&format!("query: {}\n", record.query));
        out.push_str(&format!("url: {}\n", record.url));
        out.push_str(&format!("title: {}\n", record.title));
        out.push_str(&format!("tokens: {}\n", record.content.split_whitespace().count()));
        out.push_str(&format!("similarity: {:.4}\n", record.similarity));
        out.push_str("content:\n");
        out.push_str(&record.content);
        out.push('\n');
        out.push_str("===\n");
    }
    out
}

/// Writes the export file to `dir`, returning the full path written.
pub async fn write_export(dir: &std::path::Path, research: &ResearchState) -> Result<std::path::PathBuf> {
    let now = Utc::now();
    let filename = export_filename(&research.original_question, now);
    let path = dir.join(filename);
    let body = render_export(research, now);
    tokio::fs::write(&path, body).await.with_context(|| format!("writing research export to {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_keeps_alphanumerics_and_collapses_separators() {
        assert_eq!(slugify("What is the  status of fusion power?"), "what-is-the-status-of-fusion-power");
    }

    #[test]
    fn slugify_falls_back_when_nothing_alphanumeric() {
        assert_eq!(slugify("???"), "research");
    }

    #[test]
    fn render_export_includes_header_and_delimiters() {
        let state = ResearchState::new("fusion power".to_string());
        let rendered = render_export(&state, Utc::now());
        assert!(rendered.starts_with("question: fusion power\n"));
        assert!(rendered.contains("==="));
    }
}
