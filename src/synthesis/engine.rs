//! `SynthesisEngine` (Component Q, §4.Q): generates subtopic content with
//! local citation IDs, smooths each section's subtopic prose together, then
//! relocalizes citation numerals to dense global IDs once every section
//! exists.

use std::sync::Arc;

use regex::Regex;

use crate::core::app_state::EngineState;
use crate::core::constants::SYNTHESIS_MIN_CITATIONS;
use crate::core::types::{CitationCandidate, ResearchState, ResultRecord};
use crate::sources::table::SourceTable;
use crate::synthesis::citation::{strike_sentence, CitationVerifier};
use crate::synthesis::llm::{ChatClient, ChatMessage, ModelKind};

#[derive(Debug, Clone)]
pub struct SynthesizedSection {
    pub topic: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct BibliographyEntry {
    pub global_id: u32,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub sections: Vec<SynthesizedSection>,
    pub bibliography: Vec<BibliographyEntry>,
    pub citations: Vec<CitationCandidate>,
}

/// One subtopic's generated prose plus the (section, subtopic, local_id) →
/// URL table needed to resolve its `[n]` markers later.
struct SubtopicDraft {
    text: String,
    citations: Vec<CitationCandidate>,
}

pub struct SynthesisEngine {
    state: Arc<EngineState>,
    chat: Arc<ChatClient>,
}

impl SynthesisEngine {
    pub fn new(state: Arc<EngineState>) -> Self {
        let chat = state.chat_client.clone();
        SynthesisEngine { state, chat }
    }

    /// §4.Q: `k = ceil(0.5 * max_cycles + 3)`, floor [`SYNTHESIS_MIN_CITATIONS`].
    fn citations_per_subtopic(&self) -> usize {
        let k = (0.5 * self.state.config.max_cycles as f32 + 3.0).ceil() as usize;
        k.max(SYNTHESIS_MIN_CITATIONS)
    }

    pub async fn synthesize(&self, research: &mut ResearchState) -> SynthesisResult {
        let mut sections = Vec::new();
        let mut all_citations: Vec<CitationCandidate> = Vec::new();

        for (section_idx, node) in research.outline.iter().enumerate() {
            let section_id = format!("section-{section_idx}");
            let mut drafts = Vec::new();

            for (sub_idx, subtopic) in node.flat_items().iter().enumerate() {
                let subtopic_id = format!("{section_id}-sub-{sub_idx}");
                let draft = self
                    .generate_subtopic(&research.original_question, subtopic, &research.result_history, &section_id, &subtopic_id)
                    .await;
                drafts.push(draft);
            }

            let raw_concat = drafts.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join("\n\n");
            let mut section_citations: Vec<CitationCandidate> =
                drafts.into_iter().flat_map(|d| d.citations).collect();

            let smoothed = self.smooth_section(&raw_concat, &section_citations).await;

            let verifier = CitationVerifier::new(self.state.clone());
            verifier.verify_all(&mut section_citations).await;

            let mut final_text = smoothed;
            for c in section_citations.iter().filter(|c| c.flagged) {
                final_text = strike_sentence(&final_text, &c.containing_sentence);
            }

            let relocalized = {
                let mut table = SourceTable::new(&mut research.source_table, &mut research.next_global_id);
                relocalize_section(&final_text, &section_citations, &section_id, &mut table, &mut research.global_citation_map)
            };

            sections.push(SynthesizedSection { topic: node.topic.clone(), content: relocalized });
            all_citations.extend(section_citations);
        }

        let bibliography = build_bibliography(&sections, research);
        SynthesisResult { sections, bibliography, citations: all_citations }
    }

    async fn generate_subtopic(
        &self,
        question: &str,
        subtopic: &str,
        results: &[ResultRecord],
        section_id: &str,
        subtopic_id: &str,
    ) -> SubtopicDraft {
        let k = self.citations_per_subtopic();
        let query_text = format!("{question} {subtopic}");
        let target = self.state.embedding_client.embed_cached(&self.state, &query_text).await;

        let mut scored: Vec<(&ResultRecord, f32)> = results
            .iter()
            .filter_map(|r| {
                let sim = match (&target, &r.embedding) {
                    (Some(t), Some(e)) => t.cosine_similarity(e),
                    _ => r.similarity,
                };
                Some((r, sim))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.sort_by(|a, b| a.0.title.cmp(&b.0.title));

        if scored.is_empty() {
            return SubtopicDraft { text: format!("No sourced material was found for {subtopic}."), citations: Vec::new() };
        }

        let mut listing = String::new();
        for (i, (result, _)) in scored.iter().enumerate() {
            let local_id = i as u32 + 1;
            let excerpt: String = result.content.chars().take(1200).collect();
            listing.push_str(&format!("[{local_id}] {} — {}\n{excerpt}\n\n", result.title, result.url));
        }

        let prompt = format!(
            "Question: {question}\nSubtopic: {subtopic}\n\nSources:\n{listing}\n\
             Write two to four paragraphs covering this subtopic using only the sources above. \
             Every factual claim must end with a citation marker referencing the source numbers in \
             brackets, e.g. [1] or [1,2]. Do not invent sources or numbers outside the given list."
        );
        let messages = vec![
            ChatMessage::system("You are a research writer who cites every claim with the given bracketed source numbers."),
            ChatMessage::user(prompt),
        ];

        let text = self
            .chat
            .complete(messages, ModelKind::Synthesis)
            .await
            .unwrap_or_else(|| format!("Synthesis unavailable for {subtopic}."));

        let local_urls: Vec<String> = scored.iter().map(|(r, _)| r.url.clone()).collect();
        let citations = extract_citations(&text, &local_urls, section_id, subtopic_id);

        SubtopicDraft { text, citations }
    }

    /// Reorders/polishes subtopic prose into connected section text. Any
    /// sentence carrying a citation marker must reappear verbatim in the
    /// output; if one disappears, the smoothing pass is rejected and the raw
    /// concatenation is kept instead.
    async fn smooth_section(&self, raw: &str, citations: &[CitationCandidate]) -> String {
        if citations.is_empty() {
            return raw.to_string();
        }
        let prompt = format!(
            "Smooth the transitions between these paragraphs into flowing prose. You may reorder or \
             reword non-cited sentences, but every sentence that already contains a bracketed citation \
             marker like [1] or [1,2] must be copied verbatim, unmodified.\n\n{raw}"
        );
        let messages = vec![
            ChatMessage::system("You polish research prose without altering cited sentences."),
            ChatMessage::user(prompt),
        ];

        let Some(smoothed) = self.chat.complete(messages, ModelKind::Synthesis).await else {
            return raw.to_string();
        };

        for c in citations {
            let sentence = c.containing_sentence.trim();
            if !sentence.is_empty() && !smoothed.contains(sentence) {
                tracing::warn!("smoothing pass dropped a cited sentence, keeping raw concatenation");
                return raw.to_string();
            }
        }
        smoothed
    }
}

fn marker_regex() -> Regex {
    Regex::new(r"\[(\d+(?:\s*,\s*\d+)*)\]").expect("static citation marker regex")
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?']).map(|s| s.trim()).filter(|s| !s.is_empty()).collect()
}

/// Scans generated subtopic text for `[n]` / `[n,m,...]` markers and builds
/// one [`CitationCandidate`] per component number, resolving its URL from
/// the subtopic's local 1-based source listing.
fn extract_citations(text: &str, local_urls: &[String], section_id: &str, subtopic_id: &str) -> Vec<CitationCandidate> {
    let re = marker_regex();
    let mut out = Vec::new();
    for sentence in split_sentences(text) {
        for caps in re.captures_iter(sentence) {
            for part in caps[1].split(',') {
                let Ok(n) = part.trim().parse::<u32>() else { continue };
                let Some(url) = local_urls.get((n - 1) as usize) else { continue };
                out.push(CitationCandidate {
                    local_id: n,
                    raw_text: format!("[{n}]"),
                    containing_sentence: sentence.to_string(),
                    url: url.clone(),
                    section_id: section_id.to_string(),
                    subtopic_id: subtopic_id.to_string(),
                    verified: false,
                    flagged: false,
                });
            }
        }
    }
    out
}

/// After verification/strikethrough, rewrites every `[n]` / `[n,m,...]`
/// marker in `text` to use dense global IDs, looking each local number up by
/// matching its recorded containing sentence (§9 Design Note: resolves by
/// sentence identity rather than by local-id table, since distinct
/// subtopics independently number their sources from 1).
fn relocalize_section(
    text: &str,
    citations: &[CitationCandidate],
    section_id: &str,
    table: &mut SourceTable<'_>,
    global_citation_map: &mut std::collections::HashMap<String, u32>,
) -> String {
    let re = marker_regex();
    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    for sentence in split_sentences(text) {
        let Some(offset) = text[last..].find(sentence) else { continue };
        let start = last + offset;
        let end = start + sentence.len();
        result.push_str(&text[last..start]);

        let mut rewritten = sentence.to_string();
        let matches: Vec<_> = re.captures_iter(sentence).collect();
        for caps in matches.into_iter().rev() {
            let whole = caps.get(0).unwrap();
            let mut globals = Vec::new();
            for part in caps[1].split(',') {
                let Ok(n) = part.trim().parse::<u32>() else { continue };
                let candidate = citations.iter().find(|c| c.local_id == n && c.containing_sentence.trim() == sentence.trim());
                if let Some(c) = candidate {
                    if let Ok(gid) = table.assign_global_id(&c.url, section_id) {
                        globals.push(gid);
                        global_citation_map.insert(c.url.clone(), gid);
                    }
                }
            }
            if !globals.is_empty() {
                let replacement = format!("[{}]", globals.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(","));
                rewritten.replace_range(whole.range(), &replacement);
            }
        }
        result.push_str(&rewritten);
        last = end;
    }
    result.push_str(&text[last..]);
    result
}

fn build_bibliography(sections: &[SynthesizedSection], research: &ResearchState) -> Vec<BibliographyEntry> {
    let re = Regex::new(r"\d+").expect("static digit regex");
    let marker_re = marker_regex();
    let mut cited: Vec<u32> = Vec::new();
    for s in sections {
        for caps in marker_re.captures_iter(&s.content) {
            for n in re.find_iter(&caps[1]) {
                if let Ok(id) = n.as_str().parse::<u32>() {
                    if !cited.contains(&id) {
                        cited.push(id);
                    }
                }
            }
        }
    }
    cited.sort_unstable();

    cited
        .into_iter()
        .filter_map(|gid| {
            research
                .source_table
                .values()
                .find(|r| r.global_id == Some(gid))
                .map(|r| BibliographyEntry { global_id: gid, url: r.url.clone(), title: r.title.clone() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ContentKind, SourceRecord};
    use std::collections::HashMap;

    #[test]
    fn extract_citations_resolves_single_and_combined_markers() {
        let text = "Solar output rose sharply. [1] Costs fell too, driven by scale [2,3].";
        let urls = vec!["https://a".to_string(), "https://b".to_string(), "https://c".to_string()];
        let citations = extract_citations(text, &urls, "sec-0", "sec-0-sub-0");
        assert_eq!(citations.len(), 3);
        assert_eq!(citations[0].url, "https://a");
    }

    #[test]
    fn relocalize_section_rewrites_to_dense_global_ids() {
        let mut sources = HashMap::new();
        sources.insert(
            "https://a".to_string(),
            SourceRecord::new("https://a".to_string(), "A".to_string(), ContentKind::Web),
        );
        let mut next_id = 1u32;
        let mut table = SourceTable::new(&mut sources, &mut next_id);

        let text = "Output rose sharply [1].";
        let citations = vec![CitationCandidate {
            local_id: 1,
            raw_text: "[1]".to_string(),
            containing_sentence: "Output rose sharply [1].".to_string(),
            url: "https://a".to_string(),
            section_id: "sec-0".to_string(),
            subtopic_id: "sec-0-sub-0".to_string(),
            verified: true,
            flagged: false,
        }];
        let mut global_citation_map = HashMap::new();
        let out = relocalize_section(text, &citations, "sec-0", &mut table, &mut global_citation_map);
        assert_eq!(out, "Output rose sharply [1].");
        assert_eq!(global_citation_map.get("https://a"), Some(&1));
    }

    #[test]
    fn citations_per_subtopic_has_a_floor_of_three() {
        assert!(SYNTHESIS_MIN_CITATIONS == 3);
    }

    /// §8 scenario 1 (bibliography shape, stated as a standalone invariant
    /// rather than the full end-to-end run): relocalizing two sections that
    /// each cite a different source yields a dense, no-[0], no-duplicate-URL
    /// bibliography with at least two entries.
    #[test]
    fn bibliography_has_no_zero_id_and_no_duplicate_urls_across_sections() {
        let mut sources = HashMap::new();
        sources.insert(
            "https://a".to_string(),
            SourceRecord::new("https://a".to_string(), "A".to_string(), ContentKind::Web),
        );
        sources.insert(
            "https://b".to_string(),
            SourceRecord::new("https://b".to_string(), "B".to_string(), ContentKind::Web),
        );
        let mut next_id = 1u32;
        let mut global_citation_map = HashMap::new();

        let section_a_text = "Models shrank considerably [1].";
        let section_a_citations = vec![CitationCandidate {
            local_id: 1,
            raw_text: "[1]".to_string(),
            containing_sentence: "Models shrank considerably [1].".to_string(),
            url: "https://a".to_string(),
            section_id: "sec-0".to_string(),
            subtopic_id: "sec-0-sub-0".to_string(),
            verified: true,
            flagged: false,
        }];
        let section_b_text = "Surveys cite similar gains [1].";
        let section_b_citations = vec![CitationCandidate {
            local_id: 1,
            raw_text: "[1]".to_string(),
            containing_sentence: "Surveys cite similar gains [1].".to_string(),
            url: "https://b".to_string(),
            section_id: "sec-1".to_string(),
            subtopic_id: "sec-1-sub-0".to_string(),
            verified: true,
            flagged: false,
        }];

        let relocalized_a = {
            let mut table = SourceTable::new(&mut sources, &mut next_id);
            relocalize_section(section_a_text, &section_a_citations, "sec-0", &mut table, &mut global_citation_map)
        };
        let relocalized_b = {
            let mut table = SourceTable::new(&mut sources, &mut next_id);
            relocalize_section(section_b_text, &section_b_citations, "sec-1", &mut table, &mut global_citation_map)
        };

        assert!(!relocalized_a.contains("[0]"));
        assert!(!relocalized_b.contains("[0]"));

        let mut research = ResearchState::new("q".to_string());
        research.source_table = sources;
        let sections = vec![
            SynthesizedSection { topic: "sec-0".to_string(), content: relocalized_a },
            SynthesizedSection { topic: "sec-1".to_string(), content: relocalized_b },
        ];
        let bibliography = build_bibliography(&sections, &research);

        assert!(bibliography.len() >= 2);
        assert!(bibliography.iter().all(|e| e.global_id != 0));
        let mut urls: Vec<&str> = bibliography.iter().map(|e| e.url.as_str()).collect();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), bibliography.len(), "bibliography must not contain duplicate URLs");
    }
}
