use std::collections::HashMap;

use crate::core::error::EngineError;
use crate::core::types::{ContentKind, SourceRecord};

/// Canonical URL → `SourceRecord` registry; assigns global citation IDs on
/// first *citation* use (§4.E, §3). Thin wrapper over the map embedded in
/// `ResearchState` so the assignment invariant lives in one place.
pub struct SourceTable<'a> {
    sources: &'a mut HashMap<String, SourceRecord>,
    next_global_id: &'a mut u32,
}

impl<'a> SourceTable<'a> {
    pub fn new(sources: &'a mut HashMap<String, SourceRecord>, next_global_id: &'a mut u32) -> Self {
        SourceTable { sources, next_global_id }
    }

    pub fn upsert_seen(&mut self, url: &str, title: &str, content_type: ContentKind) {
        self.sources
            .entry(url.to_string())
            .or_insert_with(|| SourceRecord::new(url.to_string(), title.to_string(), content_type));
        if let Some(record) = self.sources.get_mut(url) {
            record.times_considered += 1;
        }
    }

    pub fn mark_selected(&mut self, url: &str) {
        if let Some(record) = self.sources.get_mut(url) {
            record.times_selected += 1;
        }
    }

    /// Assigns a global citation ID the first time `url` is actually cited,
    /// returning the existing ID on subsequent calls (§3 "global_id is
    /// assigned monotonically on first citation use").
    pub fn assign_global_id(&mut self, url: &str, section_id: &str) -> Result<u32, EngineError> {
        let id = {
            let record = self
                .sources
                .get_mut(url)
                .ok_or_else(|| EngineError::State(format!("citation of unknown source: {url}")))?;
            record.cited_in_sections.insert(section_id.to_string());
            match record.global_id {
                Some(id) => id,
                None => {
                    let id = *self.next_global_id;
                    *self.next_global_id += 1;
                    record.global_id = Some(id);
                    id
                }
            }
        };
        Ok(id)
    }

    pub fn get(&self, url: &str) -> Option<&SourceRecord> {
        self.sources.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_id_assigned_once_and_reused() {
        let mut sources = HashMap::new();
        let mut next_id = 1u32;
        let mut table = SourceTable::new(&mut sources, &mut next_id);
        table.upsert_seen("https://a.example", "A", ContentKind::Web);

        let first = table.assign_global_id("https://a.example", "sec-1").unwrap();
        let second = table.assign_global_id("https://a.example", "sec-2").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn global_ids_are_dense_across_distinct_sources() {
        let mut sources = HashMap::new();
        let mut next_id = 1u32;
        let mut table = SourceTable::new(&mut sources, &mut next_id);
        table.upsert_seen("https://a.example", "A", ContentKind::Web);
        table.upsert_seen("https://b.example", "B", ContentKind::Web);

        let a = table.assign_global_id("https://a.example", "sec-1").unwrap();
        let b = table.assign_global_id("https://b.example", "sec-1").unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn citing_unknown_source_is_a_state_error() {
        let mut sources = HashMap::new();
        let mut next_id = 1u32;
        let mut table = SourceTable::new(&mut sources, &mut next_id);
        assert!(table.assign_global_id("https://ghost.example", "sec-1").is_err());
    }
}
