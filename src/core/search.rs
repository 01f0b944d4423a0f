//! Multi-entity search over the data cache.
//!
//! Every record is flattened into one lowercase string. A record matches when
//! that string contains the whole query; matches are scored per query token
//! and ranked across entity types.

use crate::core::cache::DataCache;
use crate::domain::model::{EntityKind, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub const MIN_QUERY_CHARS: usize = 2;
pub const DEFAULT_LIMIT: usize = 50;

/// Points awarded per query token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// The searchable text starts with the token.
    pub start_of_text: u32,
    /// The token occurs somewhere else in the text.
    pub substring: u32,
    /// Bonus when the token also occurs as a whole word.
    pub whole_word: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            start_of_text: 10,
            substring: 5,
            whole_word: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub path: String,
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub kinds: Vec<EntityKind>,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            kinds: EntityKind::ALL.to_vec(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_kinds(mut self, kinds: &[EntityKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }
}

/// A query split into tokens with their word-boundary patterns compiled once.
struct PreparedQuery {
    needle: String,
    tokens: Vec<(String, Option<Regex>)>,
}

impl PreparedQuery {
    fn parse(query: &str) -> Option<Self> {
        let needle = query.trim().to_lowercase();
        if needle.chars().count() < MIN_QUERY_CHARS {
            return None;
        }

        let tokens = needle
            .split_whitespace()
            .map(|token| {
                let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(token))).ok();
                (token.to_string(), pattern)
            })
            .collect();

        Some(Self { needle, tokens })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchService {
    weights: ScoringWeights,
}

impl SearchService {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Ranked hits across the requested kinds. Never fails: bad input gives no hits.
    pub fn search(&self, cache: &DataCache, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let Some(prepared) = PreparedQuery::parse(query) else {
            return Vec::new();
        };
        if options.limit == 0 {
            return Vec::new();
        }

        let mut seen_kinds = HashSet::new();
        let mut results = Vec::new();
        for kind in &options.kinds {
            if !seen_kinds.insert(*kind) {
                continue;
            }
            results.extend(self.search_records(*kind, cache.records(*kind), &prepared));
        }

        // stable: equal scores keep source order
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(options.limit);

        tracing::debug!("Search '{}' returned {} results", prepared.needle, results.len());
        results
    }

    /// Searches one slice of records of a known kind.
    pub fn search_kind(&self, kind: EntityKind, records: &[Record], query: &str, limit: usize) -> Vec<SearchResult> {
        let Some(prepared) = PreparedQuery::parse(query) else {
            return Vec::new();
        };
        let mut results = self.search_records(kind, records, &prepared);
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);
        results
    }

    fn search_records(&self, kind: EntityKind, records: &[Record], query: &PreparedQuery) -> Vec<SearchResult> {
        let mut seen_ids = HashSet::new();
        records
            .iter()
            .filter_map(|record| {
                let text = searchable_text(kind, record);
                if !text.contains(&query.needle) {
                    return None;
                }
                let id = record.id().unwrap_or_default();
                if !id.is_empty() && !seen_ids.insert(id.clone()) {
                    return None;
                }
                let score = self.score(&text, query);
                Some(build_result(kind, record, id, score))
            })
            .collect()
    }

    fn score(&self, text: &str, query: &PreparedQuery) -> u32 {
        query
            .tokens
            .iter()
            .map(|(token, pattern)| {
                let mut points = if text.starts_with(token.as_str()) {
                    self.weights.start_of_text
                } else if text.contains(token.as_str()) {
                    self.weights.substring
                } else {
                    0
                };
                if pattern.as_ref().is_some_and(|re| re.is_match(text)) {
                    points += self.weights.whole_word;
                }
                points
            })
            .sum()
    }
}

/// Lowercased text of a record: display fields first, then every other
/// non-null field in record order. The `id` never takes part.
pub fn searchable_text(kind: EntityKind, record: &Record) -> String {
    let display = kind.display_fields();
    let mut parts = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();

    for field in display.all() {
        if !used.insert(field) {
            continue;
        }
        if let Some(value) = record.get(field) {
            flatten_value(value, &mut parts);
        }
    }

    for (field, value) in &record.data {
        if field == "id" || used.contains(field.as_str()) {
            continue;
        }
        flatten_value(value, &mut parts);
    }

    parts.join(" ").to_lowercase()
}

fn flatten_value(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        Value::Number(n) => parts.push(n.to_string()),
        Value::Bool(b) => parts.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| flatten_value(item, parts)),
        Value::Object(map) => map.values().for_each(|item| flatten_value(item, parts)),
    }
}

fn build_result(kind: EntityKind, record: &Record, id: String, score: u32) -> SearchResult {
    let display = kind.display_fields();
    let title = record
        .first_text(display.title)
        .unwrap_or_else(|| format!("{} {}", kind.label(), id));
    let subtitle = record
        .first_text(display.subtitle)
        .unwrap_or_else(|| kind.label().to_string());
    let description = record.first_text(display.description).unwrap_or_default();
    let path = if id.is_empty() {
        kind.route().to_string()
    } else {
        format!("{}/{}", kind.route(), id)
    };

    SearchResult {
        kind,
        id,
        title,
        subtitle,
        description,
        path,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn cache_with(kind: EntityKind, records: Vec<serde_json::Value>) -> DataCache {
        let mut cache = DataCache::default();
        cache.store(kind, records.into_iter().map(record).collect(), Utc::now());
        cache
    }

    #[test]
    fn test_short_queries_return_nothing() {
        let cache = cache_with(EntityKind::Candidates, vec![json!({"id": 1, "full_name": "J"})]);
        let service = SearchService::default();

        assert!(service.search(&cache, "", &SearchOptions::default()).is_empty());
        assert!(service.search(&cache, "j", &SearchOptions::default()).is_empty());
        assert!(service.search(&cache, " j  ", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_john_ranks_exact_word_first() {
        let cache = cache_with(
            EntityKind::Candidates,
            vec![
                json!({"id": 2, "full_name": "Johnny Lee"}),
                json!({"id": 1, "full_name": "John Smith"}),
            ],
        );
        let results = SearchService::default().search(&cache, "john", &SearchOptions::default());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "John Smith");
        assert_eq!(results[0].score, 13);
        assert_eq!(results[1].title, "Johnny Lee");
        assert_eq!(results[1].score, 10);
        assert_eq!(results[0].path, "/candidates/1");
    }

    #[test]
    fn test_start_of_text_beats_substring() {
        let cache = cache_with(
            EntityKind::Jobs,
            vec![
                json!({"id": 1, "title": "Senior Rust Engineer"}),
                json!({"id": 2, "title": "Rust Engineer"}),
            ],
        );
        let results = SearchService::default().search(&cache, "rust", &SearchOptions::default());

        assert_eq!(results[0].id, "2");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_null_fields_are_not_searchable() {
        let cache = cache_with(
            EntityKind::Candidates,
            vec![json!({"id": 1, "full_name": "Ada", "email": null, "phone": ""})],
        );
        let service = SearchService::default();

        assert!(service.search(&cache, "null", &SearchOptions::default()).is_empty());
        let text = searchable_text(EntityKind::Candidates, &cache.records(EntityKind::Candidates)[0]);
        assert_eq!(text, "ada");
    }

    #[test]
    fn test_nested_values_are_flattened() {
        let r = record(json!({
            "id": 9,
            "full_name": "Grace Hopper",
            "skills": ["COBOL", "Compilers"],
            "address": {"city": "Arlington", "zip": null}
        }));
        assert_eq!(
            searchable_text(EntityKind::Candidates, &r),
            "grace hopper cobol compilers arlington"
        );
    }

    #[test]
    fn test_limit_and_kind_filter() {
        let mut cache = DataCache::default();
        let candidates = (0..30)
            .map(|i| record(json!({"id": i, "full_name": format!("Taylor {}", i)})))
            .collect();
        cache.store(EntityKind::Candidates, candidates, Utc::now());
        cache.store(
            EntityKind::Recruiters,
            vec![record(json!({"id": 1, "full_name": "Taylor Recruiter"}))],
            Utc::now(),
        );

        let service = SearchService::default();
        let limited = service.search(&cache, "taylor", &SearchOptions::default().with_limit(10));
        assert_eq!(limited.len(), 10);

        let recruiters_only = service.search(
            &cache,
            "taylor",
            &SearchOptions::default().with_kinds(&[EntityKind::Recruiters]),
        );
        assert_eq!(recruiters_only.len(), 1);
        assert_eq!(recruiters_only[0].kind, EntityKind::Recruiters);

        assert!(service
            .search(&cache, "taylor", &SearchOptions::default().with_limit(0))
            .is_empty());
    }

    #[test]
    fn test_ties_keep_source_order() {
        let mut cache = DataCache::default();
        cache.store(EntityKind::Companies, vec![record(json!({"id": 1, "name": "Acme"}))], Utc::now());
        cache.store(EntityKind::Jobs, vec![record(json!({"id": 5, "title": "Acme"}))], Utc::now());

        let results = SearchService::default().search(
            &cache,
            "acme",
            &SearchOptions::default().with_kinds(&[EntityKind::Jobs, EntityKind::Companies]),
        );
        assert_eq!(results[0].kind, EntityKind::Jobs);
        assert_eq!(results[1].kind, EntityKind::Companies);
    }

    #[test]
    fn test_multi_token_query_must_match_whole_phrase() {
        let cache = cache_with(
            EntityKind::Candidates,
            vec![
                json!({"id": 1, "full_name": "John Smith"}),
                json!({"id": 2, "full_name": "Smith John"}),
            ],
        );
        let results = SearchService::default().search(&cache, "john smith", &SearchOptions::default());

        assert_eq!(results.len(), 1);
        // "john" at start (10 + 3), "smith" inside (5 + 3)
        assert_eq!(results[0].score, 21);
    }

    #[test]
    fn test_custom_weights() {
        let cache = cache_with(EntityKind::Domains, vec![json!({"id": 1, "name": "Data Science"})]);
        let service = SearchService::new(ScoringWeights {
            start_of_text: 1,
            substring: 1,
            whole_word: 0,
        });
        let results = service.search(&cache, "data", &SearchOptions::default());
        assert_eq!(results[0].score, 1);
        assert_eq!(results[0].subtitle, "Domain");
    }

    #[test]
    fn test_search_kind_over_plain_slice() {
        let records = vec![
            record(json!({"id": 1, "job_title": "Backend Developer", "company_name": "Initech"})),
            record(json!({"id": 2, "job_title": "Designer", "company_name": "Initech"})),
        ];
        let results = SearchService::default().search_kind(EntityKind::Jobs, &records, "developer", 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subtitle, "Initech");
    }
}
