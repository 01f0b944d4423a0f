use crate::core::api::ApiClient;
use crate::core::cache::{CacheSummary, DataCache};
use crate::core::listing::{ListQuery, Page};
use crate::core::search::{SearchOptions, SearchResult, SearchService};
use crate::domain::model::{EntityKind, Record};
use crate::domain::ports::ResourceSource;
use crate::utils::error::Result;
use serde_json::Value;

/// Cache-backed read side plus write-through mutations.
pub struct DeskEngine<S: ResourceSource> {
    source: S,
    cache: DataCache,
    search: SearchService,
}

impl<S: ResourceSource> DeskEngine<S> {
    pub fn new(source: S, cache: DataCache, search: SearchService) -> Self {
        Self {
            source,
            cache,
            search,
        }
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Refreshes stale kinds among those searched, then ranks hits.
    pub async fn search(&mut self, query: &str, options: &SearchOptions, force: bool) -> Result<Vec<SearchResult>> {
        if query.trim().chars().count() < crate::core::search::MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        self.cache.ensure_many(&options.kinds, &self.source, force).await?;
        Ok(self.search.search(&self.cache, query, options))
    }

    pub async fn list(&mut self, kind: EntityKind, query: &ListQuery, force: bool) -> Result<Page<Record>> {
        let records = self.cache.ensure(kind, &self.source, force).await?;
        Ok(query.apply(kind, records))
    }

    pub async fn summary(&mut self, force: bool) -> Result<Vec<CacheSummary>> {
        self.cache.ensure_many(&EntityKind::ALL, &self.source, force).await?;
        Ok(self.cache.summary())
    }
}

impl DeskEngine<ApiClient> {
    pub async fn create(&mut self, kind: EntityKind, body: &Value) -> Result<Record> {
        let record = self.source.create(kind, body).await?;
        self.cache.upsert(kind, record.clone());
        tracing::info!("Created {} {}", kind.label(), record.id().unwrap_or_default());
        Ok(record)
    }

    pub async fn update(&mut self, kind: EntityKind, id: &str, body: &Value) -> Result<Record> {
        let record = self.source.update(kind, id, body).await?;
        self.cache.upsert(kind, record.clone());
        tracing::info!("Updated {} {}", kind.label(), id);
        Ok(record)
    }

    pub async fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.source.delete(kind, id).await?;
        self.cache.remove(kind, id);
        tracing::info!("Deleted {} {}", kind.label(), id);
        Ok(())
    }

    /// Detail view: cached copy when present, otherwise a backend fetch.
    pub async fn get(&mut self, kind: EntityKind, id: &str) -> Result<Record> {
        if let Some(record) = self.cache.find(kind, id) {
            return Ok(record.clone());
        }
        let record = self.source.get(kind, id).await?;
        self.cache.upsert(kind, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ResourceSource for StaticSource {
        async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let records = match kind {
                EntityKind::Candidates => vec![
                    json!({"id": 1, "full_name": "John Smith", "status": "Hired"}),
                    json!({"id": 2, "full_name": "Johnny Lee", "status": "Applied"}),
                ],
                EntityKind::Jobs => vec![json!({"id": 7, "title": "Johnson Controls Liaison"})],
                _ => vec![],
            };
            Ok(records.into_iter().filter_map(Record::from_value).collect())
        }
    }

    fn engine() -> DeskEngine<StaticSource> {
        DeskEngine::new(
            StaticSource {
                calls: AtomicUsize::new(0),
            },
            DataCache::default(),
            SearchService::default(),
        )
    }

    #[tokio::test]
    async fn test_search_loads_only_requested_kinds() {
        let mut engine = engine();
        let options = SearchOptions::default().with_kinds(&[EntityKind::Candidates, EntityKind::Jobs]);

        let results = engine.search("john", &options, false).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "John Smith");
        assert_eq!(engine.source().calls.load(Ordering::SeqCst), 2);

        // second search is served from the cache
        engine.search("johnny", &options, false).await.unwrap();
        assert_eq!(engine.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_query_skips_fetching() {
        let mut engine = engine();
        assert!(engine.search("j", &SearchOptions::default(), false).await.unwrap().is_empty());
        assert_eq!(engine.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_applies_query() {
        let mut engine = engine();
        let query = ListQuery {
            tab: Some(crate::core::listing::FieldFilter::new("status", "hired")),
            ..ListQuery::default()
        };
        let page = engine.list(EntityKind::Candidates, &query, false).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id().as_deref(), Some("1"));
    }
}
