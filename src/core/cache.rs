//! In-memory mirror of the backend collections.
//!
//! Each entity type keeps its records plus the time of the last successful
//! fetch. A collection older than the cache duration is stale and is
//! refetched on the next `ensure`; `force` bypasses the check. Refreshes of the
//! same type are not coalesced: two concurrent callers both hit the backend.

use crate::domain::model::{EntityKind, Record};
use crate::domain::ports::ResourceSource;
use crate::utils::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    records: Vec<Record>,
    last_fetched: Option<DateTime<Utc>>,
}

/// Per-kind counts shown on the dashboard overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSummary {
    pub kind: EntityKind,
    pub count: usize,
    pub last_fetched: Option<DateTime<Utc>>,
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct DataCache {
    entries: HashMap<EntityKind, CacheEntry>,
    duration: Duration,
}

impl DataCache {
    pub fn new(duration: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn records(&self, kind: EntityKind) -> &[Record] {
        self.entries
            .get(&kind)
            .map(|entry| entry.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_fetched(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.entries.get(&kind).and_then(|entry| entry.last_fetched)
    }

    /// Never fetched, or fetched longer ago than the cache duration.
    pub fn needs_refresh(&self, kind: EntityKind, now: DateTime<Utc>) -> bool {
        match self.last_fetched(kind) {
            Some(fetched) => now.signed_duration_since(fetched) > self.duration,
            None => true,
        }
    }

    /// Replaces a collection wholesale, deduplicating by id (last one wins).
    pub fn store(&mut self, kind: EntityKind, records: Vec<Record>, fetched_at: DateTime<Utc>) {
        let mut deduped: Vec<Record> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            match record.id() {
                Some(id) => match positions.get(&id) {
                    Some(&index) => deduped[index] = record,
                    None => {
                        positions.insert(id, deduped.len());
                        deduped.push(record);
                    }
                },
                None => deduped.push(record),
            }
        }

        let entry = self.entries.entry(kind).or_default();
        entry.records = deduped;
        entry.last_fetched = Some(fetched_at);
    }

    pub async fn ensure_at<S: ResourceSource + ?Sized>(
        &mut self,
        kind: EntityKind,
        source: &S,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<&[Record]> {
        if force || self.needs_refresh(kind, now) {
            tracing::debug!("Refreshing {} (forced: {})", kind, force);
            let records = source.fetch_all(kind).await?;
            tracing::info!("Cached {} {} records", records.len(), kind);
            self.store(kind, records, now);
        } else {
            tracing::debug!("Serving {} from cache", kind);
        }
        Ok(self.records(kind))
    }

    pub async fn ensure<S: ResourceSource + ?Sized>(
        &mut self,
        kind: EntityKind,
        source: &S,
        force: bool,
    ) -> Result<&[Record]> {
        self.ensure_at(kind, source, force, Utc::now()).await
    }

    /// Refreshes several kinds in sequence; the first failure aborts.
    pub async fn ensure_many<S: ResourceSource + ?Sized>(
        &mut self,
        kinds: &[EntityKind],
        source: &S,
        force: bool,
    ) -> Result<()> {
        for kind in kinds {
            self.ensure(*kind, source, force).await?;
        }
        Ok(())
    }

    /// Applies a create/update response without refetching the collection.
    pub fn upsert(&mut self, kind: EntityKind, record: Record) {
        let entry = self.entries.entry(kind).or_default();
        let id = record.id();
        let existing = id
            .as_ref()
            .and_then(|id| entry.records.iter().position(|r| r.id().as_ref() == Some(id)));
        match existing {
            Some(index) => entry.records[index] = record,
            None => entry.records.push(record),
        }
    }

    pub fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        let Some(entry) = self.entries.get_mut(&kind) else {
            return false;
        };
        let before = entry.records.len();
        entry.records.retain(|r| r.id().as_deref() != Some(id));
        entry.records.len() != before
    }

    pub fn find(&self, kind: EntityKind, id: &str) -> Option<&Record> {
        self.records(kind)
            .iter()
            .find(|record| record.id().as_deref() == Some(id))
    }

    /// Marks a kind stale so the next `ensure` refetches it.
    pub fn invalidate(&mut self, kind: EntityKind) {
        if let Some(entry) = self.entries.get_mut(&kind) {
            entry.last_fetched = None;
        }
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> Vec<CacheSummary> {
        EntityKind::ALL
            .iter()
            .map(|kind| CacheSummary {
                kind: *kind,
                count: self.records(*kind).len(),
                last_fetched: self.last_fetched(*kind),
                stale: self.needs_refresh(*kind, now),
            })
            .collect()
    }

    pub fn summary(&self) -> Vec<CacheSummary> {
        self.summary_at(Utc::now())
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new(Duration::minutes(crate::config::DEFAULT_CACHE_MINUTES))
    }
}
