use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use dromhub_audit::error::AuditError;
use dromhub_audit::record::{AuditFilter, AuditPage, AuditRecord};
use dromhub_audit::store::AuditStore;

/// In-memory audit store using `DashMap`. Suitable for development and
/// testing; production rows are written by database triggers into the
/// PostgreSQL backend instead.
///
/// Records are keyed by event id. One instance corresponds to one audit
/// table, so separate brand and part logs use separate instances.
pub struct MemoryAuditStore {
    records: DashMap<i64, AuditRecord>,
}

impl MemoryAuditStore {
    /// Create a new empty in-memory audit store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Append a record, standing in for the trigger that writes rows in
    /// production. An existing record with the same event id is replaced.
    pub fn append(&self, record: AuditRecord) {
        self.records.insert(record.event_id, record);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn query(&self, filter: &AuditFilter) -> Result<AuditPage, AuditError> {
        let page_size = filter.effective_page_size();

        let mut matching: Vec<AuditRecord> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; event id breaks ties so page boundaries are stable.
        matching.sort_by(|a, b| {
            b.event_time
                .cmp(&a.event_time)
                .then(b.event_id.cmp(&a.event_id))
        });

        let total = matching.len() as u64;
        #[allow(clippy::cast_possible_truncation)]
        let offset = filter.effective_offset() as usize;
        let records: Vec<AuditRecord> = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(AuditPage {
            records,
            total,
            page_index: filter.page_index,
            page_size,
        })
    }

    async fn delete(&self, event_ids: &[i64]) -> Result<u64, AuditError> {
        let mut removed = 0u64;
        for id in event_ids {
            if self.records.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        // Collect ids first; DashMap cannot be mutated while iterating.
        let expired: Vec<i64> = self
            .records
            .iter()
            .filter(|entry| entry.value().event_time < cutoff)
            .map(|entry| entry.value().event_id)
            .collect();

        let mut removed = 0u64;
        for id in expired {
            if self.records.remove(&id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use dromhub_audit::action::ActionFilter;
    use dromhub_audit::record::{AuditFilter, AuditRecord};
    use dromhub_audit::store::AuditStore;

    use super::MemoryAuditStore;

    fn make_record(event_id: i64, entity_id: Uuid, action: &str) -> AuditRecord {
        AuditRecord {
            event_id,
            entity_id: Some(entity_id),
            action: action.to_owned(),
            changed_columns: if action == "U" {
                vec!["name".to_owned()]
            } else {
                Vec::new()
            },
            old_data: None,
            new_data: None,
            old_text: Some(format!("old text {event_id}")),
            new_text: Some(format!("new text {event_id}")),
            actor: Some("dromhub".to_owned()),
            event_time: Utc::now() + Duration::seconds(event_id),
        }
    }

    fn seeded(count: i64, entity_id: Uuid) -> MemoryAuditStore {
        let store = MemoryAuditStore::new();
        for i in 1..=count {
            store.append(make_record(i, entity_id, "U"));
        }
        store
    }

    #[tokio::test]
    async fn unfiltered_query_returns_everything_newest_first() {
        let entity = Uuid::new_v4();
        let store = seeded(5, entity);

        let page = store.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(page.total, 5);
        let ids: Vec<i64> = page.records.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn entity_filter_restricts_rows() {
        let entity = Uuid::new_v4();
        let other = Uuid::new_v4();
        let store = MemoryAuditStore::new();
        store.append(make_record(1, entity, "I"));
        store.append(make_record(2, other, "I"));

        let page = store.query(&AuditFilter::for_entity(entity)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].entity_id, Some(entity));
    }

    #[tokio::test]
    async fn only_changed_update_scenario() {
        // 3 inserts and 2 updates, one update with no changed columns.
        let entity = Uuid::new_v4();
        let store = MemoryAuditStore::new();
        for i in 1..=3 {
            store.append(make_record(i, entity, "I"));
        }
        store.append(make_record(4, entity, "U"));
        let mut empty_update = make_record(5, entity, "U");
        empty_update.changed_columns.clear();
        store.append(empty_update);

        let mut filter = AuditFilter::for_entity(entity);
        filter.action = ActionFilter::Update;
        filter.only_changed = true;

        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].event_id, 4);
    }

    #[tokio::test]
    async fn thirty_rows_paginate_as_25_plus_5() {
        let entity = Uuid::new_v4();
        let store = seeded(30, entity);

        let mut filter = AuditFilter::for_entity(entity);
        let first = store.query(&filter).await.unwrap();
        assert_eq!(first.total, 30);
        assert_eq!(first.records.len(), 25);

        filter.page_index = 1;
        let second = store.query(&filter).await.unwrap();
        assert_eq!(second.total, 30);
        assert_eq!(second.records.len(), 5);
        // Pagination must not mutate the denominator.
        assert_eq!(first.total, second.total);
    }

    #[tokio::test]
    async fn pages_concatenate_without_overlap_or_gap() {
        let entity = Uuid::new_v4();
        let store = MemoryAuditStore::new();
        // All records share one timestamp so ordering rests on the tiebreak.
        let now = Utc::now();
        for i in 1..=10 {
            let mut rec = make_record(i, entity, "U");
            rec.event_time = now;
            store.append(rec);
        }

        let mut filter = AuditFilter::for_entity(entity);
        filter.page_size = 3;

        let mut seen = Vec::new();
        for page_index in 0..4 {
            filter.page_index = page_index;
            let page = store.query(&filter).await.unwrap();
            seen.extend(page.records.iter().map(|r| r.event_id));
        }

        assert_eq!(seen, vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn out_of_range_page_size_is_clamped() {
        let entity = Uuid::new_v4();
        let store = seeded(3, entity);

        let mut filter = AuditFilter::for_entity(entity);
        filter.page_size = 0;
        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.page_size, 1);

        filter.page_size = 5_000;
        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.page_size, 200);
    }

    #[tokio::test]
    async fn search_matches_old_and_new_text() {
        let entity = Uuid::new_v4();
        let store = seeded(3, entity);

        let mut filter = AuditFilter::for_entity(entity);
        filter.search = Some("OLD TEXT 2".to_owned());
        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].event_id, 2);
    }

    #[tokio::test]
    async fn time_range_filters_inclusively() {
        let entity = Uuid::new_v4();
        let store = seeded(5, entity);
        let third = store.records.get(&3).unwrap().event_time;

        let mut filter = AuditFilter::for_entity(entity);
        filter.time_from = Some(third);
        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.total, 3);

        filter.time_to = Some(third);
        let page = store.query(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].event_id, 3);
    }

    #[tokio::test]
    async fn delete_removes_and_reports_count() {
        let entity = Uuid::new_v4();
        let store = seeded(4, entity);

        let removed = store.delete(&[1, 3, 99]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);

        let removed = store.delete(&[1]).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn purge_before_drops_older_records() {
        let entity = Uuid::new_v4();
        let store = seeded(5, entity);
        let cutoff = store.records.get(&4).unwrap().event_time;

        let removed = store.purge_before(cutoff).await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.len(), 2);
        assert!(store.records.contains_key(&4));
        assert!(store.records.contains_key(&5));
    }
}
