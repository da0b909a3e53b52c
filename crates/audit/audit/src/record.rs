use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionFilter;

/// Default number of rows per page when a filter does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Upper bound on the page size; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: u32 = 200;

/// A single audit record written by a row trigger on a tracked entity table.
///
/// Records are append-only: the trigger inserts them and this component only
/// ever reads or bulk-deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier of the audit event (table primary key).
    pub event_id: i64,

    /// Identifier of the affected entity; `None` for operations not tied to
    /// a single row.
    pub entity_id: Option<Uuid>,

    /// Single-character action code as written by the trigger (`I`, `U`,
    /// `D`). Kept raw so an unknown code remains representable.
    pub action: String,

    /// Names of the columns that changed. Non-empty only for updates.
    pub changed_columns: Vec<String>,

    /// Snapshot of the row before the operation; absent for inserts.
    pub old_data: Option<serde_json::Value>,
    /// Snapshot of the row after the operation; absent for deletes.
    pub new_data: Option<serde_json::Value>,

    /// Flattened rendering of `old_data`, maintained by the store for
    /// substring search.
    pub old_text: Option<String>,
    /// Flattened rendering of `new_data`.
    pub new_text: Option<String>,

    /// Principal that made the change, when known.
    pub actor: Option<String>,

    /// When the event happened.
    pub event_time: DateTime<Utc>,
}

/// Filter describing one slice of the audit log.
///
/// Pure data holder; page bounds are advisory and enforced by the store via
/// [`AuditFilter::effective_page_size`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Restrict to one entity's history.
    pub entity_id: Option<Uuid>,
    /// Only events at or after this time.
    pub time_from: Option<DateTime<Utc>>,
    /// Only events at or before this time.
    pub time_to: Option<DateTime<Utc>>,
    /// Restrict to one action kind.
    pub action: ActionFilter,
    /// Case-insensitive substring matched against the old/new text
    /// renderings. Blank strings disable the predicate.
    pub search: Option<String>,
    /// Restrict to updates that actually changed at least one column.
    pub only_changed: bool,
    /// Zero-based page index.
    pub page_index: u32,
    /// Requested rows per page; clamped to `[1, MAX_PAGE_SIZE]`.
    pub page_size: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            entity_id: None,
            time_from: None,
            time_to: None,
            action: ActionFilter::All,
            search: None,
            only_changed: false,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AuditFilter {
    /// An otherwise-default filter scoped to one entity.
    pub fn for_entity(entity_id: Uuid) -> Self {
        Self {
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }

    /// The page size actually used, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of rows skipped before the requested page.
    pub fn effective_offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.effective_page_size())
    }

    /// The search term with blank values normalized away.
    pub fn effective_search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether a record satisfies every set predicate.
    ///
    /// Predicates are conjunctive and applied in a fixed order shared by all
    /// store backends: entity, time-from, time-to, action, search,
    /// only-changed. Unset fields are skipped.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(entity_id) = self.entity_id
            && record.entity_id != Some(entity_id)
        {
            return false;
        }
        if let Some(from) = self.time_from
            && record.event_time < from
        {
            return false;
        }
        if let Some(to) = self.time_to
            && record.event_time > to
        {
            return false;
        }
        if let Some(code) = self.action.code()
            && record.action != code
        {
            return false;
        }
        if let Some(term) = self.effective_search() {
            let term = term.to_lowercase();
            let hit = [&record.old_text, &record.new_text]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if self.only_changed
            && (record.action != crate::action::AuditAction::Update.code()
                || record.changed_columns.is_empty())
        {
            return false;
        }
        true
    }
}

/// A paginated slice of the audit log, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    /// The records on this page.
    pub records: Vec<AuditRecord>,
    /// Total number of records matching the filter before pagination.
    pub total: u64,
    /// The page index used for this page.
    pub page_index: u32,
    /// The clamped page size used for this page.
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::action::ActionFilter;

    use super::{AuditFilter, AuditRecord, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

    fn make_record(event_id: i64) -> AuditRecord {
        AuditRecord {
            event_id,
            entity_id: Some(Uuid::new_v4()),
            action: "U".to_owned(),
            changed_columns: vec!["name".to_owned()],
            old_data: Some(serde_json::json!({"name": "Bosch"})),
            new_data: Some(serde_json::json!({"name": "BOSCH GmbH"})),
            old_text: Some("Bosch".to_owned()),
            new_text: Some("BOSCH GmbH".to_owned()),
            actor: Some("importer".to_owned()),
            event_time: Utc::now(),
        }
    }

    #[test]
    fn defaults() {
        let filter = AuditFilter::default();
        assert_eq!(filter.action, ActionFilter::All);
        assert_eq!(filter.page_index, 0);
        assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
        assert!(!filter.only_changed);
    }

    #[test]
    fn page_size_is_clamped_not_rejected() {
        let filter = AuditFilter {
            page_size: 0,
            ..AuditFilter::default()
        };
        assert_eq!(filter.effective_page_size(), 1);

        let filter = AuditFilter {
            page_size: 10_000,
            page_index: 3,
            ..AuditFilter::default()
        };
        assert_eq!(filter.effective_page_size(), MAX_PAGE_SIZE);
        assert_eq!(filter.effective_offset(), 3 * u64::from(MAX_PAGE_SIZE));
    }

    #[test]
    fn blank_search_is_disabled() {
        let filter = AuditFilter {
            search: Some("   ".to_owned()),
            ..AuditFilter::default()
        };
        assert_eq!(filter.effective_search(), None);
        assert!(filter.matches(&make_record(1)));
    }

    #[test]
    fn entity_predicate_excludes_unrelated_rows() {
        let record = make_record(1);
        let filter = AuditFilter::for_entity(Uuid::new_v4());
        assert!(!filter.matches(&record));

        let filter = AuditFilter::for_entity(record.entity_id.unwrap());
        assert!(filter.matches(&record));
    }

    #[test]
    fn entity_predicate_excludes_rows_without_entity() {
        let mut record = make_record(1);
        record.entity_id = None;
        let filter = AuditFilter::for_entity(Uuid::new_v4());
        assert!(!filter.matches(&record));
    }

    #[test]
    fn time_bounds_are_inclusive() {
        let record = make_record(1);
        let mut filter = AuditFilter {
            time_from: Some(record.event_time),
            time_to: Some(record.event_time),
            ..AuditFilter::default()
        };
        assert!(filter.matches(&record));

        filter.time_from = Some(record.event_time + Duration::seconds(1));
        assert!(!filter.matches(&record));
    }

    #[test]
    fn search_is_case_insensitive_over_both_texts() {
        let record = make_record(1);
        let mut filter = AuditFilter {
            search: Some("gmbh".to_owned()),
            ..AuditFilter::default()
        };
        assert!(filter.matches(&record));

        filter.search = Some("bosch".to_owned());
        assert!(filter.matches(&record));

        filter.search = Some("continental".to_owned());
        assert!(!filter.matches(&record));
    }

    #[test]
    fn only_changed_requires_update_with_columns() {
        let filter = AuditFilter {
            only_changed: true,
            ..AuditFilter::default()
        };

        let record = make_record(1);
        assert!(filter.matches(&record));

        let mut insert = make_record(2);
        insert.action = "I".to_owned();
        insert.changed_columns.clear();
        assert!(!filter.matches(&insert));

        let mut empty_update = make_record(3);
        empty_update.changed_columns.clear();
        assert!(!filter.matches(&empty_update));
    }

    #[test]
    fn action_predicate_matches_code() {
        let record = make_record(1);
        let mut filter = AuditFilter {
            action: ActionFilter::Update,
            ..AuditFilter::default()
        };
        assert!(filter.matches(&record));
        filter.action = ActionFilter::Delete;
        assert!(!filter.matches(&record));
    }
}
