use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuditError;
use crate::record::{AuditFilter, AuditPage};

/// Read/delete access to one trigger-populated audit table.
///
/// Implementations must be `Send + Sync` to be shared across async tasks,
/// and must honor two contracts shared by every backend:
///
/// - Filter predicates are conjunctive and applied in the fixed order of
///   [`AuditFilter::matches`]: entity, time-from, time-to, action, search,
///   only-changed. A query either applies all of them or fails whole.
/// - Pages are ordered by `event_time` descending with `event_id` descending
///   as the tiebreak, so repeated queries slice the log identically and
///   adjacent pages never overlap or gap.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Return one page of matching records plus the total match count.
    ///
    /// Page bounds outside `[1, MAX_PAGE_SIZE]` are clamped, never rejected;
    /// backend failures propagate unchanged.
    async fn query(&self, filter: &AuditFilter) -> Result<AuditPage, AuditError>;

    /// Bulk-delete records by event id. Returns the number of rows removed,
    /// which may be less than `event_ids.len()` when some rows are already
    /// gone.
    async fn delete(&self, event_ids: &[i64]) -> Result<u64, AuditError>;

    /// Remove all records older than the cutoff. Returns the number of rows
    /// removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError>;
}
