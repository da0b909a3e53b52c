use std::sync::Arc;

use crate::state::Phase;

/// State-change notifications emitted by [`crate::AuditLogView`].
///
/// Subscribers are notified synchronously, in subscription order, after the
/// new state has been committed: a callback reading the view always sees
/// the value the event announces, never a torn update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// The lifecycle phase changed.
    Phase(Phase),
    /// One or more filter fields changed.
    FilterChanged,
    /// The row collection was replaced wholesale (there are no incremental
    /// row updates).
    RowsReset,
    /// Page index, total count, or the range label changed.
    PaginationChanged,
    /// Row selection flags changed.
    SelectionChanged,
    /// The error or status message changed.
    MessageChanged,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&ViewEvent) + Send + Sync>;

/// Registry of view observers, notified in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, callback));
        SubscriptionId(id)
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id.0);
    }

    /// Snapshot the callbacks so they can be invoked without holding the
    /// registry lock; a callback may then subscribe or unsubscribe freely.
    pub(crate) fn snapshot(&self) -> Vec<Callback> {
        self.entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}
