use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use dromhub_audit::action::ActionFilter;
use dromhub_audit::display::AuditRowView;
use dromhub_audit::error::AuditError;
use dromhub_audit::record::AuditFilter;
use dromhub_audit::store::AuditStore;

use crate::error::ViewError;
use crate::observer::{Observers, SubscriptionId, ViewEvent};
use crate::state::{LoadState, Phase};

/// Message shown after an in-flight load was cancelled. Dropped by the next
/// successful reload.
const CANCELLED_MESSAGE: &str = "load cancelled";

/// Paged view-state over one entity's audit history.
///
/// One instance backs one open history screen and is owned by a single UI
/// dispatch context; the store query is the only suspension point, and the
/// internal lock is never held across it. Mutations that arrive while a
/// load is in flight are coalesced into a single follow-up reload that uses
/// the latest filter values (see [`LoadState`]).
pub struct AuditLogView {
    store: Arc<dyn AuditStore>,
    inner: Mutex<ViewInner>,
    observers: Mutex<Observers>,
}

struct ViewInner {
    filter: AuditFilter,
    rows: Vec<AuditRowView>,
    total: u64,
    range_label: String,
    load: LoadState,
    error_message: Option<String>,
    status_message: Option<String>,
}

impl ViewInner {
    fn new() -> Self {
        let mut inner = Self {
            filter: AuditFilter::default(),
            rows: Vec::new(),
            total: 0,
            range_label: String::new(),
            load: LoadState::default(),
            error_message: None,
            status_message: None,
        };
        inner.recompute_range_label();
        inner
    }

    fn recompute_range_label(&mut self) {
        if self.rows.is_empty() {
            self.range_label = format!("showing 0 of {}", self.total);
        } else {
            let size = u64::from(self.filter.effective_page_size());
            let first = u64::from(self.filter.page_index) * size + 1;
            let last = first + self.rows.len() as u64 - 1;
            self.range_label = format!("showing {first}–{last} of {}", self.total);
        }
    }

    fn clear_selection(&mut self) {
        for row in &mut self.rows {
            row.selected = false;
        }
    }
}

impl AuditLogView {
    /// Create a view over the given store with default filter values and no
    /// rows loaded.
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(ViewInner::new()),
            observers: Mutex::new(Observers::default()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, ViewInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Observable surface
    // -----------------------------------------------------------------------

    /// Register an observer. Observers are notified synchronously, in
    /// subscription order, after each state change is committed.
    pub fn subscribe(&self, callback: impl Fn(&ViewEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(Arc::new(callback))
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(id);
    }

    fn emit(&self, event: ViewEvent) {
        let callbacks = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for callback in callbacks {
            callback(&event);
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner().load.phase()
    }

    /// The current page of display rows.
    pub fn rows(&self) -> Vec<AuditRowView> {
        self.inner().rows.clone()
    }

    /// Total matches for the current filter, ignoring pagination.
    pub fn total(&self) -> u64 {
        self.inner().total
    }

    pub fn page_index(&self) -> u32 {
        self.inner().filter.page_index
    }

    /// The derived "showing A–B of N" text.
    pub fn range_label(&self) -> String {
        self.inner().range_label.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner().error_message.clone()
    }

    pub fn status_message(&self) -> Option<String> {
        self.inner().status_message.clone()
    }

    /// Snapshot of the current filter values.
    pub fn filter(&self) -> AuditFilter {
        self.inner().filter.clone()
    }

    pub fn entity_id(&self) -> Option<Uuid> {
        self.inner().filter.entity_id
    }

    pub fn has_selection(&self) -> bool {
        self.inner().rows.iter().any(|row| row.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.inner().rows.iter().filter(|row| row.selected).count()
    }

    pub fn can_next_page(&self) -> bool {
        let inner = self.inner();
        let size = u64::from(inner.filter.effective_page_size());
        (u64::from(inner.filter.page_index) + 1) * size < inner.total
    }

    pub fn can_prev_page(&self) -> bool {
        self.inner().filter.page_index > 0
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Point the view at an entity and load its first page.
    ///
    /// The nil UUID stands for "no entity" and is rejected before anything
    /// reaches the store.
    pub async fn initialize(&self, entity_id: Uuid) -> Result<(), ViewError> {
        if entity_id.is_nil() {
            return Err(ViewError::MissingEntity);
        }
        {
            let mut inner = self.inner();
            inner.filter.entity_id = Some(entity_id);
            inner.filter.page_index = 0;
        }
        self.emit(ViewEvent::FilterChanged);
        self.reload().await;
        Ok(())
    }

    /// Apply a filter mutation: reset to the first page and reload when the
    /// closure reports an actual change.
    async fn update_filter(&self, apply: impl FnOnce(&mut AuditFilter) -> bool) {
        let changed = {
            let mut inner = self.inner();
            let changed = apply(&mut inner.filter);
            if changed {
                inner.filter.page_index = 0;
            }
            changed
        };
        if changed {
            self.emit(ViewEvent::FilterChanged);
            self.reload().await;
        }
    }

    pub async fn set_time_from(&self, value: Option<DateTime<Utc>>) {
        self.update_filter(|filter| {
            if filter.time_from == value {
                return false;
            }
            filter.time_from = value;
            true
        })
        .await;
    }

    pub async fn set_time_to(&self, value: Option<DateTime<Utc>>) {
        self.update_filter(|filter| {
            if filter.time_to == value {
                return false;
            }
            filter.time_to = value;
            true
        })
        .await;
    }

    pub async fn set_action(&self, action: ActionFilter) {
        self.update_filter(|filter| {
            if filter.action == action {
                return false;
            }
            filter.action = action;
            true
        })
        .await;
    }

    /// Set the search text. Blank input clears the predicate.
    pub async fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        let value = if text.trim().is_empty() { None } else { Some(text) };
        self.update_filter(|filter| {
            if filter.search == value {
                return false;
            }
            filter.search = value;
            true
        })
        .await;
    }

    pub async fn set_only_changed(&self, flag: bool) {
        self.update_filter(|filter| {
            if filter.only_changed == flag {
                return false;
            }
            filter.only_changed = flag;
            true
        })
        .await;
    }

    pub async fn set_page_size(&self, size: u32) {
        self.update_filter(|filter| {
            if filter.page_size == size {
                return false;
            }
            filter.page_size = size;
            true
        })
        .await;
    }

    /// Advance one page. No-op when the current page is the last one.
    pub async fn next_page(&self) {
        {
            let mut inner = self.inner();
            let size = u64::from(inner.filter.effective_page_size());
            if (u64::from(inner.filter.page_index) + 1) * size >= inner.total {
                return;
            }
            inner.filter.page_index += 1;
        }
        self.emit(ViewEvent::PaginationChanged);
        self.reload().await;
    }

    /// Go back one page. No-op on the first page.
    pub async fn prev_page(&self) {
        {
            let mut inner = self.inner();
            if inner.filter.page_index == 0 {
                return;
            }
            inner.filter.page_index -= 1;
        }
        self.emit(ViewEvent::PaginationChanged);
        self.reload().await;
    }

    /// Reset every filter field to its default, keeping the entity id, then
    /// reload exactly once.
    pub async fn clear_filters(&self) {
        {
            let mut inner = self.inner();
            let entity_id = inner.filter.entity_id;
            inner.filter = AuditFilter {
                entity_id,
                ..AuditFilter::default()
            };
        }
        self.emit(ViewEvent::FilterChanged);
        self.reload().await;
    }

    /// Select every row on the current page. No-op when the page is empty
    /// or everything is already selected.
    pub fn select_all(&self) {
        let changed = {
            let mut inner = self.inner();
            let mut changed = false;
            for row in &mut inner.rows {
                if !row.selected {
                    row.selected = true;
                    changed = true;
                }
            }
            changed
        };
        if changed {
            self.emit(ViewEvent::SelectionChanged);
        }
    }

    /// Flip one row's selection flag. Unknown event ids are ignored.
    pub fn toggle_selected(&self, event_id: i64) {
        let changed = {
            let mut inner = self.inner();
            match inner.rows.iter_mut().find(|row| row.event_id == event_id) {
                Some(row) => {
                    row.selected = !row.selected;
                    true
                }
                None => false,
            }
        };
        if changed {
            self.emit(ViewEvent::SelectionChanged);
        }
    }

    /// Delete the selected rows from the store.
    ///
    /// With rows actually removed the selection is cleared and the current
    /// page reloads; with nothing removed only the selection flags are
    /// cleared; on failure the selection is left intact for a retry and the
    /// error is surfaced like a query failure.
    pub async fn delete_selected(&self) {
        let ids: Vec<i64> = {
            self.inner()
                .rows
                .iter()
                .filter(|row| row.selected)
                .map(|row| row.event_id)
                .collect()
        };
        if ids.is_empty() {
            return;
        }

        match self.store.delete(&ids).await {
            Ok(0) => {
                self.inner().clear_selection();
                self.emit(ViewEvent::SelectionChanged);
            }
            Ok(_) => {
                self.inner().clear_selection();
                self.emit(ViewEvent::SelectionChanged);
                self.reload().await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "audit delete failed");
                {
                    let mut inner = self.inner();
                    inner.error_message = Some(error.to_string());
                    inner.load.fail();
                }
                self.emit(ViewEvent::MessageChanged);
                self.emit(ViewEvent::Phase(Phase::Error));
            }
        }
    }

    /// Return to a cleared idle state with a placeholder message, without
    /// touching the store. Used when navigating away or when no entity id
    /// is available. Idempotent.
    pub fn reset(&self, message: impl Into<String>) {
        {
            let mut inner = self.inner();
            inner.filter = AuditFilter::default();
            inner.rows.clear();
            inner.total = 0;
            inner.load.reset();
            inner.error_message = None;
            inner.status_message = Some(message.into());
            inner.recompute_range_label();
        }
        for event in [
            ViewEvent::FilterChanged,
            ViewEvent::RowsReset,
            ViewEvent::PaginationChanged,
            ViewEvent::MessageChanged,
            ViewEvent::Phase(Phase::Idle),
        ] {
            self.emit(event);
        }
    }

    /// Run the store query for the current filter and replace the row
    /// collection with the result.
    ///
    /// While a load is in flight further calls return immediately and are
    /// merged into one follow-up that re-reads the filter, so the latest
    /// values win however many mutations arrived in between.
    pub async fn reload(&self) {
        if !self.inner().load.begin() {
            return;
        }
        self.emit(ViewEvent::Phase(Phase::Loading));

        loop {
            let filter = self.inner().filter.clone();
            match self.store.query(&filter).await {
                Ok(page) => {
                    let follow_up = {
                        let mut inner = self.inner();
                        inner.total = page.total;
                        inner.rows = page.records.into_iter().map(AuditRowView::from).collect();
                        inner.error_message = None;
                        inner.status_message = None;
                        inner.recompute_range_label();
                        inner.load.finish_success()
                    };
                    self.emit(ViewEvent::RowsReset);
                    self.emit(ViewEvent::PaginationChanged);
                    self.emit(ViewEvent::MessageChanged);
                    if follow_up {
                        continue;
                    }
                    self.emit(ViewEvent::Phase(Phase::Idle));
                    return;
                }
                Err(AuditError::Cancelled) => {
                    {
                        let mut inner = self.inner();
                        inner.rows.clear();
                        inner.total = 0;
                        inner.status_message = Some(CANCELLED_MESSAGE.to_owned());
                        inner.recompute_range_label();
                        inner.load.finish_cancelled();
                    }
                    self.emit(ViewEvent::RowsReset);
                    self.emit(ViewEvent::PaginationChanged);
                    self.emit(ViewEvent::MessageChanged);
                    self.emit(ViewEvent::Phase(Phase::Idle));
                    return;
                }
                Err(error) => {
                    tracing::warn!(error = %error, "audit reload failed");
                    {
                        // Previous rows stay in place so the last good page
                        // remains visible next to the error banner.
                        let mut inner = self.inner();
                        inner.error_message = Some(error.to_string());
                        inner.load.fail();
                    }
                    self.emit(ViewEvent::MessageChanged);
                    self.emit(ViewEvent::Phase(Phase::Error));
                    return;
                }
            }
        }
    }
}
