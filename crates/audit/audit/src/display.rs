use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::action::AuditAction;
use crate::record::AuditRecord;

/// Placeholder shown for absent display values.
pub const EMPTY_VALUE: &str = "—";

/// Short date-time format used for the event-time label.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A display-ready projection of one [`AuditRecord`].
///
/// Total mapping: every record projects to a row; an unknown action code
/// yields an empty label rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRowView {
    /// Identifier of the underlying audit event, used for selection and
    /// deletion.
    pub event_id: i64,
    /// Identifier of the affected entity, when the event is tied to one.
    pub entity_id: Option<Uuid>,
    /// Action label (`I`, `U`, `D`, or empty for unknown codes).
    pub action_label: &'static str,
    /// Raw event time, retained for re-sorting.
    pub event_time: DateTime<Utc>,
    /// Short formatted event time for display.
    pub event_time_label: String,
    /// Comma-joined changed column names, or a placeholder when none.
    pub changed_columns_label: String,
    /// The actor, or a placeholder when absent or blank.
    pub actor_label: String,
    /// Opaque before-snapshot for on-demand detail display.
    pub old_data: Option<serde_json::Value>,
    /// Opaque after-snapshot for on-demand detail display.
    pub new_data: Option<serde_json::Value>,
    /// Selection flag maintained by the owning view-state.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl From<AuditRecord> for AuditRowView {
    fn from(record: AuditRecord) -> Self {
        let action_label = AuditAction::from_code(&record.action).map_or("", AuditAction::code);

        let changed_columns_label = if record.changed_columns.is_empty() {
            EMPTY_VALUE.to_owned()
        } else {
            record.changed_columns.join(", ")
        };

        let actor_label = match record.actor.as_deref().map(str::trim) {
            Some(actor) if !actor.is_empty() => actor.to_owned(),
            _ => EMPTY_VALUE.to_owned(),
        };

        Self {
            event_id: record.event_id,
            entity_id: record.entity_id,
            action_label,
            event_time_label: record.event_time.format(TIME_FORMAT).to_string(),
            event_time: record.event_time,
            changed_columns_label,
            actor_label,
            old_data: record.old_data,
            new_data: record.new_data,
            selected: false,
        }
    }
}
