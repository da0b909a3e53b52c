use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use dromhub_audit::action::ActionFilter;
use dromhub_audit::display::AuditRowView;
use dromhub_audit::record::AuditFilter;
use dromhub_audit::store::AuditStore;
use dromhub_audit_postgres::PostgresAuditStore;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Query the audit log.
    Query {
        /// Restrict to one entity's history.
        #[arg(long)]
        entity_id: Option<Uuid>,
        /// Only events at or after this time (RFC 3339).
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Only events at or before this time (RFC 3339).
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Restrict to one action kind.
        #[arg(long, value_enum)]
        action: Option<ActionArg>,
        /// Case-insensitive substring to search for.
        #[arg(long)]
        search: Option<String>,
        /// Only updates that changed at least one column.
        #[arg(long)]
        only_changed: bool,
        /// Zero-based page index.
        #[arg(long, default_value = "0")]
        page: u32,
        /// Rows per page (clamped to 1..=200).
        #[arg(long, default_value = "25")]
        page_size: u32,
    },
    /// Delete audit records by event id.
    Delete {
        /// Event ids to remove.
        #[arg(required = true)]
        event_ids: Vec<i64>,
    },
    /// Purge audit records older than a cutoff.
    Purge {
        /// Cutoff time (RFC 3339); records strictly older are removed.
        #[arg(long)]
        before: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActionArg {
    Insert,
    Update,
    Delete,
}

impl From<ActionArg> for ActionFilter {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Insert => Self::Insert,
            ActionArg::Update => Self::Update,
            ActionArg::Delete => Self::Delete,
        }
    }
}

pub async fn run(
    store: &PostgresAuditStore,
    args: &AuditArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match &args.command {
        AuditCommand::Query {
            entity_id,
            from,
            to,
            action,
            search,
            only_changed,
            page,
            page_size,
        } => {
            let filter = AuditFilter {
                entity_id: *entity_id,
                time_from: *from,
                time_to: *to,
                action: action.map_or(ActionFilter::All, Into::into),
                search: search.clone(),
                only_changed: *only_changed,
                page_index: *page,
                page_size: *page_size,
            };
            run_query(store, &filter, format).await
        }
        AuditCommand::Delete { event_ids } => run_delete(store, event_ids, format).await,
        AuditCommand::Purge { before } => run_purge(store, *before, format).await,
    }
}

async fn run_query(
    store: &PostgresAuditStore,
    filter: &AuditFilter,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let page = store.query(filter).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        OutputFormat::Text => {
            println!(
                "Total: {} records (page {}, showing {})",
                page.total,
                page.page_index,
                page.records.len()
            );
            for record in page.records {
                let row = AuditRowView::from(record);
                let entity = row
                    .entity_id
                    .map_or_else(|| "-".to_owned(), |id| id.to_string());
                println!(
                    "  [{time}] {action} {entity} | {columns} | {actor} [{id}]",
                    time = row.event_time_label,
                    action = if row.action_label.is_empty() {
                        "?"
                    } else {
                        row.action_label
                    },
                    columns = row.changed_columns_label,
                    actor = row.actor_label,
                    id = row.event_id,
                );
            }
        }
    }
    Ok(())
}

async fn run_delete(
    store: &PostgresAuditStore,
    event_ids: &[i64],
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let removed = store.delete(event_ids).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "removed": removed }));
        }
        OutputFormat::Text => {
            println!("Removed {removed} of {} requested records", event_ids.len());
        }
    }
    Ok(())
}

async fn run_purge(
    store: &PostgresAuditStore,
    before: DateTime<Utc>,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let removed = store.purge_before(before).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "removed": removed }));
        }
        OutputFormat::Text => {
            println!("Purged {removed} records older than {before}");
        }
    }
    Ok(())
}
