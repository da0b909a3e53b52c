use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use dromhub_audit::entity::EntityKind;
use dromhub_audit::error::AuditError;
use dromhub_audit::record::{AuditFilter, AuditPage, AuditRecord};
use dromhub_audit::store::AuditStore;

use crate::config::PostgresAuditConfig;
use crate::migrations;

/// Postgres-backed audit store using `sqlx`.
///
/// One instance reads exactly one trigger-populated table; create separate
/// instances for the brand and part logs.
pub struct PostgresAuditStore {
    pool: PgPool,
    table: String,
}

impl PostgresAuditStore {
    /// Create a new store for one entity kind, connecting to Postgres and
    /// running migrations.
    pub async fn new(config: &PostgresAuditConfig, kind: EntityKind) -> Result<Self, AuditError> {
        let pool = PgPool::connect(&config.url)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        migrations::run_migrations(&pool, &config.prefix, kind)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        Ok(Self {
            pool,
            table: format!("{}{}", config.prefix, kind.table_suffix()),
        })
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: PgPool, prefix: &str, kind: EntityKind) -> Result<Self, AuditError> {
        migrations::run_migrations(&pool, prefix, kind)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        Ok(Self {
            pool,
            table: format!("{prefix}{}", kind.table_suffix()),
        })
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn query(&self, filter: &AuditFilter) -> Result<AuditPage, AuditError> {
        let page_size = filter.effective_page_size();
        let search_pattern = filter
            .effective_search()
            .map(|term| format!("%{}%", escape_like(term)));
        let (where_clause, next_idx) = build_where_clause(filter);

        // Count query.
        let count_sql = format!("SELECT COUNT(*) FROM {} {where_clause}", self.table);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(entity_id) = filter.entity_id {
            count_q = count_q.bind(entity_id);
        }
        if let Some(from) = filter.time_from {
            count_q = count_q.bind(from);
        }
        if let Some(to) = filter.time_to {
            count_q = count_q.bind(to);
        }
        if let Some(code) = filter.action.code() {
            count_q = count_q.bind(code);
        }
        if let Some(ref pattern) = search_pattern {
            count_q = count_q.bind(pattern);
        }

        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        // Data query.
        let limit_idx = next_idx;
        let offset_idx = next_idx + 1;
        let data_sql = format!(
            "SELECT * FROM {} {where_clause} ORDER BY event_time DESC, event_id DESC \
             LIMIT ${limit_idx} OFFSET ${offset_idx}",
            self.table
        );

        let mut data_q = sqlx::query_as::<_, AuditRow>(&data_sql);
        if let Some(entity_id) = filter.entity_id {
            data_q = data_q.bind(entity_id);
        }
        if let Some(from) = filter.time_from {
            data_q = data_q.bind(from);
        }
        if let Some(to) = filter.time_to {
            data_q = data_q.bind(to);
        }
        if let Some(code) = filter.action.code() {
            data_q = data_q.bind(code);
        }
        if let Some(ref pattern) = search_pattern {
            data_q = data_q.bind(pattern);
        }
        data_q = data_q.bind(i64::from(page_size));
        #[allow(clippy::cast_possible_wrap)]
        let offset = filter.effective_offset() as i64;
        data_q = data_q.bind(offset);

        let rows: Vec<AuditRow> = data_q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        let records = rows.into_iter().map(Into::into).collect();

        #[allow(clippy::cast_sign_loss)]
        let total = total as u64;

        Ok(AuditPage {
            records,
            total,
            page_index: filter.page_index,
            page_size,
        })
    }

    async fn delete(&self, event_ids: &[i64]) -> Result<u64, AuditError> {
        if event_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!("DELETE FROM {} WHERE event_id = ANY($1)", self.table);
        let result = sqlx::query(&sql)
            .bind(event_ids)
            .execute(&self.pool)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        let sql = format!("DELETE FROM {} WHERE event_time < $1", self.table);
        let result = sqlx::query(&sql)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| AuditError::Storage(e.to_string()))?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::info!(removed, table = %self.table, "purged audit records");
        }
        Ok(removed)
    }
}

/// Build the WHERE clause for the filter, with predicates in the fixed
/// order shared by every backend. Returns the clause and the next free
/// placeholder index.
fn build_where_clause(filter: &AuditFilter) -> (String, u32) {
    let mut conditions = Vec::new();
    let mut idx = 1u32;

    if filter.entity_id.is_some() {
        conditions.push(format!("entity_id = ${idx}"));
        idx += 1;
    }
    if filter.time_from.is_some() {
        conditions.push(format!("event_time >= ${idx}"));
        idx += 1;
    }
    if filter.time_to.is_some() {
        conditions.push(format!("event_time <= ${idx}"));
        idx += 1;
    }
    if filter.action.code().is_some() {
        conditions.push(format!("action = ${idx}"));
        idx += 1;
    }
    if filter.effective_search().is_some() {
        conditions.push(format!("(old_text ILIKE ${idx} OR new_text ILIKE ${idx})"));
        idx += 1;
    }
    if filter.only_changed {
        conditions.push("(action = 'U' AND cardinality(changed_columns) > 0)".to_owned());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, idx)
}

/// Escape `LIKE` metacharacters in a user-supplied search term.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Internal row type for mapping database rows to `AuditRecord`.
#[derive(sqlx::FromRow)]
struct AuditRow {
    event_id: i64,
    entity_id: Option<Uuid>,
    action: String,
    changed_columns: Vec<String>,
    old_data: Option<serde_json::Value>,
    new_data: Option<serde_json::Value>,
    old_text: Option<String>,
    new_text: Option<String>,
    actor: Option<String>,
    event_time: DateTime<Utc>,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        Self {
            event_id: row.event_id,
            entity_id: row.entity_id,
            action: row.action,
            changed_columns: row.changed_columns,
            old_data: row.old_data,
            new_data: row.new_data,
            old_text: row.old_text,
            new_text: row.new_text,
            actor: row.actor,
            event_time: row.event_time,
        }
    }
}
