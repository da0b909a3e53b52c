use sqlx::PgPool;

use dromhub_audit::entity::EntityKind;

/// Run the audit table migration for one entity kind, creating the table and
/// indexes if they do not already exist.
///
/// Only the audit table itself is created here; the trigger that populates
/// it lives on the entity table and is installed with the application schema.
pub async fn run_migrations(pool: &PgPool, prefix: &str, kind: EntityKind) -> Result<(), sqlx::Error> {
    let suffix = kind.table_suffix();
    let table = format!("{prefix}{suffix}");

    let create_table = format!(
        "
        CREATE TABLE IF NOT EXISTS {table} (
            event_id        BIGSERIAL PRIMARY KEY,
            entity_id       UUID,
            action          TEXT NOT NULL,
            changed_columns TEXT[] NOT NULL DEFAULT '{{}}',
            old_data        JSONB,
            new_data        JSONB,
            old_text        TEXT,
            new_text        TEXT,
            actor           TEXT,
            event_time      TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "
    );

    sqlx::query(&create_table).execute(pool).await?;

    let indexes = [
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}{suffix}_entity_time ON {table} (entity_id, event_time DESC, event_id DESC)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}{suffix}_time ON {table} (event_time DESC, event_id DESC)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}{suffix}_action ON {table} (action, event_time DESC)"
        ),
    ];

    for idx in &indexes {
        sqlx::query(idx).execute(pool).await?;
    }

    Ok(())
}
