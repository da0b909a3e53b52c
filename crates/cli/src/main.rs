//! DromHub audit CLI
//!
//! A command-line interface for querying and maintaining the DromHub
//! audit tables.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use dromhub_audit::EntityKind;
use dromhub_audit_postgres::{PostgresAuditConfig, PostgresAuditStore};

/// DromHub audit CLI — inspect and maintain entity audit logs.
#[derive(Parser, Debug)]
#[command(name = "dromhub", version, about)]
struct Cli {
    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DROMHUB_DATABASE_URL",
        default_value = "postgres://localhost/dromhub",
        global = true
    )]
    database_url: String,

    /// Audit table name prefix.
    #[arg(long, env = "DROMHUB_TABLE_PREFIX", default_value = "dromhub_", global = true)]
    prefix: String,

    /// Which entity's audit log to operate on.
    #[arg(long, value_enum, default_value = "brand", global = true)]
    entity: EntityArg,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum EntityArg {
    Brand,
    Part,
}

impl From<EntityArg> for EntityKind {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Brand => Self::Brand,
            EntityArg::Part => Self::Part,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query, delete, and purge audit records.
    Audit(commands::audit::AuditArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = PostgresAuditConfig::new(&cli.database_url).with_prefix(&cli.prefix);
    let store = PostgresAuditStore::new(&config, cli.entity.into()).await?;

    match cli.command {
        Command::Audit(args) => commands::audit::run(&store, &args, &cli.format).await,
    }
}
