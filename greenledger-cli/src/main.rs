use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use greenledger::config::LedgerConfig;
use greenledger::database::{establish_connection, get_database_url, migrations::Migrator};
use greenledger::lifecycle::JobStatus;
use greenledger::AppContext;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Overrides GREENLEDGER_DATABASE_URL
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Bind an imported state to a view in a cycle
    Promote {
        #[clap(long)]
        state: i32,
        #[clap(long)]
        cycle: i32,
    },
    /// Print the audit lineage of a view
    Lineage {
        #[clap(long)]
        view: i32,
    },
    Org {
        #[clap(subcommand)]
        command: OrgCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Migrate {
        #[clap(subcommand)]
        direction: MigrateDirection,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

#[derive(Subcommand, Debug)]
enum OrgCommands {
    /// Delete an organization and everything it owns
    Delete {
        #[clap(long)]
        org: i32,
        #[clap(long)]
        chunk_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = LedgerConfig::from_env()?;
    if let Some(database) = args.database.as_deref() {
        config.database_url = get_database_url(Some(database));
    }

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                let db = connect(&config).await?;
                migrate_database(&db, direction).await?;
            }
        },
        Commands::Promote { state, cycle } => {
            let ctx = AppContext::new(connect(&config).await?, config);
            let view = ctx.promote(state, cycle).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Lineage { view } => {
            let ctx = AppContext::new(connect(&config).await?, config);
            let lineage = ctx.lineage(view).await?;
            println!("{}", serde_json::to_string_pretty(&lineage)?);
        }
        Commands::Org { command } => match command {
            OrgCommands::Delete { org, chunk_size } => {
                if let Some(chunk_size) = chunk_size {
                    config = config.with_delete_chunk_size(chunk_size);
                }
                let ctx = AppContext::new(connect(&config).await?, config);
                delete_organization(&ctx, org).await?;
            }
        },
    }

    Ok(())
}

async fn connect(config: &LedgerConfig) -> Result<DatabaseConnection> {
    establish_connection(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))
}

async fn migrate_database(db: &DatabaseConnection, direction: MigrateDirection) -> Result<()> {
    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(db, None).await?;
            Migrator::up(db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}

/// Starts the delete and prints the progress record until it is terminal
async fn delete_organization(ctx: &AppContext, organization_id: i32) -> Result<()> {
    let job = ctx.delete_organization(organization_id).await?;
    info!(
        "Scheduled {} chunk deletes under {}",
        job.chunks.len(),
        job.progress_key
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    while !job.is_finished() {
        ticker.tick().await;
        if let Some(record) = ctx.delete_progress(organization_id).await? {
            println!("{}", serde_json::to_string(&record)?);
        }
    }

    let outcome = job.wait().await;
    let record = ctx
        .delete_progress(organization_id)
        .await?
        .context("No progress recorded for delete")?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    match (outcome.error, record.status) {
        (None, JobStatus::Success) => Ok(()),
        (Some(error), _) => anyhow::bail!("Organization delete failed: {}", error),
        (None, status) => anyhow::bail!("Organization delete ended with status {}", status),
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
