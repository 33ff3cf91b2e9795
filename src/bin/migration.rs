use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

use travelops_api::migrator::Migrator;

#[derive(Parser)]
#[command(name = "migration", about = "Manage the TravelOps database schema")]
struct Cli {
    /// Database URL; falls back to DATABASE_URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
    database_url: String,

    #[command(subcommand)]
    command: Option<Action>,
}

#[derive(Subcommand)]
enum Action {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the last `steps` migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    info!("Connecting to database");

    let mut options = ConnectOptions::new(cli.database_url);
    options
        .max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    match cli.command.unwrap_or(Action::Up) {
        Action::Up => {
            Migrator::up(&db, None).await?;
            info!("Migration completed successfully");
        }
        Action::Down { steps } => {
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "Rollback completed successfully");
        }
        Action::Status => Migrator::status(&db).await?,
    }

    Ok(())
}
