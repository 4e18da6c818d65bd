mod activities;
mod buildings;
mod orgs;

use clap::{Parser, Subcommand};
use orgdir_core::AppConfig;
use serde::Serialize;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::activities::ActivityCommands;
use crate::buildings::BuildingCommands;
use crate::orgs::OrgCommands;

#[derive(Debug, Parser)]
#[command(name = "orgdir")]
#[command(about = "Organization directory command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage the activity taxonomy
    Activities {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Manage buildings
    Buildings {
        #[command(subcommand)]
        command: BuildingCommands,
    },
    /// Manage and query organizations
    Orgs {
        #[command(subcommand)]
        command: OrgCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations, then seed if `ORGDIR_SEED_DATA` is set
    Migrate,
    /// Load the demo dataset into an empty database
    Seed,
}

/// Loaded configuration and a connected pool, shared by every handler.
pub(crate) struct AppContext {
    pub config: AppConfig,
    pub pool: PgPool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("orgdir ready; run `orgdir --help` for commands");
        return Ok(());
    };

    let config = orgdir_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = orgdir_db::PoolConfig::from_app_config(&config);
    let pool = orgdir_db::connect_pool(&config.database_url, pool_config).await?;
    let ctx = AppContext { config, pool };

    match command {
        Commands::Db { command } => run_db(&ctx, command).await,
        Commands::Activities { command } => activities::run(&ctx, command).await,
        Commands::Buildings { command } => buildings::run(&ctx, command).await,
        Commands::Orgs { command } => orgs::run(&ctx, command).await,
    }
}

async fn run_db(ctx: &AppContext, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            orgdir_db::health_check(&ctx.pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = orgdir_db::run_migrations(&ctx.pool).await?;
            println!("applied {applied} migration(s)");
            if ctx.config.seed_data {
                report_seed(orgdir_db::seed_demo_data(&ctx.pool).await?);
            }
        }
        DbCommands::Seed => report_seed(orgdir_db::seed_demo_data(&ctx.pool).await?),
    }
    Ok(())
}

fn report_seed(seeded: bool) {
    if seeded {
        println!("demo data loaded");
    } else {
        println!("directory already has data; seed skipped");
    }
}

/// Print `value` to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests;
