//! Lotto Crawler CLI
//!
//! Local execution entry point: serve the read API with scheduled syncs, or
//! run a single sync or seed by hand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lotto_crawler::{
    error::Result,
    models::Config,
    pipeline::{self, SyncCoordinator, SyncScheduler},
    server::HttpServer,
    services::ResultsFetcher,
    storage::{DrawStore, SeedOutcome, SqliteStore},
};

/// Lotto Crawler - PCSO draw results harvester
#[derive(Parser, Debug)]
#[command(
    name = "lotto-crawler",
    version,
    about = "Harvests PCSO lotto draw results and serves them over HTTP"
)]
struct Cli {
    /// Path to storage directory containing config.toml, the database and the seed file
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed if needed, start the sync scheduler and serve the read API
    Serve,

    /// Run one sync now and print the outcome
    Sync,

    /// Load the bulk export into an unseeded store
    Seed {
        /// Path to the export file (default: {storage_dir}/{storage.seed_file})
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,

    /// Show store status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn open_store(config: &Config, storage_dir: &Path) -> Result<Arc<SqliteStore>> {
    std::fs::create_dir_all(storage_dir)?;
    let path = config.storage.database_path(storage_dir);
    let store = SqliteStore::open(
        &path,
        Duration::from_millis(config.storage.busy_timeout_ms),
    )?;
    log::info!("Opened database {}", path.display());
    Ok(Arc::new(store))
}

fn build_coordinator(config: &Config, store: Arc<SqliteStore>) -> Result<Arc<SyncCoordinator>> {
    let fetcher = ResultsFetcher::new(config)?;
    Ok(Arc::new(SyncCoordinator::new(
        store,
        Arc::new(fetcher),
        config.schedule.clone(),
    )))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Lotto Crawler starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_env_overrides();

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Serve => {
            config.validate()?;
            let store = open_store(&config, &cli.storage_dir)?;

            let seed_path = config.storage.seed_path(&cli.storage_dir);
            if !store.is_seeded().await? && !seed_path.exists() {
                log::warn!(
                    "Store is not seeded and {} does not exist; syncs will wait for a seed",
                    seed_path.display()
                );
            } else {
                pipeline::seed_store(store.as_ref(), &seed_path).await?;
            }

            let coordinator = build_coordinator(&config, Arc::clone(&store))?;
            let scheduler = SyncScheduler::new(Arc::clone(&coordinator), &config.schedule)?;
            let _scheduler = scheduler.start();

            HttpServer::new(store, coordinator, &config).serve().await?;
        }

        Command::Sync => {
            let store = open_store(&config, &cli.storage_dir)?;
            let coordinator = build_coordinator(&config, store)?;
            let outcome = coordinator.run().await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Seed { file } => {
            let store = open_store(&config, &cli.storage_dir)?;
            let seed_path = file.unwrap_or_else(|| config.storage.seed_path(&cli.storage_dir));

            match pipeline::seed_store(store.as_ref(), &seed_path).await? {
                SeedOutcome::Seeded(stats) => log::info!(
                    "Seed complete: {} records written, {} skipped",
                    stats.written(),
                    stats.skipped
                ),
                SeedOutcome::AlreadySeeded => log::info!("Store was already seeded"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (crawler, selectors, storage, schedule, server, query)");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            let store = open_store(&config, &cli.storage_dir)?;

            log::info!(
                "Seeded: {}",
                if store.is_seeded().await? { "yes" } else { "no" }
            );
            match store.latest_draw_date().await? {
                Some(date) => log::info!("Latest draw date: {date}"),
                None => log::info!("No draws stored yet."),
            }

            let games = store.game_types(0).await?;
            log::info!("Game types ({}): {}", games.len(), games.join(", "));
        }
    }

    log::info!("Done!");

    Ok(())
}
