use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, anyhow, bail};
use catalog_config::{CatalogConfig, ConfigLoad, ConfigLoader, ConfigSource};
use catalog_core::{
    AggregationService, CatalogRepositories, CatalogWriter, DefaultClientFactory, MIGRATOR,
    MoveTracker, ScanCoordinator, ScanJob, ScannerRegistry,
};
use catalog_model::{ScanJobId, ScanState, ScanType, StorageRoot};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "catalog-scand")]
#[command(about = "Crawl configured storage roots into the PostgreSQL catalog")]
struct Cli {
    /// Catalog config file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment file to load instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ScanArgs {
    /// Only scan the named roots (repeatable). Defaults to every enabled root.
    #[arg(long = "root")]
    roots: Vec<String>,

    /// Kind of scan queued for each root
    #[arg(long, value_enum, default_value_t = ScanKind::Full)]
    scan_type: ScanKind,

    /// Exit once the queued scans finish instead of waiting for ctrl-c
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply database migrations and exit
    Migrate,
    /// Print move statistics and the most recent rename events
    Moves {
        /// Number of rename events to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScanKind {
    Full,
    Incremental,
    Verify,
}

impl From<ScanKind> for ScanType {
    fn from(kind: ScanKind) -> Self {
        match kind {
            ScanKind::Full => ScanType::Full,
            ScanKind::Incremental => ScanType::Incremental,
            ScanKind::Verify => ScanType::Verify,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let pool = connect(&config).await?;
    MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;

    match cli.command {
        Some(Command::Migrate) => {
            info!("Database migrations applied successfully");
            Ok(())
        }
        Some(Command::Moves { limit }) => print_moves(pool, &config, limit).await,
        None => run_scans(pool, config, cli.scan).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CatalogConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &cli.env_file {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        config,
        source,
        env_file_loaded,
    } = loader.load().context("failed to load configuration")?;

    let default_filter = config.log_filter.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }
    match &source {
        ConfigSource::Default => info!("no config file found, using defaults"),
        ConfigSource::EnvInline => info!("config loaded from inline environment json"),
        ConfigSource::Explicit(path) | ConfigSource::EnvPath(path) | ConfigSource::File(path) => {
            info!(path = %path.display(), "config loaded from file")
        }
    }

    Ok(config)
}

async fn connect(config: &CatalogConfig) -> anyhow::Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("no database url configured; set DATABASE_URL"))?;
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_scans(pool: PgPool, config: CatalogConfig, args: ScanArgs) -> anyhow::Result<()> {
    let repositories = CatalogRepositories::postgres(pool);
    let roots = register_roots(&repositories, &config, &args.roots).await?;
    if roots.is_empty() {
        warn!("no enabled storage roots to scan");
    }

    let tracker = Arc::new(MoveTracker::new(
        config.scanner.move_tracker_config(),
        repositories.rename_events.clone(),
    ));
    let writer = Arc::new(CatalogWriter::new(&repositories, tracker));
    let aggregation = Arc::new(AggregationService::new(
        repositories.clone(),
        config.scanner.aggregation.clone(),
    ));
    let coordinator = ScanCoordinator::new(
        config.scanner.coordinator.clone(),
        ScannerRegistry::with_defaults(),
        Arc::new(DefaultClientFactory::new()),
        writer,
        Some(aggregation),
    );
    coordinator.start().await?;

    let scan_type = ScanType::from(args.scan_type);
    let mut queued = Vec::with_capacity(roots.len());
    for root in roots {
        let name = root.name.clone();
        let job = ScanJob::new(root, "/").with_scan_type(scan_type);
        match coordinator.queue_scan(job) {
            Ok(job_id) => {
                info!(job_id = %job_id, storage_root = %name, ?scan_type, "scan queued");
                queued.push(job_id);
            }
            Err(err) => warn!(storage_root = %name, error = %err, "could not queue scan"),
        }
    }

    if args.once {
        wait_for_jobs(&coordinator, &queued).await;
    } else {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        info!("shutdown requested");
    }

    coordinator.stop().await;
    report_moves(coordinator.writer().tracker()).await;
    Ok(())
}

/// Persist configured roots so their ids are known before scanning.
async fn register_roots(
    repositories: &CatalogRepositories,
    config: &CatalogConfig,
    only: &[String],
) -> anyhow::Result<Vec<StorageRoot>> {
    for name in only {
        if !config.storage_roots.iter().any(|root| &root.name == name) {
            bail!("storage root '{name}' is not configured");
        }
    }

    let mut roots = Vec::new();
    for root in config.enabled_roots() {
        if !only.is_empty() && !only.contains(&root.name) {
            continue;
        }
        let mut root = root.clone();
        let id = repositories
            .storage_roots
            .save(&root)
            .await
            .with_context(|| format!("failed to save storage root '{}'", root.name))?;
        root.id = Some(id);
        roots.push(root);
    }
    Ok(roots)
}

async fn wait_for_jobs(coordinator: &ScanCoordinator, jobs: &[ScanJobId]) {
    // (job, status seen at least once)
    let mut remaining: Vec<(ScanJobId, bool)> = jobs.iter().map(|id| (*id, false)).collect();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    while !remaining.is_empty() {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return;
            }
        }

        let mut still_running = Vec::with_capacity(remaining.len());
        for (job_id, seen) in remaining {
            match coordinator.active_scan_status(job_id).await {
                Some(status) if status.state.is_terminal() => {
                    let summary = serde_json::to_string(&status).unwrap_or_default();
                    match status.state {
                        ScanState::Completed => info!(job_id = %job_id, %summary, "scan finished"),
                        _ => warn!(job_id = %job_id, %summary, "scan did not complete"),
                    }
                }
                Some(_) => still_running.push((job_id, true)),
                // Purged after its retention window.
                None if seen => {}
                // Queued or waiting for a scan permit.
                None => still_running.push((job_id, false)),
            }
        }
        remaining = still_running;
    }
}

async fn report_moves(tracker: &MoveTracker) {
    match tracker.statistics().await {
        Ok(stats) => info!(
            pending = stats.pending_moves,
            total = stats.total_renames,
            successful = stats.successful_renames,
            failed = stats.failed_renames,
            success_rate = stats.success_rate,
            "move statistics"
        ),
        Err(err) => warn!(error = %err, "could not read move statistics"),
    }
}

async fn print_moves(pool: PgPool, config: &CatalogConfig, limit: i64) -> anyhow::Result<()> {
    let repositories = CatalogRepositories::postgres(pool);
    let tracker = MoveTracker::new(
        config.scanner.move_tracker_config(),
        repositories.rename_events.clone(),
    );

    let stats = tracker.statistics().await?;
    println!(
        "renames: {} total, {} processed, {} failed ({:.2}% success)",
        stats.total_renames, stats.successful_renames, stats.failed_renames, stats.success_rate
    );
    for event in tracker.recent_rename_events(None, limit).await? {
        println!(
            "{}  {:<9}  {} -> {}",
            event.detected_at.format("%Y-%m-%d %H:%M:%S"),
            event.status.as_str(),
            event.old_path,
            event.new_path
        );
    }
    Ok(())
}
