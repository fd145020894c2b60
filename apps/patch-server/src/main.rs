use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use inventory::api::rest::identity::trusted_account_header;
use inventory::domain::registry::Catalog;
use inventory::{Inventory, InventoryConfig};
use listing_db::{ConnectOpts, DbHandle, ExecGuard};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use tokio_util::sync::CancellationToken;

mod http;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// In-memory DSNs are kept as-is.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };
    if path_str.is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }

    let mut p = PathBuf::from(path_str);
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = format!("sqlite://{}", p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Patch listing server: tenant-scoped system, advisory and package listings
#[derive(Parser)]
#[command(name = "patch-server")]
#[command(about = "Patch listing server: tenant-scoped system, advisory and package listings")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

/// Directory relative paths in the configuration resolve against.
fn base_dir(config_path: Option<&Path>) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let base_dir = base_dir(cli.config.as_deref());
    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, &base_dir);
    tracing::info!("Patch server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, &base_dir).await,
        Commands::Check => check_config(&config),
    }
}

fn connect_opts(db: &DatabaseConfig) -> ConnectOpts {
    let defaults = ConnectOpts::default();
    ConnectOpts {
        max_conns: db.max_conns.or(defaults.max_conns),
        acquire_timeout: db
            .acquire_timeout_sec
            .map(Duration::from_secs)
            .or(defaults.acquire_timeout),
        ..defaults
    }
}

async fn run_server(config: AppConfig, base_dir: &Path) -> Result<()> {
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("database configuration is required"))?;
    let inventory_cfg: InventoryConfig = config.module_config(Inventory::NAME)?;

    let mut dsn = db_config.url.trim().to_string();
    if dsn.starts_with("sqlite://") {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir)?;
    }
    let db = DbHandle::connect(&dsn, connect_opts(&db_config))
        .await
        .context("failed to connect to database")?;
    tracing::info!(engine = ?db.engine(), dsn = %db.dsn(), "Connected DB backend");

    // Cancelled only once the shutdown grace period has run out.
    let queries = CancellationToken::new();
    let guard = ExecGuard::new(db_config.query_timeout(), queries.clone());
    let inventory = Inventory::init(&db, inventory_cfg, guard)?;

    let router = inventory
        .register_rest(Router::new())
        .layer(axum::middleware::from_fn(trusted_account_header));
    let router = http::with_middleware(router, config.server.request_timeout());

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid listen address '{}'", config.server.bind_addr()))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(http::wait_for_signal(shutdown.clone()));

    let grace = Duration::from_secs(config.server.shutdown_grace_sec);
    let served = http::serve(router, addr, shutdown, queries, grace).await;

    db.close().await;
    tracing::info!("Patch server stopped");
    served
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let inventory_cfg: InventoryConfig = config.module_config(Inventory::NAME)?;
    Catalog::new(&inventory_cfg).context("invalid listing configuration")?;
    if let Some(db) = &config.database {
        DbHandle::detect(&db.url)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
