//! # onair Server
//!
//! Admin HTTP API and background runner for the onair control plane.
//!
//! - `onair-server` (or `onair-server serve`) serves the license and job API.
//! - `onair-server runner` runs the leader-elected schedule poll loop.
//! - `onair-server db migrate` applies the embedded migrations and exits.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use onair_core::{
    AppUnitOfWork, Clock, SecretHasher, SystemClock,
    database::{InMemoryStore, PostgresDatabase},
    domain::runner::RunnerPoller,
};
use onair_server::{
    AppState, build_app, cors_layer,
    infra::config::{Config, ConfigLoad, ConfigLoader},
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "onair-server")]
#[command(about = "Control plane for scheduled streaming jobs and installation licensing")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to an onair.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT", global = true)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST", global = true)]
    host: Option<String>,

    /// Keep all state in process memory instead of PostgreSQL
    #[arg(long, env = "ONAIR_IN_MEMORY", default_value_t = false, global = true)]
    in_memory: bool,

    /// Also run the schedule runner inside the server process
    #[arg(long, env = "ONAIR_EMBEDDED_RUNNER", default_value_t = false, global = true)]
    embedded_runner: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the admin API (default)
    Serve,
    /// Run the background schedule runner
    Runner,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,onair_core=info,tower_http=warn".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_runtime_config(&cli.serve)?;

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&config).await,
        Some(Command::Runner) => run_runner(&cli.serve, config).await,
        Some(Command::Serve) | None => run_server(&cli.serve, config).await,
    }
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }

    let ConfigLoad { mut config, warnings } =
        loader.load().context("failed to load configuration")?;

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    Ok(config)
}

async fn connect_postgres(config: &Config) -> anyhow::Result<PostgresDatabase> {
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is required unless --in-memory is set")?;
    PostgresDatabase::connect(url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn build_unit_of_work(
    args: &ServeArgs,
    config: &Config,
) -> anyhow::Result<AppUnitOfWork> {
    if args.in_memory {
        warn!("running with the in-memory store; state is lost on exit");
        return Ok(AppUnitOfWork::in_memory(Arc::new(InMemoryStore::new())));
    }

    let pg = connect_postgres(config).await?;
    pg.run_migrations()
        .await
        .context("database migration failed")?;
    let stats = pg.pool_stats();
    info!(
        size = stats.size,
        idle = stats.idle,
        max = stats.max_size,
        "connected to PostgreSQL"
    );
    Ok(AppUnitOfWork::from_postgres(&pg))
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pg = connect_postgres(config).await?;
    pg.run_migrations()
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_runner(args: &ServeArgs, config: Config) -> anyhow::Result<()> {
    let uow = build_unit_of_work(args, &config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let poller = RunnerPoller::new(&uow, clock, config.runner.settings());

    poller.run_until(shutdown_signal()).await;
    Ok(())
}

async fn run_server(args: &ServeArgs, config: Config) -> anyhow::Result<()> {
    let secret_key = config
        .license
        .require_secret_key()
        .context("license API cannot start")?;
    let hasher = SecretHasher::new(secret_key).context("invalid LICENSE_SECRET_KEY")?;

    let uow = build_unit_of_work(args, &config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if args.embedded_runner {
        let poller = RunnerPoller::new(&uow, clock.clone(), config.runner.settings());
        tokio::spawn(async move {
            poller.run_until(shutdown_signal()).await;
        });
    }

    let state = AppState::new(uow, clock, hasher, config.license.policy);
    let cors = cors_layer(&config.server.cors_allowed_origins)
        .context("invalid CORS origin in server configuration")?;
    let app = build_app(state, cors);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
            .await
            .with_context(|| {
                format!(
                    "failed to bind {}:{}",
                    config.server.host, config.server.port
                )
            })?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "onair server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("onair server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
