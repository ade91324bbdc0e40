//! rwho-server CLI - standalone collector for fleet login reports

use clap::Parser;
use rwho::audit::AUDIT_TARGET;
use rwho::config::expand_path;
use rwho::{Config, Server};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Parser, Debug)]
#[command(name = "rwho-server")]
#[command(version)]
#[command(about = "rwho-server - collects logged-in session reports from client hosts", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize a new config file with defaults
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = expand_path(&args.config);

    // Handle --init flag
    if args.init {
        let _guard = init_logging(args.verbose, None)?;
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let config_found = config_path.exists();
    let mut config = if config_found {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    // Keep the guard alive so buffered audit lines are flushed on exit
    let audit_dir = config.audit_dir().filter(|_| config.audit.enabled);
    let _guard = init_logging(args.verbose, audit_dir.as_deref())?;

    if !config_found {
        tracing::warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }

    let server = Server::new(config)?;
    tracing::info!("Using database at {}", server.config.db_path().display());

    // Start API server (blocks until shutdown)
    server.start_api_server().await?;

    Ok(())
}

/// Install the global subscriber. When `audit_dir` is set, audit events are
/// additionally written to a daily-rotated `audit.log` through a
/// non-blocking writer.
fn init_logging(verbose: bool, audit_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let log_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rwho={},tower_http=debug", log_level).into());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_filter(env_filter));

    let Some(dir) = audit_dir else {
        registry.init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, "audit.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(Targets::new().with_target(AUDIT_TARGET, tracing::Level::INFO)),
        )
        .init();

    Ok(Some(guard))
}
