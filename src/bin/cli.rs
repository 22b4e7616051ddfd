//! Delisting watcher CLI
//!
//! Long-running entry point plus one-shot and config-check commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use delist_watch::{
    config::{AppContext, Credentials},
    error::Result,
    models::Config,
    pipeline::log_outcome,
    services::ConnectionKeeper,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// delist-watch - Exchange delisting announcement watcher
#[derive(Parser, Debug)]
#[command(
    name = "delist-watch",
    version,
    about = "Watches an announcement feed and alerts on new delistings"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/watcher.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the title prefix to match
    #[arg(long)]
    title_prefix: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch continuously until Ctrl-C
    Run,

    /// Run a single check and exit
    Once {
        /// Print alerts instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging from the verbosity flag and `[logging] level`.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loaded = Config::load_optional(&cli.config);
    let level = match &loaded {
        Ok(Some(config)) => config.logging.level.clone(),
        _ => "info".to_string(),
    };
    init_logging(cli.verbose, &level);

    let mut config = match fatal(loaded)? {
        Some(config) => config,
        None => {
            log::warn!(
                "Config file {} not found, using defaults",
                cli.config.display()
            );
            Config::default()
        }
    };
    if let Some(prefix) = cli.title_prefix {
        config.rule.title_prefix = prefix;
    }

    match cli.command {
        Command::Run => {
            let credentials = fatal(Credentials::from_env())?;
            let ctx = fatal(AppContext::new(config, Some(credentials)))?;
            run(ctx).await?;
        }

        Command::Once { dry_run } => {
            let credentials = if dry_run {
                None
            } else {
                Some(fatal(Credentials::from_env())?)
            };
            let ctx = fatal(AppContext::new(config, credentials))?;
            let mut watch = ctx.watch_loop()?;
            let outcome = watch.run_cycle().await;
            log_outcome(&outcome);
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());
            let ctx = fatal(AppContext::new(config, None))?;
            fatal(ctx.source_reader())?;
            log::info!(
                "✓ Config OK ({} extraction strategies)",
                ctx.config.source.strategies.len()
            );
        }
    }

    Ok(())
}

/// Log a startup error before returning it.
fn fatal<T>(result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::error!("{}", e);
    }
    result
}

async fn run(ctx: AppContext) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signal = Arc::new(Notify::new());
    let mut watch = ctx.watch_loop()?;

    let keeper = if ctx.config.keeper.enabled {
        watch = watch.with_signal(Arc::clone(&signal));
        let keeper = ConnectionKeeper::new(
            ctx.config.keeper.clone(),
            ctx.config.watch.interval(),
            Arc::clone(&signal),
        )
        .with_alerts(ctx.dispatcher());
        let token = shutdown.clone();
        Some(tokio::spawn(async move { keeper.run(token).await }))
    } else {
        None
    };

    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received Ctrl-C, shutting down");
                token.cancel();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    watch.run(shutdown).await;

    if let Some(handle) = keeper {
        if let Err(e) = handle.await {
            log::error!("Connection keeper task failed: {}", e);
        }
    }
    Ok(())
}
