//! CLI entrypoint for blacknight
//!
//! This is the main binary that wires together all layers using
//! dependency injection. In standalone mode the coordination store is the
//! in-memory ensemble, seeded from `--spec` and `--arg`.

use anyhow::{Context, Result, anyhow};
use blacknight_application::{ActionExecutor, ElectionController, load_specification};
use blacknight_domain::{Specification, StorePaths};
use blacknight_infrastructure::{ConfigLoader, FileConfig, InMemoryEnsemble, JsonlActionJournal};
use blacknight_presentation::{AdminConsole, Cli};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    if let Some(id) = &cli.id {
        config.node.id = id.clone();
    }
    config.validate().context("Invalid configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, &config);

    info!(node = %config.node.id, root = %config.store.root, "Starting blacknight");

    // === Dependency Injection ===
    let paths = config.store_paths();
    let ensemble = InMemoryEnsemble::new();
    seed_store(&ensemble, &paths, &cli)?;
    let session = Arc::new(ensemble.connect());

    // A missing or malformed specification is fatal before the election
    let spec = Arc::new(
        load_specification(session.as_ref(), &paths)
            .await
            .context("Cannot start without a valid specification")?,
    );

    let mut executor = ActionExecutor::new(
        session.clone(),
        paths.clone(),
        spec,
        Arc::new(config.services.to_controller()),
    );
    if let Some(path) = &config.journal.path {
        match JsonlActionJournal::open(path) {
            Some(journal) => executor = executor.with_journal(Arc::new(journal)),
            None => warn!(path = %path, "Action journal disabled"),
        }
    }

    let election = ElectionController::new(
        session,
        paths,
        Arc::new(executor),
        config.node_identity()?,
        config.reconcile.to_params(),
    );
    let admin = election.admin_handle();

    let shutdown = CancellationToken::new();
    let mut election_task = tokio::spawn(election.run(shutdown.clone()));

    if !cli.no_console {
        let console = AdminConsole::new(admin, cli.output);
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = console
                .run(AdminConsole::stdin_lines(), std::io::stdout(), token)
                .await
            {
                warn!(error = %e, "Admin console stopped");
            }
        });
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Interrupted, shutting down");
        }
        result = &mut election_task => {
            result.context("Election task panicked")??;
            return Ok(());
        }
    }

    shutdown.cancel();
    election_task.await.context("Election task panicked")??;
    info!("blacknight stopped");
    Ok(())
}

/// Initialize logging: stderr always, plus a daily-rotated file when
/// `logging.directory` is set. `RUST_LOG` overrides the `-v` level.
fn init_logging(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let (file_layer, guard) = match &config.logging.directory {
        Some(directory) => {
            let appender =
                tracing_appender::rolling::daily(directory, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    guard
}

/// Seed `/spec` and `/args` from the command line
fn seed_store(ensemble: &InMemoryEnsemble, paths: &StorePaths, cli: &Cli) -> Result<()> {
    if let Some(file) = &cli.spec {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Cannot read specification file {}", file.display()))?;
        let spec = Specification::from_toml(&text)
            .with_context(|| format!("Invalid specification in {}", file.display()))?;
        ensemble.seed(&paths.spec(), text.as_bytes())?;
        info!(roles = spec.roles().len(), file = %file.display(), "Seeded specification");
    }

    ensemble.seed(&paths.args(), b"")?;
    for (key, value) in &cli.args {
        ensemble.seed(&paths.arg(key), value.as_bytes())?;
    }
    Ok(())
}
