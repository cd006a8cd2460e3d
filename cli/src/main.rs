//! CLI entrypoint for medreason
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use medreason_application::{
    CriteriaRegistry, ModelHandlerFactory, ProgressMonitor, ProgressSubscriber,
    RunReasoningInput, RunReasoningUseCase, SqlRetrievalService, SubscriptionGuard,
};
use medreason_domain::{OutputFormat, Severity};
use medreason_infrastructure::{
    CapabilityDetector, ConfigLoader, DatabaseError, EngineHandlerFactory, FileConfig,
    InMemoryCriteriaRegistry, JsonlConversationLogger, SqliteExecutor,
};
use medreason_presentation::{
    AppState, ChatRepl, Cli, Command, ConsoleFormatter, ProgressReporter, SimpleProgress,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging. `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("--log-file must name a file: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn report_config_issues(config: &FileConfig) {
    for issue in config.validate() {
        match issue.severity {
            Severity::Error => error!("Configuration: {}", issue),
            Severity::Warning => warn!("Configuration: {}", issue),
        }
    }
}

/// Wired application services.
struct Services {
    detector: Arc<CapabilityDetector>,
    monitor: Arc<ProgressMonitor>,
    reasoning: RunReasoningUseCase,
}

/// Wire every layer. A configured database that cannot be opened is fatal.
fn build_services(config: &FileConfig) -> Result<Services> {
    let monitor = Arc::new(ProgressMonitor::new());
    let detector = Arc::new(CapabilityDetector::new(
        config.engines.clone(),
        config.engine.force_backend.clone(),
    ));
    let factory: Arc<dyn ModelHandlerFactory> = Arc::new(EngineHandlerFactory::new(
        config,
        Arc::clone(&detector),
        Arc::clone(&monitor),
    ));
    let criteria: Arc<dyn CriteriaRegistry> =
        Arc::new(InMemoryCriteriaRegistry::with_active(&config.criteria.active));
    let params = config.reasoning_params();

    let mut reasoning =
        RunReasoningUseCase::new(Arc::clone(&factory), &config.models.reasoning, criteria)
            .with_params(params.clone());

    match SqliteExecutor::from_config(config.database.resolved_path()) {
        Ok(executor) => {
            info!("Clinical database: {}", executor.path().display());
            let retrieval =
                SqlRetrievalService::new(factory, &config.models.sql, Arc::new(executor))
                    .with_params(params);
            reasoning = reasoning.with_retriever(Arc::new(retrieval));
        }
        Err(DatabaseError::NotConfigured) => debug!("No clinical database configured"),
        Err(e) => return Err(e).context("invalid database.path"),
    }

    if let Some(path) = &config.logging.conversation_log {
        match JsonlConversationLogger::new(path) {
            Some(logger) => reasoning = reasoning.with_conversation_logger(Arc::new(logger)),
            None => warn!("Conversation log disabled: cannot open {}", path),
        }
    }

    Ok(Services {
        detector,
        monitor,
        reasoning,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_ref())?;

    info!("Starting medreason");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };

    if cli.show_config {
        ConfigLoader::print_config_sources();
        println!();
        println!("{}", ConfigLoader::render(&config)?);
        return Ok(());
    }

    report_config_issues(&config);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // === Dependency Injection ===
    let services = build_services(&config)?;
    services.detector.warm_up().await;
    let format = command.output_format();

    match command {
        Command::Detect => {
            let detector = &services.detector;
            println!(
                "{}",
                ConsoleFormatter::format_profile(
                    &detector.detect(),
                    &detector.can_use_high_throughput(),
                    &detector.can_use_fallback(),
                )
            );
        }
        Command::Ask { question, sql, .. } => {
            let _progress = (!cli.quiet).then(|| {
                let subscriber: Arc<dyn ProgressSubscriber> = match format {
                    OutputFormat::Full => Arc::new(ProgressReporter::new()),
                    _ => Arc::new(SimpleProgress::new()),
                };
                SubscriptionGuard::new(Arc::clone(&services.monitor), subscriber)
            });

            let input = RunReasoningInput::new(question).with_sql(sql);
            let result = services.reasoning.execute(input).await?;
            println!("{}", ConsoleFormatter::render(&result, format));
        }
        Command::Chat { sql } => {
            let mut repl = ChatRepl::new(services.reasoning, services.monitor)
                .with_sql(sql)
                .with_progress(!cli.quiet);
            repl.run().await?;
        }
        Command::Serve { addr } => {
            let addr: SocketAddr = match addr {
                Some(addr) => addr,
                None => config
                    .server
                    .addr
                    .parse()
                    .with_context(|| format!("invalid server.addr '{}'", config.server.addr))?,
            };
            let state = AppState::new(services.reasoning, services.monitor);
            medreason_presentation::serve(addr, state).await?;
        }
    }

    Ok(())
}
