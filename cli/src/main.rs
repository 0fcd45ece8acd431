//! CLI entrypoint for conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod approvals;
mod commands;

use anyhow::{Context, Result, anyhow};
use approvals::ApprovalResponder;
use clap::Parser;
use commands::{Cli, Command};
use conductor_application::{
    ChannelEventSink, CheckpointStore, CompositeEventSink, RunTurnUseCase, SystemClock,
    TurnEventSink, TurnServices,
};
use conductor_domain::{TurnEvent, TurnEventKind, TurnRequest, TurnState};
use conductor_infrastructure::{
    ConfigLoader, FileCheckpointStore, InMemoryCheckpointStore,
    InMemoryConversationStore, JsonlEventSink, OfflineExecutionRuntime, OfflineReasoningModule,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("{}", e))?
    };

    if matches!(cli.command, Command::Config) {
        for source in ConfigLoader::describe_sources(cli.config.as_ref()) {
            println!("# {}", source);
        }
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, config.logging.directory.as_deref());

    config.validate().context("Invalid configuration")?;
    info!("Starting conductor");

    let raw = cli
        .command
        .raw_request()
        .ok_or_else(|| anyhow!("Command does not run a turn"))?;
    let request = TurnRequest::try_from(raw).context("Invalid request")?;

    // === Dependency Injection ===
    let registry = Arc::new(config.worker_registry());
    let checkpoint_store: Arc<dyn CheckpointStore> = match &config.checkpoints.directory {
        Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
        None => Arc::new(InMemoryCheckpointStore::new()),
    };
    if config.checkpoints.directory.is_none() && matches!(request, TurnRequest::Resume(_)) {
        warn!("No [checkpoints] directory configured; only in-process checkpoints exist");
    }

    let params = config.orchestrator.to_params();
    let services = TurnServices::new(
        checkpoint_store,
        &config.routing_cache.to_config(),
        Arc::new(SystemClock),
    );

    let reasoning = Arc::new(OfflineReasoningModule::new(&registry));
    let runtime = Arc::new(OfflineExecutionRuntime::new(
        config.approvals.risky_keywords.clone(),
    ));
    let conversations = Arc::new(InMemoryConversationStore::new());
    if let Some(conversation) = cli.command.named_conversation() {
        warn!(
            "Conversation history is not persisted between runs; conversation {} starts empty",
            conversation
        );
    }

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; cancelling turn");
            ctrl_c_token.cancel();
        }
    });

    let use_case = RunTurnUseCase::new(
        reasoning,
        runtime,
        conversations,
        registry,
        services.clone(),
    )
    .with_params(params.clone())
    .with_cancellation(cancellation);

    // === Event stream ===
    let (channel_sink, events) = ChannelEventSink::new();
    let mut sinks: Vec<Arc<dyn TurnEventSink>> = vec![Arc::new(channel_sink)];
    if let Some(path) = &config.events.jsonl_path {
        match JsonlEventSink::new(path) {
            Some(sink) => sinks.push(Arc::new(sink)),
            None => warn!("Event transcript {} could not be opened", path),
        }
    }
    let sink = CompositeEventSink::new(sinks);

    let policy = cli.approval_policy.unwrap_or(config.approvals.policy);
    let responder = ApprovalResponder::new(services.broker.clone(), policy, params.approval_timeout);
    let printer = tokio::spawn(print_events(events, responder));

    let result = use_case.execute_with_events(request, &sink).await;
    // Closing the channel ends the printer once it has drained
    drop(sink);
    if let Err(e) = printer.await {
        warn!("Event printer stopped: {}", e);
    }

    let output = result.map_err(|e| anyhow!("{} [{}]", e, e.error_kind()))?;
    if let Some(checkpoint_id) = output.turn.checkpoint_id() {
        eprintln!("checkpoint: {}", checkpoint_id);
    }

    Ok(match output.turn.state() {
        TurnState::Done => ExitCode::SUCCESS,
        TurnState::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    })
}

/// Print each event as one JSON line and answer approval requests as they arrive.
async fn print_events(mut events: mpsc::UnboundedReceiver<TurnEvent>, mut responder: ApprovalResponder) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize {} event: {}", event.kind.type_name(), e),
        }

        if let TurnEventKind::ApprovalRequested {
            request_id,
            operation_descriptor,
            risk_level,
        } = &event.kind
        {
            responder
                .answer(request_id, operation_descriptor, *risk_level)
                .await;
        }
    }
}

/// Diagnostics go to stderr, and also to a daily rolling file when configured.
///
/// `RUST_LOG` overrides the verbosity flags.
fn init_logging(verbose: u8, directory: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "conductor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}
