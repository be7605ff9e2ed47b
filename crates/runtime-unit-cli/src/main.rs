//! runtime-unit - run registered test suites against a wall-clock tick source
//!
//! The runner:
//! - collects the bundled self-check suites into a registry
//! - binds a console participant when one is configured
//! - drives the executor one tick per configured interval
//! - prints the run report and exits non-zero on failure

use anyhow::Context;
use clap::Parser;
use runtime_unit::{Executor, ManualDriver, Participant, SuiteRegistry, TracingReporter};
use std::process::ExitCode;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod clock;
mod config;
mod console;
mod suites;

use crate::clock::StopReason;
use crate::config::{ReportFormat, RunnerConfig};
use crate::console::ConsoleActor;

/// runtime-unit CLI
#[derive(Parser)]
#[command(name = "runtime-unit")]
#[command(about = "Run tick-driven test suites", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RUNTIME_UNIT_CONFIG")]
    config: Option<String>,

    /// Wall-clock length of one tick in milliseconds
    #[arg(long, env = "RUNTIME_UNIT_TICK_MS")]
    tick_ms: Option<u64>,

    /// Stop after this many ticks (0 = unlimited)
    #[arg(long, env = "RUNTIME_UNIT_MAX_TICKS")]
    max_ticks: Option<u64>,

    /// Bind a console participant with this name
    #[arg(short, long)]
    participant: Option<String>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Log level
    #[arg(long, env = "RUNTIME_UNIT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "RUNTIME_UNIT_LOG_JSON")]
    json: bool,

    /// List registered suites and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let mut config =
        RunnerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(tick_ms) = cli.tick_ms {
        config.ticks.interval_ms = tick_ms;
    }
    if let Some(max_ticks) = cli.max_ticks {
        config.ticks.max_ticks = max_ticks;
    }
    if let Some(participant) = cli.participant {
        config.participant.name = Some(participant);
    }
    if let Some(format) = cli.format {
        config.report.format = format;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut registry = SuiteRegistry::new();
    suites::register_all(&mut registry).context("failed to register bundled suites")?;

    if cli.list {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let participant = config
        .participant
        .name
        .as_deref()
        .map(|name| Participant::single(Rc::new(ConsoleActor::new(name))));
    let prefix = participant
        .as_ref()
        .map(|p| p.name().to_string())
        .unwrap_or_else(|| "console".to_string());

    let reporter = TracingReporter::new(prefix).with_participant(participant.clone());
    let mut executor = Executor::new(Rc::new(reporter), participant);
    let queued = registry.drain_into(&mut executor)?;
    tracing::info!(suites = queued, tick_ms = config.ticks.interval_ms, "Starting run");

    let mut driver = ManualDriver::new();
    executor.execute_all(&mut driver)?;
    let (ticks, stop) = clock::drive(&mut driver, &config.ticks).await?;
    tracing::info!(ticks, ?stop, "Run stopped");

    let report = executor.report();
    match config.report.format {
        ReportFormat::Text => print!("{}", report),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    if stop == StopReason::Idle && report.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
