use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use untested::config::Config;
use untested::models::{KindMask, Outcome, RunSummary, TestKind, TestResult};
use untested::registry::{self, SearchFilter};
use untested::report::{self, junit};
use untested::runner::{Orchestrator, RunEvent, TickStatus};
use untested::demos;

/// Run registered tests on the cooperative scheduler.
#[derive(Debug, Parser)]
#[command(name = "untested", version)]
struct Cli {
    /// Case-insensitive substring of the full test name. Empty runs everything.
    #[arg(long, default_value = "")]
    name: String,

    /// Only run tests of this kind. Repeatable.
    #[arg(long = "kind", value_enum)]
    kinds: Vec<KindArg>,

    /// Do not enforce per-test timeouts.
    #[arg(long)]
    no_timeouts: bool,

    /// Run tests flagged as disabled.
    #[arg(long)]
    include_disabled: bool,

    /// Write a JUnit-style XML report here.
    #[arg(long)]
    report_path: Option<PathBuf>,

    /// Print all results as JSON on stdout once the run ends.
    #[arg(long)]
    json: bool,

    /// List matching tests and exit.
    #[arg(long)]
    list: bool,

    /// Config file to use instead of ./untested.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Unit,
    World,
    ClientServer,
}

impl From<KindArg> for TestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Unit => TestKind::Unit,
            KindArg::World => TestKind::World,
            KindArg::ClientServer => TestKind::ClientServer,
        }
    }
}

impl Cli {
    fn kind_mask(&self) -> KindMask {
        if self.kinds.is_empty() {
            return KindMask::ALL;
        }
        self.kinds
            .iter()
            .fold(KindMask::empty(), |mask, &k| mask | TestKind::from(k).mask())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    install_subscriber();
    run(cli).await
}

fn install_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load(&workspace),
    };

    demos::register(&mut registry::global().write())
        .context("failed to register built-in tests")?;
    let mut orchestrator = Orchestrator::from_global();

    let filter = SearchFilter::new(cli.name.clone()).kinds(cli.kind_mask());
    info!("Discovering tests with name filter '{}'...", cli.name);
    let tests = orchestrator.find_tests(&filter);

    if cli.list {
        for test in &tests {
            let disabled = if test.options.is_disabled() { " (disabled)" } else { "" };
            println!("{}\t{}{}", test.name, test.kind.label(), disabled);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if tests.is_empty() {
        error!("No tests found for name '{}'.", cli.name);
        return Ok(ExitCode::SUCCESS);
    }
    info!("Found {} tests to run.", tests.len());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut options = config.run.run_options().forward_to(event_tx);
    if cli.no_timeouts {
        options = options.include_timeouts(false);
    }
    if cli.include_disabled {
        options = options.include_disabled(true);
    }

    let names: Vec<String> = tests.iter().map(|t| t.name.full()).collect();
    if !orchestrator.queue_tests(&names, options) {
        error!("Failed to queue tests for running. Is another run in progress?");
        return Ok(ExitCode::FAILURE);
    }

    let mut heartbeat = interval(config.run.tick_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticking = true;
    let mut interrupted = false;
    let mut results = Vec::new();

    // The event channel closes once the run has finished and released its options.
    loop {
        tokio::select! {
            _ = heartbeat.tick(), if ticking => {
                if orchestrator.tick() != TickStatus::Continue {
                    ticking = false;
                }
            }

            Some(event) = event_rx.recv() => match event {
                RunEvent::TestStarted { name } => info!("Running test: {name}"),
                RunEvent::TestFinished { result } => log_result(&result),
                RunEvent::RunFinished { results: all } => results = all,
            },

            _ = &mut ctrl_c, if ticking && !interrupted => {
                interrupted = true;
                warn!("Interrupted, stopping tests");
                orchestrator.stop_tests();
            }

            else => break,
        }
    }

    let summary = RunSummary::from_results(&results);
    info!("{}", report::run_sentence(&summary));

    if cli.json {
        println!("{}", report::to_json(&results).context("failed to serialize results")?);
    }

    if let Some(path) = cli.report_path.or(config.report.path) {
        junit::write(&path, &results)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn log_result(result: &TestResult) {
    let line = report::summary_line(result);
    match result.outcome {
        Outcome::Fail => {
            error!("{line}");
            for e in &result.errors {
                error!("{e}");
            }
        }
        Outcome::Success | Outcome::Skipped => info!("{line}"),
    }
}
