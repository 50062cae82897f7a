//! Courier - command-line entry point
//!
//! Loads settings and a run plan, runs the plan on a worker task and prints
//! the JSON report. Ctrl-C stops the run between requests.

mod cli;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use courier_application::{CancellationToken, CollectionRunner, ExecuteRequest, RunOptions};
use courier_infrastructure::{
    BoaScriptEngine, FileEnvironmentStore, ReqwestDispatcher, load_settings, to_json_stable,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, RunArgs, load_data, load_plan};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let settings = load_settings(args.config.as_deref()).context("loading settings")?;
    let plan = load_plan(&args.plan)?;
    let data = args.data.as_deref().map(load_data).transpose()?.unwrap_or_default();

    let dispatcher =
        ReqwestDispatcher::new(settings.http.clone()).context("creating HTTP client")?;
    let engine = BoaScriptEngine::new(settings.scripting.clone());
    let mut runner = CollectionRunner::new(ExecuteRequest::new(Arc::new(dispatcher), Arc::new(engine)));
    if let Some(path) = &args.environment {
        runner = runner.with_environment_store(Arc::new(FileEnvironmentStore::new(path)));
    }
    let variables = runner.load_variables().await.context("loading environment")?;

    let iterations = args
        .iterations
        .or_else(|| data.is_empty().then_some(settings.runner.iterations));
    let mut options = RunOptions::default()
        .with_data(data)
        .with_delay(Duration::from_millis(settings.runner.delay_between_requests_ms))
        .with_persistence(settings.runner.persist_environment && args.environment.is_some());
    options.iterations = iterations;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping after the current request");
            on_interrupt.cancel();
        }
    });

    let outcome = Arc::new(runner)
        .spawn(plan, variables, options, cancel)
        .await
        .context("run task failed")?;

    let report = to_json_stable(&outcome.report).context("serializing report")?;
    write_report(args.output.as_deref(), &report)?;

    let summary = outcome.report.summary();
    info!(
        requests = summary.requests,
        passed = summary.passed,
        tests_failed = summary.tests.failed,
        "report written"
    );
    Ok(if outcome.report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_report(output: Option<&Path>, report: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, report)
            .with_context(|| format!("writing report {}", path.display())),
        None => {
            print!("{report}");
            Ok(())
        }
    }
}
