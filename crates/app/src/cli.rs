//! Command-line arguments and input file loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use courier_domain::run::{IterationData, RunPlan};
use courier_infrastructure::from_json;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(
    name = "courier",
    version,
    about = "Run request plans with pre-request and post-response scripts",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every request of a plan, once per iteration
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Run plan (.json)
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Environment file; created on save when missing
    #[arg(short, long, value_name = "FILE")]
    pub environment: Option<PathBuf>,

    /// Iteration data: a JSON array of flat objects, one per iteration
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Number of iterations (defaults to the number of data rows)
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn load_plan(path: &Path) -> Result<RunPlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    from_json(&content).with_context(|| format!("parsing plan {}", path.display()))
}

pub fn load_data(path: &Path) -> Result<Vec<IterationData>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading data {}", path.display()))?;
    let value: Value =
        from_json(&content).with_context(|| format!("parsing data {}", path.display()))?;
    parse_rows(value).with_context(|| format!("invalid data in {}", path.display()))
}

fn parse_rows(value: Value) -> Result<Vec<IterationData>> {
    let Value::Array(rows) = value else {
        bail!("expected a JSON array of objects");
    };
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let Value::Object(fields) = row else {
                bail!("row {index} is not an object");
            };
            fields
                .into_iter()
                .map(|(name, value)| match value {
                    Value::String(text) => Ok((name, text)),
                    Value::Number(_) | Value::Bool(_) => Ok((name, value.to_string())),
                    Value::Null => Ok((name, String::new())),
                    other => bail!("row {index}: '{name}' has unsupported value {other}"),
                })
                .collect::<Result<IterationData>>()
        })
        .collect()
}
