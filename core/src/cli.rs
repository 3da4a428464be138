use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value as JsonValue};

use crate::config::Config;
use crate::interpreter::{Evaluator, Limits, Outcome, StatsReporter, TestReporter, Value};
use crate::lexer;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Cinder - a concatenative stack language", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a source file and print the final stack
    Run {
        /// Source file to run
        file: PathBuf,

        /// Print the stack as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the token stream of a source file
    Tokens {
        /// Source file to tokenize
        file: PathBuf,

        /// Print tokens as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with explicit arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load eagerly so config errors show before any command output
    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .build()?;

    match cli.command {
        Commands::Run { file, json } => run_file(&config, &file, json).await,
        Commands::Tokens { file, json } => {
            let source = read_source(&file)?;
            let tokens = lexer::tokenize(&source)
                .with_context(|| format!("failed to tokenize {}", file.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in tokens {
                    println!("{}\t{:?}", token.origin, token.kind);
                }
            }
            Ok(())
        }
    }
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

async fn run_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    let source = read_source(file)?;
    let tokens = lexer::tokenize(&source)
        .with_context(|| format!("failed to tokenize {}", file.display()))?;

    let reporter = Rc::new(RefCell::new(StatsReporter::new()));
    let mut ev = Evaluator::new()
        .with_limits(Limits::from(config))
        .with_reporter(reporter.clone());

    let run = ev.start(tokens);
    let cancel = run.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    let outcome = run.finish().await;
    ctrl_c.abort();

    match outcome {
        Outcome::Completed => {}
        Outcome::Failed(error) => bail!("{}: {}", file.display(), error),
        Outcome::Cancelled => bail!("run cancelled"),
    }

    if json {
        let stack: Vec<JsonValue> = ev.stack.iter().map(to_json).collect();
        println!("{}", serde_json::to_string_pretty(&stack)?);
    } else {
        for value in ev.stack.iter() {
            println!("{}", value);
        }
    }

    let reporter = reporter.borrow();
    if reporter.total() > 0 {
        reporter.show_stats();
        if reporter.failed() > 0 {
            bail!(
                "{} of {} assertions failed",
                reporter.failed(),
                reporter.total()
            );
        }
    }
    Ok(())
}

/// JSON rendering of a stack value; kinds without a JSON shape print as text
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Int(n) => json!(n),
        Value::Flt(n) => json!(n),
        Value::Bool(b) => json!(b),
        Value::Str(s) => json!(s.as_ref()),
        Value::Nil => JsonValue::Null,
        Value::Arr(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        Value::Err(err) => json!({ "error": err.message(), "origin": err.origin }),
        Value::Sym(_)
        | Value::ExeArr(_)
        | Value::Lam(_)
        | Value::Op(_)
        | Value::Params(_)
        | Value::Marker(_)
        | Value::Ref(_) => json!(value.to_string()),
    }
}
