//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_event_sink::LogEventSink;
use crate::domain::context::{EngineConfig, EvalContext};
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::indicator::service::IndicatorService;
use crate::domain::parser;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "maestro", about = "Trading-strategy DSL evaluation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a strategy file to a target allocation
    Evaluate {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Historical as-of date (YYYY-MM-DD); defaults to live
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print the decision path after the allocation
        #[arg(long)]
        decisions: bool,
    },
    /// Parse a strategy file and report syntax errors
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List all registered operator symbols
    Operators,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            strategy,
            config,
            as_of,
            decisions,
        } => run_evaluate(&strategy, config.as_ref(), as_of, decisions),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Operators => run_operators(),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = MaestroError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_strategy(path: &PathBuf) -> Result<crate::domain::ast::AstNode, ExitCode> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            let err = MaestroError::Io(e);
            eprintln!("error: {err}");
            return Err(ExitCode::from(&err));
        }
    };
    parser::parse_strategy(&source).map_err(|e| {
        eprintln!("error: syntax error in {}", path.display());
        eprintln!("{}", e.display_with_context(&source));
        let err = MaestroError::Parse(e);
        ExitCode::from(&err)
    })
}

fn run_evaluate(
    strategy_path: &PathBuf,
    config_path: Option<&PathBuf>,
    as_of: Option<NaiveDate>,
    decisions: bool,
) -> ExitCode {
    let ast = match load_strategy(strategy_path) {
        Ok(ast) => ast,
        Err(code) => return code,
    };

    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(adapter) => Some(adapter),
            Err(code) => return code,
        },
        None => None,
    };

    let csv_dir = config
        .as_ref()
        .and_then(|c| c.get_string("market_data", "csv_dir"))
        .unwrap_or_else(|| ".".to_string());
    let market_data = CsvAdapter::new(PathBuf::from(csv_dir));
    let indicators = IndicatorService::new(&market_data);
    let events = LogEventSink;

    let mut ctx = EvalContext::new(&market_data, &indicators).with_events(&events);
    if let Some(date) = as_of {
        ctx = ctx.with_as_of(date);
    }
    if let Some(adapter) = &config {
        ctx = ctx.with_config(EngineConfig::from_config(adapter));
    }

    #[cfg(feature = "sqlite")]
    let cache: Option<crate::adapters::sqlite_cache::SqliteReturnCache> = match &config {
        Some(adapter) if adapter.get_string("sqlite", "path").is_some() => {
            match crate::adapters::sqlite_cache::SqliteReturnCache::from_config(adapter)
                .and_then(|cache| {
                    cache.initialize_schema()?;
                    Ok(cache)
                }) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        _ => None,
    };
    #[cfg(feature = "sqlite")]
    if let Some(cache) = &cache {
        ctx = ctx.with_return_cache(cache);
    }

    let evaluator = Evaluator::new();
    let allocation = match evaluator.evaluate(&ast, &mut ctx) {
        Ok(allocation) => allocation,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("correlation id: {}", ctx.correlation_id);
    for (symbol, weight) in &allocation {
        println!("{symbol}\t{weight}");
    }
    if decisions {
        println!();
        for node in &ctx.decision_path {
            println!(
                "[{}] {} -> {}",
                node.branch, node.condition, node.result
            );
        }
        for entry in &ctx.trace {
            println!("trace: {entry}");
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(strategy_path: &PathBuf) -> ExitCode {
    match load_strategy(strategy_path) {
        Ok(_) => {
            println!("{}: ok", strategy_path.display());
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_operators() -> ExitCode {
    let evaluator = Evaluator::new();
    for symbol in evaluator.registry().list_symbols() {
        println!("{symbol}");
    }
    ExitCode::SUCCESS
}
