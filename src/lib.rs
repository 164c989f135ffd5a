pub mod breakdown;
pub mod cli;
pub mod coerce;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod frame;
pub mod io_utils;
pub mod kpi;
pub mod loader;
pub mod mapping;
pub mod mapping_cmd;
pub mod preview;
pub mod report;
pub mod session;
pub mod summary;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    error::DashboardError,
    filter::candidate_values,
    session::Session,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("mis_dash", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => summary::execute(&args),
        Commands::Columns(args) => handle_columns(&args),
        Commands::Values(args) => handle_values(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Report(args) => report::execute(&args),
        Commands::Mapping(args) => mapping_cmd::execute(&args),
    }
}

fn handle_columns(args: &cli::ColumnsArgs) -> Result<()> {
    let session = Session::from_args(&args.data)?;
    let outcome = session.column_mapping();
    mapping_cmd::print_assignments(outcome);
    info!(
        "{} of {} standard field(s) mapped",
        outcome.mapped_count(),
        outcome.assignments.len()
    );
    Ok(())
}

fn handle_values(args: &cli::ValuesArgs) -> Result<()> {
    if !args.column.is_categorical() {
        return Err(DashboardError::NotCategorical(args.column.to_string()).into());
    }
    let session = Session::from_args(&args.data)?;
    let values = candidate_values(session.dataset(), args.column);
    debug!("{} candidate value(s) for {}", values.len(), args.column);
    for value in &values {
        println!("{value}");
    }
    Ok(())
}
