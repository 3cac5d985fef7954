#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the collision dashboard.
//!
//! ```text
//! crash_dash_cli query "night crashes in 2021" --borough Queens [--top 10]
//! crash_dash_cli options
//! crash_dash_cli interpret "Brooklyn 2022 pedestrian crashes"
//! ```
//!
//! Results are written to stdout as JSON. Logging goes to stderr and is
//! controlled with `RUST_LOG`.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use crash_dash_analytics::{DashboardService, ServiceConfig};
use crash_dash_analytics_models::{DashboardRequest, DashboardResults, Question};
use crash_dash_query::FilterResolver;
use crash_dash_query_models::Filter;
use crash_dash_store::{StoreError, loader};
use serde::Serialize;

use crate::config::{Config, DataConfig};

#[derive(Parser)]
#[command(name = "crash_dash_cli", about = "Query NYC motor vehicle collision data")]
struct Cli {
    /// TOML file merged over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags taking precedence over the config file.
#[derive(Args)]
struct Overrides {
    /// Crash-level CSV export (`.csv` or `.csv.gz`)
    #[arg(long, global = true)]
    crashes: Option<PathBuf>,
    /// Person-level CSV export (`.csv` or `.csv.gz`)
    #[arg(long, global = true)]
    persons: Option<PathBuf>,
    /// First year of the dataset window
    #[arg(long, global = true)]
    window_start: Option<i32>,
    /// Last year of the dataset window
    #[arg(long, global = true)]
    window_end: Option<i32>,
    /// Hotspot grid cell size in degrees
    #[arg(long, global = true)]
    grid_degrees: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the dashboard results for a request
    Query {
        #[command(flatten)]
        request: RequestArgs,
        /// Only print this question's result (e.g. `factor_fatality`)
        #[arg(long, value_parser = parse_question)]
        question: Option<Question>,
        /// Keep the N largest groups per result and fold the rest into "Other"
        #[arg(long)]
        top: Option<usize>,
    },
    /// List the dropdown options present in the data
    Options,
    /// Show the filter a request resolves to, without loading any data
    Interpret {
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// Free-text search phrase
    text: Option<String>,
    /// Borough dropdown value (e.g. "Queens", "ALL")
    #[arg(long)]
    borough: Option<String>,
    /// Year dropdown value: a year or an inclusive range like 2019-2021
    #[arg(long)]
    year: Option<String>,
    /// Vehicle type dropdown value (e.g. "Sedan", "Bicycle")
    #[arg(long)]
    vehicle_type: Option<String>,
    /// Person type dropdown value (e.g. "Pedestrian")
    #[arg(long)]
    person_type: Option<String>,
}

impl From<RequestArgs> for DashboardRequest {
    fn from(args: RequestArgs) -> Self {
        Self {
            borough: args.borough,
            year: args.year,
            vehicle_type: args.vehicle_type,
            person_type: args.person_type,
            text: args.text,
        }
    }
}

/// Output of the `interpret` command.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Interpretation {
    request: DashboardRequest,
    filter: Filter,
    summary: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, cli.overrides);
    let service_config = config.service_config()?;

    match cli.command {
        Commands::Interpret { request } => {
            let request = DashboardRequest::from(request);
            let filter = FilterResolver::with_window(service_config.window).resolve(&request)?;
            let summary = filter.to_string();
            print_json(&Interpretation {
                request,
                filter,
                summary,
            })?;
        }
        Commands::Options => {
            let service = open_service(&config.data, service_config)?;
            print_json(&service.options())?;
        }
        Commands::Query {
            request,
            question,
            top,
        } => {
            let service = open_service(&config.data, service_config)?;
            let results = service.query(&DashboardRequest::from(request))?;
            print_json(&select(&results, question, top))?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, overrides: Overrides) {
    if let Some(crashes) = overrides.crashes {
        config.data.crashes = crashes;
    }
    if let Some(persons) = overrides.persons {
        config.data.persons = persons;
    }
    if let Some(start) = overrides.window_start {
        config.window.start = start;
    }
    if let Some(end) = overrides.window_end {
        config.window.end = end;
    }
    if let Some(degrees) = overrides.grid_degrees {
        config.hotspots.grid_degrees = degrees;
    }
}

fn open_service(
    data: &DataConfig,
    service_config: ServiceConfig,
) -> Result<DashboardService, StoreError> {
    let store = loader::load_store(&data.crashes, &data.persons, service_config.window)?;
    Ok(DashboardService::new(Arc::new(store), service_config))
}

fn parse_question(value: &str) -> Result<Question, String> {
    value.parse().map_err(|_| {
        let names: Vec<&str> = Question::all().iter().map(AsRef::as_ref).collect();
        format!("unknown question '{value}', expected one of: {}", names.join(", "))
    })
}

/// Narrows `results` to one question and truncates each result to its
/// largest groups.
fn select(
    results: &DashboardResults,
    question: Option<Question>,
    top: Option<usize>,
) -> DashboardResults {
    DashboardResults {
        filter: results.filter.clone(),
        summary: results.summary,
        results: results
            .results
            .iter()
            .filter(|r| question.is_none_or(|q| q == r.question))
            .map(|r| top.map_or_else(|| r.clone(), |n| r.top_n(n)))
            .collect(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
