//! `energy-feeds` entry point: CLI wiring, config loading, JSON output.

use std::path::Path;
use std::process;
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use energy_feeds::cli::{self, CliOptions, Command};
use energy_feeds::config::FeedsConfig;
use energy_feeds::ingestion::FetchOptions;
use energy_feeds::service::EnergyFeeds;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("energy_feeds=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &CliOptions) -> FeedsConfig {
    let config = match cli.config {
        Some(ref path) => match FeedsConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => FeedsConfig::defaults(),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to encode output: {e}");
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };
    if cli.command == Command::Help {
        cli::print_usage();
        return;
    }

    init_tracing();
    let config = load_config(&cli);
    let feeds = match EnergyFeeds::from_config(&config) {
        Ok(feeds) => Arc::new(feeds),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    match cli.command {
        Command::Regions { kind } => print_json(&feeds.regions(kind)),
        Command::Production { kind, code, range } => {
            print_json(&feeds.production(kind, &code, &range).await);
        }
        Command::Reserves { kind, code, range } => {
            print_json(&feeds.reserves(kind, &code, &range).await);
        }
        Command::Latest { kind, code } => print_json(&feeds.latest_production(kind, &code).await),
        Command::Top { kind, limit } => print_json(&feeds.top_producers(kind, limit).await),
        Command::Ingest { connector, source } => {
            match feeds.ingest(&connector, &source, &FetchOptions::default()).await {
                Ok(result) => print_json(&result),
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }
        #[cfg(feature = "api")]
        Command::Serve { port } => {
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            if let Err(e) = energy_feeds::api::serve(feeds, addr).await {
                eprintln!("error: API server failed: {e}");
                process::exit(1);
            }
        }
        Command::Help => cli::print_usage(),
    }
}
