//! Command-line parsing for the `energy-feeds` binary.

use std::env;
use std::path::PathBuf;

use crate::model::{DateRange, RegionKind};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Regions {
        kind: RegionKind,
    },
    Production {
        kind: RegionKind,
        code: String,
        range: DateRange,
    },
    Reserves {
        kind: RegionKind,
        code: String,
        range: DateRange,
    },
    Latest {
        kind: RegionKind,
        code: String,
    },
    Top {
        kind: RegionKind,
        limit: Option<usize>,
    },
    Ingest {
        connector: String,
        source: String,
    },
    #[cfg(feature = "api")]
    Serve {
        port: u16,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub command: Command,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

/// Flags collected after the subcommand name.
#[derive(Default)]
struct Flags {
    kind: Option<RegionKind>,
    code: Option<String>,
    start: Option<String>,
    end: Option<String>,
    limit: Option<usize>,
    connector: Option<String>,
    source: Option<String>,
    #[cfg_attr(not(feature = "api"), allow(dead_code))]
    port: Option<u16>,
}

pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut config = None;
    let mut command_name = None;
    let mut flags = Flags::default();

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                return Ok(CliOptions {
                    config,
                    command: Command::Help,
                });
            }
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--kind" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --kind (US_STATE or CA_PROVINCE)")?;
                flags.kind = Some(raw.parse()?);
            }
            "--code" => {
                i += 1;
                flags.code = Some(args.next_or_err(i, "missing value for --code")?.to_string());
            }
            "--start" => {
                i += 1;
                flags.start = Some(args.next_or_err(i, "missing value for --start")?.to_string());
            }
            "--end" => {
                i += 1;
                flags.end = Some(args.next_or_err(i, "missing value for --end")?.to_string());
            }
            "--limit" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --limit")?;
                let limit = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("--limit value \"{raw}\" is not a positive integer"))?;
                flags.limit = Some(limit);
            }
            "--connector" => {
                i += 1;
                flags.connector = Some(args.next_or_err(i, "missing value for --connector")?.to_string());
            }
            "--source" => {
                i += 1;
                flags.source = Some(args.next_or_err(i, "missing value for --source")?.to_string());
            }
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port")?;
                let port = raw
                    .parse::<u16>()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
                flags.port = Some(port);
            }
            other if other.starts_with('-') => return Err(format!("unknown argument: {other}")),
            other => {
                if let Some(prev) = command_name.replace(other.to_string()) {
                    return Err(format!("unexpected argument \"{other}\" after command \"{prev}\""));
                }
            }
        }
        i += 1;
    }

    let name = command_name.ok_or_else(|| "missing command (try --help)".to_string())?;
    let command = build_command(&name, flags)?;
    Ok(CliOptions { config, command })
}

fn build_command(name: &str, flags: Flags) -> Result<Command, String> {
    let kind = flags.kind.unwrap_or(RegionKind::UsState);
    let code = || {
        flags
            .code
            .clone()
            .ok_or_else(|| format!("`{name}` requires --code"))
    };
    let range = || DateRange::new(flags.start.clone(), flags.end.clone());

    match name {
        "regions" => Ok(Command::Regions { kind }),
        "production" => Ok(Command::Production {
            kind,
            code: code()?,
            range: range(),
        }),
        "reserves" => Ok(Command::Reserves {
            kind,
            code: code()?,
            range: range(),
        }),
        "latest" => Ok(Command::Latest { kind, code: code()? }),
        "top" => Ok(Command::Top {
            kind,
            limit: flags.limit,
        }),
        "ingest" => Ok(Command::Ingest {
            connector: flags
                .connector
                .clone()
                .ok_or_else(|| "`ingest` requires --connector".to_string())?,
            source: flags
                .source
                .clone()
                .ok_or_else(|| "`ingest` requires --source".to_string())?,
        }),
        #[cfg(feature = "api")]
        "serve" => Ok(Command::Serve {
            port: flags.port.unwrap_or(DEFAULT_PORT),
        }),
        other => Err(format!("unknown command: {other}")),
    }
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("energy-feeds: regional crude production and reserves feeds");
    eprintln!();
    eprintln!("Usage: energy-feeds [--config <path>] <command> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  regions     [--kind K]                               List supported regions");
    eprintln!("  production  --code C [--kind K] [--start P] [--end P] Monthly production series");
    eprintln!("  reserves    --code C [--kind K] [--start P] [--end P] Annual proved reserves");
    eprintln!("  latest      --code C [--kind K]                      Most recent production reading");
    eprintln!("  top         [--kind K] [--limit N]                   Top producing regions");
    eprintln!("  ingest      --connector NAME --source S              Run a batch ingest");
    #[cfg(feature = "api")]
    eprintln!("  serve       [--port N]                               Serve the HTTP API (default {DEFAULT_PORT})");
    eprintln!();
    eprintln!("K is US_STATE (default) or CA_PROVINCE. Output is JSON on stdout.");
}
