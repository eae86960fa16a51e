//! ddtail CLI
//!
//! Entry point for the `ddtail` command-line tool.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use ddtail::config::{ConfigOrigin, Settings};
use ddtail::exit::ExitCode;
use ddtail::logging::init_logging;
use ddtail::query::{parse_range, parse_time};
use ddtail::session::{self, SearchOptions, SessionError};
use ddtail::signal::SignalHandler;
use tracing::debug;

#[derive(Parser)]
#[command(name = "ddtail")]
#[command(about = "Search and tail hosted logs", version)]
struct Cli {
    /// Path to config file (default: ~/.ddtail.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search logs once, or follow them as they arrive
    Search(SearchArgs),

    /// Show the effective configuration and where it came from
    Config {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Keep polling for new entries
    #[arg(long, short = 'f')]
    follow: bool,

    /// Relative window, e.g. 90, 30s, 15m, 2h, 1d
    #[arg(long, short = 'r', value_parser = parse_range)]
    range: Option<Duration>,

    /// Absolute start ("YYYY-MM-DD HH:MM:SS" local, or RFC 3339)
    #[arg(long, value_parser = parse_time)]
    start: Option<DateTime<Utc>>,

    /// Absolute end ("YYYY-MM-DD HH:MM:SS" local, or RFC 3339)
    #[arg(long, value_parser = parse_time)]
    end: Option<DateTime<Utc>>,

    /// Search text (default: match everything)
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Page size
    #[arg(long, short = 'l', allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Show timestamps in UTC instead of the local zone
    #[arg(long)]
    utc: bool,

    /// Print each entry as JSON instead of through the formats
    #[arg(long, short = 'j')]
    json: bool,
}

impl SearchArgs {
    fn into_options(self) -> SearchOptions {
        let color = if self.color {
            true
        } else if self.no_color {
            false
        } else {
            io::stdout().is_terminal()
        };

        SearchOptions {
            follow: self.follow,
            range: self.range,
            start: self.start,
            end: self.end,
            text: self.query,
            limit: self.limit,
            color,
            utc: self.utc,
            json: self.json,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search(args) => run_search(cli.config, args.into_options()),
        Commands::Config { json } => run_config(cli.config, json),
    }
}

fn run_search(config_path: Option<PathBuf>, options: SearchOptions) {
    let stop = if options.follow {
        let signals = SignalHandler::new();
        if let Err(e) = signals.install() {
            debug!("Cannot install signal handler: {}", e);
        }
        Some(signals.state().stop_flag())
    } else {
        None
    };

    if let Err(e) = search(config_path, &options, stop) {
        if e.is_broken_pipe() {
            process::exit(ExitCode::Success.code());
        }
        eprintln!("{}: {}", e.failure_kind().description(), e);
        process::exit(e.exit_code());
    }
}

fn search(
    config_path: Option<PathBuf>,
    options: &SearchOptions,
    stop: Option<Arc<AtomicBool>>,
) -> Result<(), SessionError> {
    let settings = Settings::load(config_path.as_deref(), options.cli_overrides())?;
    let transport = session::connect(&settings)?;
    let mut engine = session::build_engine(&settings, options, transport)?;
    if let Some(flag) = stop {
        engine = engine.with_stop_flag(flag);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    session::run(&mut engine, options.follow, &mut out)
}

fn run_config(config_path: Option<PathBuf>, json: bool) {
    let settings = match Settings::load(config_path.as_deref(), None) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(e.exit_code());
        }
    };

    let shown = if json {
        serde_json::to_string_pretty(&settings.to_display_json()).map_err(|e| e.to_string())
    } else {
        Ok(config_summary(&settings))
    };

    match shown {
        Ok(text) => {
            let mut out = io::stdout().lock();
            if writeln!(out, "{}", text).is_err() {
                process::exit(ExitCode::Success.code());
            }
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(ExitCode::Failure.code());
        }
    }
}

fn config_summary(settings: &Settings) -> String {
    let mut lines = vec!["Sources:".to_string()];
    for source in settings.sources() {
        let origin = match source.origin {
            ConfigOrigin::Builtin => "builtin",
            ConfigOrigin::File => "file",
            ConfigOrigin::Cli => "cli",
        };
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => lines.push(format!("  {}: {} (sha256 {})", origin, path, digest)),
            (Some(path), None) => lines.push(format!("  {}: {}", origin, path)),
            _ => lines.push(format!("  {}", origin)),
        }
    }

    let (config, redactions) = settings.redacted();
    lines.push(String::new());
    let body = toml::to_string_pretty(&config)
        .or_else(|_| serde_json::to_string_pretty(&config))
        .unwrap_or_default();
    lines.push(body.trim_end().to_string());

    if !redactions.is_empty() {
        lines.push(String::new());
        lines.push(format!("Redacted: {}", redactions.join(", ")));
    }
    lines.join("\n")
}
