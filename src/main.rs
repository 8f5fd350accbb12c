//! beamscope - version 0.1.0
//!
//! Renders triage reports from Erlang process-info dumps.
//! This is the main entry point that runs the pipeline and handles subcommands.

mod cli;
mod commands;
mod config;
mod input;

use clap::Parser;
use tracing::{debug, Level};

use beamscope::{extract_processes, parse_document, render_report, ParseLimits};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_INPUT_MB,
};
use input::read_document;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(_config: &Config, args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    // The report owns stdout, so all logging goes to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    debug!("Logging initialized with level: {:?}", args.log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        if args.show_config {
            return show_config(&config, args.config_format);
        }
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config, &args);

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Check { input, verbose } => command_check(input.clone(), *verbose, &config),

            Commands::Config { output, format } => command_config(output.clone(), format.clone()),
        };
    }

    // Report mode: read, parse, shape-check, render
    let max_input_mb = config.max_input_mb.unwrap_or(DEFAULT_MAX_INPUT_MB);
    let limits = ParseLimits {
        max_depth: config.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
    };

    let text = read_document(args.input.as_deref(), max_input_mb as u64 * 1024 * 1024)?;

    let term = match parse_document(&text, &limits) {
        Ok(term) => term,
        Err(e) => {
            eprintln!("❌ Parse error: {}", e);
            std::process::exit(1);
        }
    };

    let records = match extract_processes(term) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Malformed dump: {}", e);
            std::process::exit(1);
        }
    };

    debug!("Rendering report for {} processes", records.len());
    print!("{}", render_report(&records));

    Ok(())
}
