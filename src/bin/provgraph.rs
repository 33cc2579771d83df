//! provgraph CLI Binary
//!
//! Command-line interface for checking and repairing the provenance graph.

use clap::Parser;
use provgraph::cli::{Cli, RunContext};
use provgraph::config::ConfigLoader;
use provgraph::logging::{default_log_file_path, init_logging, LoggingConfig};
use std::io::Write;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("provgraph starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => {
            info!("CLI context initialized");
            ctx
        }
        Err(e) => {
            error!("Error opening graph store: {}", e);
            eprintln!("{}", provgraph::cli::map_error(&e));
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = match context.execute(&cli.command, &mut out) {
        Ok(status) => {
            info!(?status, "Command completed");
            status.exit_code()
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", provgraph::cli::map_error(&e));
            1
        }
    };
    let _ = out.flush();
    drop(out);
    // Flush sled before exiting; process::exit skips destructors.
    drop(context);
    process::exit(code);
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    if config.enabled && config.output == "file" && config.file.is_none() {
        config.file = default_log_file_path(&cli.workspace);
    }

    config
}
