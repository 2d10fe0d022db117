//! hashsync CLI Binary
//!
//! Command-line interface for hashtree actualization, comparison and apply.

use clap::Parser;
use hashsync::cli::{map_error, Cli, RunContext};
use hashsync::config::ConfigLoader;
use hashsync::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = match build_logging_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("hashsync starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => {
            info!(storage = %ctx.storage_dir().display(), "CLI context initialized");
            ctx
        }
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the config file
fn build_logging_config(cli: &Cli) -> Result<LoggingConfig, String> {
    // Without --verbose logging stays off
    if !cli.verbose {
        let mut config = LoggingConfig::default();
        config.level = "off".to_string();
        return Ok(config);
    }

    let mut config = ConfigLoader::load_with_file(&cli.workspace, cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    // CLI arguments have the highest priority
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.parse()?;
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.parse()?;
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    } else if config.file.is_relative() {
        config.file = cli.workspace.join(&config.file);
    }

    Ok(config)
}
