//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::{Commands, ConfigCommands};

/// Command name string for log spans (e.g. "actualize", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Actualize { .. } => "actualize".to_string(),
        Commands::Compare { .. } => "compare".to_string(),
        Commands::Pack { .. } => "pack".to_string(),
        Commands::Apply { .. } => "apply".to_string(),
        Commands::Sync { .. } => "sync".to_string(),
        Commands::Status { .. } => "status".to_string(),
        Commands::Watch { .. } => "watch".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
        ConfigCommands::Validate => "validate",
    }
}
