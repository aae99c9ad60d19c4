//! CLI domain: parse and route only. Dispatches to the collector's services.

mod parse;
mod route;

pub use parse::{Cli, Commands};
pub use route::{format_registry_summary, RunContext};

/// Stable command name for logs
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Serve => "serve",
        Commands::Report { .. } => "report",
        Commands::CheckRegistry { .. } => "check-registry",
        Commands::Config => "config",
        Commands::Version => "version",
    }
}
