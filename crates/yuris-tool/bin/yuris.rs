//! YU-RIS archive tool binary entry point.
//!
//! This is a thin wrapper around the yuris-tool library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Validates configuration
//! 4. Runs the selected command
//!
//! For library usage, see the yuris-tool crate documentation.

use anyhow::Result;
use yuris_tool::{ToolConfig, commands};

fn main() -> Result<()> {
    // Parse first so --verbose can pick the default filter
    let config = ToolConfig::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    tracing::debug!("Configuration loaded: {:?}", config);

    commands::run(&config, &mut std::io::stdout().lock())
}
