//! # Gametest Runner - Main Entry Point
//!
//! Binary front end for the event-driven in-game integration-test harness.
//! This entry point handles CLI parsing, configuration loading, logging
//! setup, and suite execution.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the full built-in suite with default configuration
//! gametest
//!
//! # Specify custom configuration
//! gametest --config slow_world.toml
//!
//! # Run a subset of cases
//! gametest --filter creeper
//!
//! # JSON logging for CI
//! gametest --json-logs
//! ```
//!
//! ## Configuration
//!
//! The runner loads configuration from a TOML file (default:
//! `config.toml`). If the file doesn't exist, a default configuration will
//! be created.
//!
//! ## Exit Codes
//!
//! * **0**: every executed test case passed
//! * **1**: a case failed, or startup/configuration failed

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the gametest runner.
///
/// Handles the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Suite execution and outcome reporting
///
/// Note: This function is called from an async context (main with
/// #[tokio::main]), so it should NOT have #[tokio::main] itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => match app.run().await {
            Ok(report) if report.all_passed() => {}
            Ok(_) => std::process::exit(1),
            Err(e) => {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{HarnessSettings, LoggingSettings};
