//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that loads
//! configuration, assembles the test runner, executes the built-in scenario
//! suite, and reports outcomes.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner};
use gametest_harness::{builtin_suite, SuiteReport, TestCase, TestRunner};
use std::time::Duration;
use tracing::{error, info, warn};

/// Runs the scenario suite from configuration to a final report.
pub struct Application {
    config: AppConfig,
    filter: Option<String>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, and validates the merged
    /// settings.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        Ok(Self {
            config,
            filter: args.filter,
        })
    }

    /// Runs the suite and returns the aggregated report.
    ///
    /// A `--filter` substring narrows the suite to matching case names; a
    /// filter that matches nothing is reported and yields an empty report.
    pub async fn run(self) -> Result<SuiteReport, Box<dyn std::error::Error>> {
        let cases: Vec<TestCase> = match &self.filter {
            Some(needle) => {
                let cases: Vec<TestCase> = builtin_suite()
                    .into_iter()
                    .filter(|case| case.name().contains(needle.as_str()))
                    .collect();
                if cases.is_empty() {
                    warn!("🟡 Filter '{}' matched no test cases", needle);
                }
                cases
            }
            None => builtin_suite(),
        };
        info!("🚀 Running {} test case(s)", cases.len());

        let default_wait_timeout = match self.config.harness.default_wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let runner = TestRunner::new(self.config.world.clone())
            .with_default_wait_timeout(default_wait_timeout);

        let report = runner.run_suite(cases).await;
        if !report.all_passed() {
            for result in report.results.iter().filter(|r| !r.passed()) {
                error!("❌ {}: {:?}", result.name, result.outcome);
            }
        }
        Ok(report)
    }
}
