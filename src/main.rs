//! smokey-state - status registry bootstrap for SmokeDetector
//!
//! # Overview
//!
//! This binary builds the process-wide [`StatusRegistry`] from the current
//! working directory and reports what it found. It initializes:
//! - Configuration (`config`, or `config.ci` as fallback / in test mode)
//! - Logging (daily rotating file + console, timestamps in `log_time_format`)
//! - Version-control provenance and the chat banners built from it
//!
//! # Execution Flow
//!
//! 1. Capture `SMOKEDETECTOR_*` environment overrides
//! 2. Load the configuration (it also carries the log timestamp format)
//! 3. Initialize logging → logs/smokey.<date>
//! 4. Build the registry from that configuration (settings, first reload)
//! 5. Log the startup banner and print a JSON status report to stdout

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use smokey_state::logging::{LogOptions, setup_logging};
use smokey_state::models::DEFAULT_LOG_TIME_FORMAT;
use smokey_state::{APP_NAME, ConfigSource, GitCli, RuntimeEnv, StartupMode, StatusRegistry, VERSION};

fn main() -> Result<()> {
    let env = RuntimeEnv::from_process().context("Failed to read SMOKEDETECTOR_* variables")?;

    let workdir = Utf8PathBuf::try_from(
        std::env::current_dir().context("Failed to read current directory")?,
    )
    .context("Working directory is not valid UTF-8")?;
    let config = ConfigSource::new(&workdir)
        .load(env.test_mode)
        .context("Failed to load configuration")?;

    let _log_guard = setup_logging(&LogOptions {
        debug_mode: env.debug,
        time_format: config
            .get_or("log_time_format", DEFAULT_LOG_TIME_FORMAT)
            .to_string(),
        ..LogOptions::new("logs", "smokey")
    })?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Configuration loaded from {}", config.origin());

    let registry = StatusRegistry::from_entries(&config, &env, Box::new(GitCli::new(&workdir)))
        .context("Failed to initialize status registry")?;

    tracing::info!("{}", registry.startup_message(StartupMode::Normal));
    registry.counters().log_summary();

    let report = serde_json::to_string_pretty(&registry.status_report())
        .context("Failed to serialize status report")?;
    println!("{}", report);

    Ok(())
}
