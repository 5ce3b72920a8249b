// smokey-state - runtime state registry for the SmokeDetector monitoring bot
//
// This is the library crate holding configuration loading, version-control
// provenance and the shared status registry. The binary crate (main.rs)
// initializes logging and the registry and reports its status.

pub mod config;
pub mod logging;
pub mod models;
pub mod repository;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigEntries, ConfigLoadError, ConfigOrigin, ConfigSource};
pub use models::{Banners, RepositoryCommit, RuntimeEnv, ServiceSettings, StartupMode};
pub use repository::{GitCli, RepositoryQueryError, VersionControl};
pub use state::{Counters, Provenance, RegistryError, ScanStats, StatusRegistry};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
