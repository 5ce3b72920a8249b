// Status registry
//
// StatusRegistry is the single aggregation point for the bot's startup state:
// configuration-derived settings, version-control provenance with the chat
// banners built from it, runtime flags, and lock-guarded counters.

pub mod counters;

pub use counters::{ApiRequestState, Counters, ScanStats};

use crate::config::{ConfigEntries, ConfigLoadError, ConfigOrigin, ConfigSource};
use crate::models::{
    Banners, DEFAULT_REPO_SLUG, RepositoryCommit, RuntimeEnv, ServiceSettings, StartupMode,
};
use crate::repository::{RepositoryQueryError, VersionControl, repo_slug_from_url};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Errors surfaced by the registry.
///
/// Both are fatal from [`StatusRegistry::initialize`]. A repository error from
/// a later [`StatusRegistry::reload`] is recoverable: the previous banners stay
/// in effect.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("Failed to query repository: {0}")]
    Repository(#[from] RepositoryQueryError),
}

/// Everything derived from version control, replaced as one unit on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub commit: RepositoryCommit,
    pub commit_with_author: String,
    /// Checked-out branch; empty on a detached `HEAD`
    pub on_branch: String,
    pub banners: Banners,
}

/// Serializable view of the registry for operators.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub config_origin: String,
    pub settings: ServiceSettings,
    pub provenance: Provenance,
    pub startup_utc: String,
    pub standby_mode: bool,
    pub metasmoke_down: bool,
    pub scan_stats: ScanStats,
    pub api_quota: i64,
    pub api_backoff: f64,
    pub metasmoke_failures: u32,
    pub api_calls_per_site: indexmap::IndexMap<String, u64>,
}

/// Process-wide runtime state.
///
/// Built once by [`initialize`](Self::initialize) and shared as
/// `Arc<StatusRegistry>`. Settings are immutable after construction;
/// provenance changes only through [`reload`](Self::reload); flags and
/// [`Counters`] are mutated concurrently by workers.
pub struct StatusRegistry {
    settings: ServiceSettings,
    config_origin: ConfigOrigin,
    vcs: Box<dyn VersionControl>,

    /// Serializes reloads so banner updates stay all-or-nothing
    reload_lock: Mutex<()>,
    provenance: RwLock<Provenance>,

    standby_mode: AtomicBool,
    metasmoke_down: AtomicBool,

    counters: Counters,

    startup_utc_date: DateTime<Utc>,
}

impl StatusRegistry {
    /// Load configuration, resolve settings and run the first reload.
    ///
    /// Must complete before any other thread touches the registry; callers
    /// sequence this at startup. Every error is fatal here, since the
    /// startup banners are required.
    ///
    /// # Errors
    /// [`RegistryError::Config`] when no usable configuration exists,
    /// [`RegistryError::Repository`] when the `HEAD` commit cannot be read.
    pub fn initialize(
        source: &ConfigSource,
        env: &RuntimeEnv,
        vcs: Box<dyn VersionControl>,
    ) -> Result<Self, RegistryError> {
        let config = source.load(env.test_mode)?;
        Self::from_entries(&config, env, vcs)
    }

    /// Build the registry from configuration that is already loaded.
    ///
    /// # Errors
    /// [`RegistryError::Repository`] when the first provenance query fails.
    pub fn from_entries(
        config: &ConfigEntries,
        env: &RuntimeEnv,
        vcs: Box<dyn VersionControl>,
    ) -> Result<Self, RegistryError> {
        // The remote is only consulted when the environment does not name the repo
        let derived_slug = match &env.repo_slug {
            Some(slug) => slug.clone(),
            None => derive_repo_slug(vcs.as_ref()),
        };
        let settings = ServiceSettings::resolve(config, env, &derived_slug);

        let provenance = compose_provenance(&settings, vcs.as_ref())?;

        let registry = Self {
            settings,
            config_origin: config.origin().clone(),
            vcs,
            reload_lock: Mutex::new(()),
            provenance: RwLock::new(provenance),
            standby_mode: AtomicBool::new(false),
            metasmoke_down: AtomicBool::new(false),
            counters: Counters::new(),
            startup_utc_date: Utc::now(),
        };

        tracing::info!(
            "Status registry initialized: bot={}, repo={}, location={}, config={}",
            registry.settings.bot_name,
            registry.settings.bot_repo_slug,
            registry.settings.location,
            registry.config_origin
        );

        Ok(registry)
    }

    /// Re-read commit and branch and recompute every banner.
    ///
    /// Safe to call at any time after initialization; concurrent reloads
    /// are serialized. Either all provenance fields change or none do.
    ///
    /// # Errors
    /// [`RegistryError::Repository`] when version control cannot be queried.
    /// The error is logged and the previous provenance is kept.
    pub fn reload(&self) -> Result<(), RegistryError> {
        let _serialized = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match compose_provenance(&self.settings, self.vcs.as_ref()) {
            Ok(provenance) => {
                let commit = provenance.commit.short_id.clone();
                *self.provenance.write().unwrap_or_else(PoisonError::into_inner) = provenance;
                tracing::debug!("Status registry reloaded at {}", commit);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Reload failed, keeping previous banners: {}", err);
                Err(err.into())
            }
        }
    }

    // Read surface

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn config_origin(&self) -> &ConfigOrigin {
        &self.config_origin
    }

    /// Execute a function with read access to the current provenance.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Provenance) -> R,
    {
        let provenance = self.provenance.read().unwrap_or_else(PoisonError::into_inner);
        f(&provenance)
    }

    /// Consistent copy of commit, branch and banners.
    pub fn provenance(&self) -> Provenance {
        self.read(Provenance::clone)
    }

    pub fn commit(&self) -> RepositoryCommit {
        self.read(|p| p.commit.clone())
    }

    pub fn commit_with_author(&self) -> String {
        self.read(|p| p.commit_with_author.clone())
    }

    pub fn on_branch(&self) -> String {
        self.read(|p| p.on_branch.clone())
    }

    pub fn banners(&self) -> Banners {
        self.read(|p| p.banners.clone())
    }

    /// The startup announcement for `mode`.
    pub fn startup_message(&self, mode: StartupMode) -> String {
        self.read(|p| p.banners.startup_for(mode).to_string())
    }

    pub fn startup_utc_date(&self) -> DateTime<Utc> {
        self.startup_utc_date
    }

    /// Startup time as `HH:MM:SS` UTC.
    pub fn startup_utc(&self) -> String {
        self.startup_utc_date.format("%H:%M:%S").to_string()
    }

    // Runtime flags

    pub fn is_standby(&self) -> bool {
        self.standby_mode.load(Ordering::Acquire)
    }

    pub fn enter_standby(&self) {
        if !self.standby_mode.swap(true, Ordering::AcqRel) {
            tracing::info!("Entering standby mode");
        }
    }

    pub fn leave_standby(&self) {
        if self.standby_mode.swap(false, Ordering::AcqRel) {
            tracing::info!("Leaving standby mode");
        }
    }

    pub fn is_metasmoke_down(&self) -> bool {
        self.metasmoke_down.load(Ordering::Acquire)
    }

    pub fn set_metasmoke_down(&self, down: bool) {
        if self.metasmoke_down.swap(down, Ordering::AcqRel) != down {
            tracing::warn!("Metasmoke marked {}", if down { "down" } else { "up" });
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn status_report(&self) -> StatusReport {
        let api = self.counters.api_request_snapshot();
        StatusReport {
            config_origin: self.config_origin.to_string(),
            settings: self.settings.clone(),
            provenance: self.provenance(),
            startup_utc: self.startup_utc(),
            standby_mode: self.is_standby(),
            metasmoke_down: self.is_metasmoke_down(),
            scan_stats: self.counters.scan_stats(),
            api_quota: api.quota,
            api_backoff: api.backoff,
            metasmoke_failures: api.service_failures,
            api_calls_per_site: api.calls_per_site,
        }
    }
}

/// Slug from the `origin` remote, or the upstream default when the remote is
/// missing or not a GitHub https URL.
fn derive_repo_slug(vcs: &dyn VersionControl) -> String {
    match vcs.remote_origin_url() {
        Ok(url) => repo_slug_from_url(&url).unwrap_or_else(|| DEFAULT_REPO_SLUG.to_string()),
        Err(err) => {
            tracing::warn!("Could not read origin remote, using {}: {}", DEFAULT_REPO_SLUG, err);
            DEFAULT_REPO_SLUG.to_string()
        }
    }
}

/// Query version control and build provenance without touching the registry.
fn compose_provenance(
    settings: &ServiceSettings,
    vcs: &dyn VersionControl,
) -> Result<Provenance, RepositoryQueryError> {
    let commit = vcs.current_commit()?;
    let on_branch = vcs.current_branch()?;
    let banners = Banners::compose(settings, &commit);

    Ok(Provenance {
        commit_with_author: commit.with_author(),
        commit,
        on_branch,
        banners,
    })
}
