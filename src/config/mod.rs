use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use ini::{Ini, ParseOption};
use std::fmt;
use thiserror::Error;

/// File name of the deployment configuration.
pub const PRIMARY_CONFIG_FILE: &str = "config";
/// File name of the checked-in continuous-integration configuration.
pub const FALLBACK_CONFIG_FILE: &str = "config.ci";
/// INI section holding every option the bot reads.
pub const CONFIG_SECTION: &str = "Config";

/// Errors that make configuration unavailable. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Configuration file not found: {0}")]
    Missing(Utf8PathBuf),

    #[error("Failed to parse configuration {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: ini::Error,
    },

    /// The file has no section named exactly `Config`.
    #[error("Configuration {0} has no [Config] section")]
    MissingSection(Utf8PathBuf),
}

/// Which file a configuration was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The deployment `config` file
    Primary(Utf8PathBuf),
    /// `config.ci`, because no primary file exists
    Fallback(Utf8PathBuf),
    /// `config.ci`, chosen over an existing primary file because of test mode
    ForcedFallback(Utf8PathBuf),
}

impl ConfigOrigin {
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Primary(path) | Self::Fallback(path) | Self::ForcedFallback(path) => path,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Primary(_))
    }
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(path) => write!(f, "{}", path),
            Self::Fallback(path) => write!(f, "{} (fallback)", path),
            Self::ForcedFallback(path) => write!(f, "{} (forced by test mode)", path),
        }
    }
}

/// Option name to value mapping for the `Config` section.
///
/// Names are matched case-insensitively. Lookups never fail: a missing key
/// yields `None` or the caller's default, and the caller decides whether
/// that is an error.
#[derive(Debug, Clone)]
pub struct ConfigEntries {
    origin: ConfigOrigin,
    values: IndexMap<String, String>,
}

impl ConfigEntries {
    /// Build entries directly, e.g. for tests or embedded defaults.
    pub fn from_pairs<K, V>(origin: ConfigOrigin, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_lowercase(), value.into()))
            .collect();
        Self { origin, values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn origin(&self) -> &ConfigOrigin {
        &self.origin
    }

    /// Option names in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Locates and loads the bot's INI configuration.
///
/// Resolution order:
/// - the primary file, when it exists and test mode is off
/// - otherwise the fallback file, which must exist
///
/// Test mode always loads the fallback, even when a primary file is present.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    primary_path: Utf8PathBuf,
    fallback_path: Utf8PathBuf,
}

impl ConfigSource {
    /// Use `config` and `config.ci` inside `dir`.
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self::with_paths(dir.join(PRIMARY_CONFIG_FILE), dir.join(FALLBACK_CONFIG_FILE))
    }

    pub fn with_paths(primary_path: Utf8PathBuf, fallback_path: Utf8PathBuf) -> Self {
        Self {
            primary_path,
            fallback_path,
        }
    }

    pub fn primary_path(&self) -> &Utf8Path {
        &self.primary_path
    }

    pub fn fallback_path(&self) -> &Utf8Path {
        &self.fallback_path
    }

    /// Pick the file to read for the given mode without reading it.
    pub fn resolve(&self, test_mode: bool) -> ConfigOrigin {
        let primary_exists = self.primary_path.is_file();
        if primary_exists && !test_mode {
            ConfigOrigin::Primary(self.primary_path.clone())
        } else if primary_exists {
            ConfigOrigin::ForcedFallback(self.fallback_path.clone())
        } else {
            ConfigOrigin::Fallback(self.fallback_path.clone())
        }
    }

    /// Load the configuration.
    ///
    /// # Errors
    /// Returns [`ConfigLoadError`] when the chosen file is missing, is not
    /// valid INI, or lacks a `Config` section.
    pub fn load(&self, test_mode: bool) -> Result<ConfigEntries, ConfigLoadError> {
        let origin = self.resolve(test_mode);
        let values = read_section(origin.path())?;

        match &origin {
            ConfigOrigin::Primary(path) | ConfigOrigin::Fallback(path) => {
                tracing::debug!("Configuration loaded from \"{}\"", path);
            }
            ConfigOrigin::ForcedFallback(path) => {
                tracing::debug!("Running in test mode, force load config from \"{}\"", path);
            }
        }

        Ok(ConfigEntries { origin, values })
    }
}

fn read_section(path: &Utf8Path) -> Result<IndexMap<String, String>, ConfigLoadError> {
    if !path.is_file() {
        return Err(ConfigLoadError::Missing(path.to_path_buf()));
    }

    // Values are kept exactly as written: no quote stripping, no escapes
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    };
    let ini = Ini::load_from_file_opt(path, options).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let section = ini
        .section(Some(CONFIG_SECTION))
        .ok_or_else(|| ConfigLoadError::MissingSection(path.to_path_buf()))?;

    let mut values = IndexMap::new();
    for (key, value) in section.iter() {
        values.insert(key.to_lowercase(), value.to_string());
    }

    Ok(values)
}
