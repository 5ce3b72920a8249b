use crate::config::ConfigEntries;
use config::{Config, ConfigError, Environment};
use serde::Serialize;

/// Repository slug used when neither the environment nor the git remote
/// provides one.
pub const DEFAULT_REPO_SLUG: &str = "Charcoal-SE/SmokeDetector";

pub const DEFAULT_LOCATION: &str = "Continuous Integration";
pub const DEFAULT_GIT_NAME: &str = "SmokeDetector";
pub const DEFAULT_GIT_EMAIL: &str = "smokey@erwaysoftware.com";
pub const DEFAULT_LOG_TIME_FORMAT: &str = "%H:%M:%S";

/// Prefix shared by every environment variable the bot reads.
pub const ENV_PREFIX: &str = "SMOKEDETECTOR";

/// Environment variable overriding the bot's display name.
pub const ENV_BOT_NAME: &str = "SMOKEDETECTOR_NAME";
/// Environment variable overriding the repository slug.
pub const ENV_REPO_SLUG: &str = "SMOKEDETECTOR_REPO";
/// Environment variable that switches config loading into test mode.
pub const ENV_TEST_MODE: &str = "SMOKEDETECTOR_TEST_MODE";
/// Environment variable enabling debug-level logging in the binary.
pub const ENV_DEBUG: &str = "SMOKEDETECTOR_DEBUG";

/// Process environment inputs, captured once at startup.
///
/// Library code never reads the environment itself; the binary builds this
/// with [`RuntimeEnv::from_process`] and tests construct it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub bot_name: Option<String>,
    pub repo_slug: Option<String>,
    pub test_mode: bool,
    pub debug: bool,
}

impl RuntimeEnv {
    /// Read the `SMOKEDETECTOR_*` variables from the current process.
    pub fn from_process() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Read the same variables from an explicit name to value list.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Result<Self, ConfigError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let layer = Config::builder().add_source(environment).build()?;
        let value = |key: &str| layer.get_string(key).ok();

        Ok(Self {
            bot_name: value("name"),
            repo_slug: value("repo"),
            test_mode: value("test_mode").is_some_and(|flag| flag_enabled(&flag)),
            debug: value("debug").is_some_and(|flag| flag_enabled(&flag)),
        })
    }
}

/// Switch variables are on unless empty, `0` or `false`.
fn flag_enabled(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Configuration-derived scalars, fixed for the lifetime of the process.
///
/// This is the plain shape of the settings; the single live instance is
/// owned by [`crate::state::StatusRegistry`]. Credentials are never
/// serialized into status reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSettings {
    pub location: String,

    pub chatexchange_u: Option<String>,
    #[serde(skip)]
    pub chatexchange_p: Option<String>,

    pub metasmoke_host: Option<String>,
    #[serde(skip)]
    pub metasmoke_key: Option<String>,
    pub metasmoke_ws_host: Option<String>,

    pub git_name: String,
    pub git_email: String,

    pub github_username: Option<String>,
    #[serde(skip)]
    pub github_password: Option<String>,

    #[serde(skip)]
    pub perspective_key: Option<String>,

    pub flovis_host: Option<String>,

    pub log_time_format: String,

    // Identity shown in chat
    pub bot_name: String,
    pub bot_repo_slug: String,
    pub bot_repository: String,
    pub chatmessage_prefix: String,
}

impl ServiceSettings {
    /// Populate every field from the loaded configuration.
    ///
    /// `derived_slug` is the slug computed from the git remote; it is only
    /// used when the environment does not override it.
    pub fn resolve(config: &ConfigEntries, env: &RuntimeEnv, derived_slug: &str) -> Self {
        let owned = |key: &str| config.get(key).map(str::to_string);

        let git_name = config.get_or("git_username", DEFAULT_GIT_NAME).to_string();
        let bot_name = env.bot_name.clone().unwrap_or_else(|| git_name.clone());
        let bot_repo_slug = env
            .repo_slug
            .clone()
            .unwrap_or_else(|| derived_slug.to_string());
        let bot_repository = format!("//github.com/{}", bot_repo_slug);
        let chatmessage_prefix = format!("[{}]({})", bot_name, bot_repository);

        Self {
            location: config.get_or("location", DEFAULT_LOCATION).to_string(),
            chatexchange_u: owned("ChatExchangeU"),
            chatexchange_p: owned("ChatExchangeP"),
            metasmoke_host: owned("metasmoke_host"),
            metasmoke_key: owned("metasmoke_key"),
            metasmoke_ws_host: owned("metasmoke_ws_host"),
            git_name,
            git_email: config.get_or("git_useremail", DEFAULT_GIT_EMAIL).to_string(),
            github_username: owned("github_username"),
            github_password: owned("github_password"),
            perspective_key: owned("perspective_key"),
            flovis_host: owned("flovis_host"),
            log_time_format: config
                .get_or("log_time_format", DEFAULT_LOG_TIME_FORMAT)
                .to_string(),
            bot_name,
            bot_repo_slug,
            bot_repository,
            chatmessage_prefix,
        }
    }
}
