use super::{RepositoryCommit, ServiceSettings};
use serde::Serialize;

const REVERTED_MODE_URL: &str =
    "https://charcoal-se.org/smokey/SmokeDetector-Statuses#reverted-mode";
const STANDBY_MODE_URL: &str = "https://charcoal-se.org/smokey/SmokeDetector-Statuses#standby-mode";

/// Which startup announcement the bot should post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupMode {
    Normal,
    Reverted,
    Standby,
}

/// Chat announcements derived from settings and the current commit.
///
/// Recomputed as a whole on every reload; the registry never updates a
/// single banner on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Banners {
    /// Normal startup announcement
    pub startup: String,
    /// Startup after an automatic revert
    pub reverted: String,
    /// Startup in standby mode
    pub standby: String,
    /// Posted after a blacklist hot-reload
    pub blacklist_reload: String,
    /// Posted after the detection module is reloaded
    pub findspam_reload: String,
}

impl Banners {
    /// Compose all banners. Pure and deterministic: identical inputs give
    /// byte-identical output.
    pub fn compose(settings: &ServiceSettings, commit: &RepositoryCommit) -> Self {
        let prefix = &settings.chatmessage_prefix;
        let revision = format!(
            "[rev {}]({}/commit/{})",
            commit.with_author(),
            settings.bot_repository,
            commit.short_id
        );
        let location = &settings.location;

        Self {
            startup: format!(
                "[ {} ] SmokeDetector started at {} (running on {}, {} {})",
                prefix,
                revision,
                location,
                crate::APP_NAME,
                crate::VERSION
            ),
            reverted: format!(
                "[ {} ] SmokeDetector started in [reverted mode]({}) at {} (running on {})",
                prefix, REVERTED_MODE_URL, revision, location
            ),
            standby: format!(
                "[ {} ] SmokeDetector started in [standby mode]({}) at {} (running on {})",
                prefix, STANDBY_MODE_URL, revision, location
            ),
            blacklist_reload: format!(
                "[ {} ] Blacklists reloaded at {} (running on {})",
                prefix, revision, location
            ),
            findspam_reload: format!(
                "[ {} ] FindSpam module reloaded at {} (running on {})",
                prefix, revision, location
            ),
        }
    }

    /// The startup announcement for `mode`.
    pub fn startup_for(&self, mode: StartupMode) -> &str {
        match mode {
            StartupMode::Normal => &self.startup,
            StartupMode::Reverted => &self.reverted,
            StartupMode::Standby => &self.standby,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigEntries, ConfigOrigin};
    use crate::models::{RuntimeEnv, DEFAULT_REPO_SLUG};
    use camino::Utf8PathBuf;

    fn settings() -> ServiceSettings {
        let config = ConfigEntries::from_pairs(
            ConfigOrigin::Fallback(Utf8PathBuf::from("config.ci")),
            [("location", "Test Lab")],
        );
        ServiceSettings::resolve(&config, &RuntimeEnv::default(), DEFAULT_REPO_SLUG)
    }

    fn commit() -> RepositoryCommit {
        RepositoryCommit::new("abcdef0123456789", "Jane Doe", "Add watch")
    }

    #[test]
    fn test_blacklist_reload_banner() {
        let banners = Banners::compose(&settings(), &commit());
        assert_eq!(
            banners.blacklist_reload,
            "[ [SmokeDetector](//github.com/Charcoal-SE/SmokeDetector) ] Blacklists reloaded at \
             [rev `abcdef0` (Jane Doe: Add watch)](//github.com/Charcoal-SE/SmokeDetector/commit/abcdef0) \
             (running on Test Lab)"
        );
    }

    #[test]
    fn test_modes_link_status_pages() {
        let banners = Banners::compose(&settings(), &commit());
        assert!(banners.reverted.contains("#reverted-mode"));
        assert!(banners.standby.contains("#standby-mode"));
        assert!(banners.startup.starts_with("[ [SmokeDetector]"));
        assert!(banners.startup.contains(crate::VERSION));
        assert!(banners.findspam_reload.contains("FindSpam module reloaded"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let first = Banners::compose(&settings(), &commit());
        let second = Banners::compose(&settings(), &commit());
        assert_eq!(first, second);
    }

    #[test]
    fn test_startup_for_mode() {
        let banners = Banners::compose(&settings(), &commit());
        assert_eq!(banners.startup_for(StartupMode::Normal), banners.startup);
        assert_eq!(banners.startup_for(StartupMode::Reverted), banners.reverted);
        assert_eq!(banners.startup_for(StartupMode::Standby), banners.standby);
    }
}
