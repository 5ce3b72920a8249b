// Data models for the status registry
//
// These are the plain shapes of registry data. They carry no locking; the
// single live instance of each lives inside StatusRegistry.

pub mod banners;
pub mod commit;
pub mod settings;

pub use banners::{Banners, StartupMode};
pub use commit::{RepositoryCommit, SHORT_ID_LEN};
pub use settings::{
    DEFAULT_GIT_EMAIL, DEFAULT_GIT_NAME, DEFAULT_LOCATION, DEFAULT_LOG_TIME_FORMAT,
    DEFAULT_REPO_SLUG, ENV_BOT_NAME, ENV_DEBUG, ENV_PREFIX, ENV_REPO_SLUG, ENV_TEST_MODE, RuntimeEnv,
    ServiceSettings,
};
