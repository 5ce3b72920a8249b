//! Integration tests for StatusRegistry under concurrent use
//!
//! These tests verify that the registry correctly:
//! - Counts scans without lost updates across threads
//! - Keeps API state and scan statistics independent
//! - Serves consistent banners while reloads run
//! - Keeps banners all-or-nothing when a reload fails

use camino::Utf8PathBuf;
use mockall::mock;
use smokey_state::config::FALLBACK_CONFIG_FILE;
use smokey_state::repository::{RepositoryQueryError, RepositoryResult};
use smokey_state::{
    ConfigSource, RegistryError, RepositoryCommit, RuntimeEnv, StatusRegistry, VersionControl,
};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

mock! {
    Repo {}

    impl VersionControl for Repo {
        fn current_commit(&self) -> RepositoryResult<RepositoryCommit>;
        fn current_branch(&self) -> RepositoryResult<String>;
        fn remote_origin_url(&self) -> RepositoryResult<String>;
    }
}

const FULL_ID: &str = "89abcdef0123456789abcdef0123456789abcdef";

fn broken_checkout() -> RepositoryQueryError {
    RepositoryQueryError::Command {
        command: "git rev-list".to_string(),
        output: "fatal: not a git repository (or any of the parent directories): .git"
            .to_string(),
    }
}

/// Repository whose commit query starts failing once `broken` is set.
fn switchable_repo(broken: Arc<AtomicBool>) -> MockRepo {
    let mut repo = MockRepo::new();
    repo.expect_current_commit().returning(move || {
        if broken.load(Ordering::SeqCst) {
            Err(broken_checkout())
        } else {
            Ok(RepositoryCommit::new(FULL_ID, "Jane Doe", "Watch example.com"))
        }
    });
    repo.expect_current_branch()
        .returning(|| Ok("deploy".to_string()));
    repo.expect_remote_origin_url()
        .returning(|| Ok("https://github.com/Charcoal-SE/SmokeDetector.git".to_string()));
    repo
}

fn create_registry(broken: Arc<AtomicBool>) -> (TempDir, Arc<StatusRegistry>) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    fs::write(dir.join(FALLBACK_CONFIG_FILE), "[Config]\nlocation = Test Farm\n").unwrap();

    let registry = StatusRegistry::initialize(
        &ConfigSource::new(&dir),
        &RuntimeEnv::default(),
        Box::new(switchable_repo(broken)),
    )
    .unwrap();
    (temp_dir, Arc::new(registry))
}

#[test]
fn test_concurrent_scans_have_no_lost_updates() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.counters().record_scan(2.5);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("scan thread panicked");
    }

    let stats = registry.counters().scan_stats();
    assert_eq!(stats.posts_scanned, 3);
    assert_eq!(stats.scan_time, 7.5);
}

#[test]
fn test_many_threads_many_scans() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..1000 {
                    registry.counters().record_scan(0.25);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("scan thread panicked");
    }

    let stats = registry.counters().scan_stats();
    assert_eq!(stats.posts_scanned, 8000);
    assert_eq!(stats.scan_time, 2000.0);
    assert_eq!(stats.average_scan_time(), 0.25);
}

#[test]
fn test_api_state_independent_of_scan_stats() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));
    let counters = registry.counters();

    counters.set_backoff(30.0);
    counters.record_service_failure();
    counters.record_service_failure();
    counters.record_scan(1.0);

    assert_eq!(counters.backoff(), 30.0);
    assert_eq!(counters.service_failures(), 2);
    assert_eq!(counters.scan_stats().posts_scanned, 1);

    counters.reset_service_failures();
    assert_eq!(counters.service_failures(), 0);
    assert_eq!(counters.backoff(), 30.0);
}

#[test]
fn test_concurrent_failure_streak() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..50 {
                    registry.counters().record_service_failure();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("failure thread panicked");
    }

    assert_eq!(registry.counters().service_failures(), 200);
}

#[test]
fn test_readers_see_consistent_banners_during_reload() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));
    let expected = registry.provenance();

    let reloader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..100 {
                registry.reload().unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let expected = expected.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(registry.provenance(), expected);
                }
            })
        })
        .collect();

    reloader.join().expect("reload thread panicked");
    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
}

#[test]
fn test_failed_reload_is_all_or_nothing() {
    let broken = Arc::new(AtomicBool::new(false));
    let (_temp_dir, registry) = create_registry(Arc::clone(&broken));

    registry.reload().unwrap();
    let before = registry.provenance();

    broken.store(true, Ordering::SeqCst);
    let result = registry.reload();

    assert!(matches!(result, Err(RegistryError::Repository(_))));
    assert_eq!(registry.provenance(), before);
    assert_eq!(registry.on_branch(), "deploy");

    // Recovers once the checkout is back
    broken.store(false, Ordering::SeqCst);
    registry.reload().unwrap();
    assert_eq!(registry.provenance(), before);
}

#[test]
fn test_standby_flag_shared_across_threads() {
    let (_temp_dir, registry) = create_registry(Arc::new(AtomicBool::new(false)));

    let setter = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.enter_standby())
    };
    setter.join().expect("standby thread panicked");

    assert!(registry.is_standby());
    assert!(registry.banners().standby.contains("standby mode"));
}
