//! Shared test utilities for integration tests
//!
//! Graph fixtures for the checker tests plus serialized XDG/HOME environment
//! setup for the configuration tests.

use provgraph::error::FsckError;
use provgraph::fsck::{Fsck, FsckSummary, Violation};
use provgraph::graph::{Branch, BranchInfo, Commit, CommitInfo, Repo, RepoInfo};
use provgraph::store::{GraphStore, GraphWriter};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// The repo every fixture lives in
pub fn data_repo() -> Repo {
    Repo::new("data")
}

/// Small builder for graph fixtures
pub struct Fixture<'a> {
    store: &'a dyn GraphWriter,
    repo: Repo,
}

impl<'a> Fixture<'a> {
    pub fn new(store: &'a dyn GraphWriter) -> Self {
        let repo = data_repo();
        store.put_repo(&RepoInfo::new(repo.clone())).unwrap();
        Self { store, repo }
    }

    pub fn branch(&self, name: &str) -> Branch {
        self.repo.branch(name)
    }

    pub fn commit(&self, id: &str) -> Commit {
        self.repo.commit(id)
    }

    /// Put a commit with no ancestry.
    pub fn put_commit(&self, id: &str) -> Commit {
        let commit = self.commit(id);
        self.store.put_commit(&CommitInfo::new(commit.clone())).unwrap();
        commit
    }

    pub fn put_commit_info(&self, info: CommitInfo) {
        self.store.put_commit(&info).unwrap();
    }

    /// A branch record whose head commit exists.
    pub fn branch_with_head(&self, name: &str) -> BranchInfo {
        let head = self.put_commit(&format!("{}-head", name));
        BranchInfo::new(self.branch(name)).with_head(head)
    }

    pub fn put_branch_info(&self, info: &BranchInfo) {
        self.store.put_branch(info).unwrap();
    }
}

/// Run a scan collecting every violation
pub fn run_fsck(store: &dyn GraphStore, fix: bool) -> (Vec<Violation>, FsckSummary) {
    let mut found = Vec::new();
    let summary = Fsck::new(store)
        .check_consistency::<(), _>(fix, |v| {
            found.push(v);
            Ok(())
        })
        .unwrap();
    (found, summary)
}

/// Run a scan whose sink fails on the `fail_at`-th violation (1-based)
pub fn run_fsck_aborting(
    store: &dyn GraphStore,
    fail_at: usize,
) -> (Vec<Violation>, Result<FsckSummary, FsckError<String>>) {
    let mut found = Vec::new();
    let result = Fsck::new(store).check_consistency(false, |v| {
        found.push(v);
        if found.len() == fail_at {
            Err(format!("sink full after {}", fail_at))
        } else {
            Ok(())
        }
    });
    (found, result)
}

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    provgraph_env: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            provgraph_env: std::env::var("PROVGRAPH_ENV").ok(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        restore_var("PROVGRAPH_ENV", self.provgraph_env);
    }
}

fn restore_var(name: &str, value: Option<String>) {
    match value {
        Some(orig) => std::env::set_var(name, orig),
        None => std::env::remove_var(name),
    }
}

/// Run `f` with XDG_CONFIG_HOME and HOME pointed into `test_dir`
///
/// Uses a global mutex so parallel tests never observe each other's
/// environment; the original values are restored afterwards.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("config-home");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    std::env::remove_var("PROVGRAPH_ENV");

    let result = f();

    env_state.restore();

    result
}
