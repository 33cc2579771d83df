//! Graph Store
//!
//! Storage port for repo, branch and commit records. Reads are visitor-style
//! listings (a visitor returning `Err` stops the listing and the error
//! propagates); writes are plain upserts plus a transactional scope for
//! idempotent creates.

pub mod memory;
pub mod persistence;

pub use memory::MemoryGraphStore;
pub use persistence::SledGraphStore;

use crate::error::StorageError;
use crate::graph::name::{validate_branch_info, validate_commit_info, validate_repo_info};
use crate::graph::{BranchInfo, CommitInfo, CommitKey, RepoInfo, RepoKey};

/// Visitor callback used by every listing.
pub type Visit<'a, T> = &'a mut dyn FnMut(T) -> Result<(), StorageError>;

/// Read view of the graph
pub trait GraphReader {
    fn list_repos(&self, visit: Visit<'_, RepoInfo>) -> Result<(), StorageError>;

    /// List commits through the by-repo index.
    fn list_commits_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, CommitInfo>,
    ) -> Result<(), StorageError>;

    /// List branches through the by-repo index.
    fn list_branches_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, BranchInfo>,
    ) -> Result<(), StorageError>;
}

/// Writes issued inside [`GraphWriter::transaction`]
pub trait GraphTransaction {
    /// Create a commit record.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if `key` is present.
    fn create_commit(&mut self, key: &CommitKey, info: &CommitInfo) -> Result<(), StorageError>;
}

/// Write view of the graph
pub trait GraphWriter {
    fn put_repo(&self, info: &RepoInfo) -> Result<(), StorageError>;
    fn put_branch(&self, info: &BranchInfo) -> Result<(), StorageError>;
    fn put_commit(&self, info: &CommitInfo) -> Result<(), StorageError>;

    /// Run `f` in one transaction.
    ///
    /// Writes become visible together when `f` returns `Ok`; nothing is
    /// written when it returns `Err`. `f` may be invoked more than once if
    /// the backend retries on conflict. The memory store holds no lock while
    /// `f` runs; sled serializes `f` against other sled writers, so under sled
    /// `f` should touch the store only through its transaction handle.
    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn GraphTransaction) -> Result<(), StorageError>,
    ) -> Result<(), StorageError>;

    /// Make every completed write durable.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A store offering both views
pub trait GraphStore: GraphReader + GraphWriter {
    fn as_reader(&self) -> &dyn GraphReader;
    fn as_writer(&self) -> &dyn GraphWriter;
}

impl<T: GraphReader + GraphWriter> GraphStore for T {
    fn as_reader(&self) -> &dyn GraphReader {
        self
    }

    fn as_writer(&self) -> &dyn GraphWriter {
        self
    }
}

/// Every record in a store, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDump {
    #[serde(default)]
    pub repos: Vec<RepoInfo>,
    #[serde(default)]
    pub branches: Vec<BranchInfo>,
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
}

impl GraphDump {
    /// Read every record from `store`, repo by repo.
    pub fn collect(store: &dyn GraphReader) -> Result<Self, StorageError> {
        let mut repos = Vec::new();
        store.list_repos(&mut |info| {
            repos.push(info);
            Ok(())
        })?;

        let mut dump = GraphDump::default();
        for info in repos {
            let key = info.repo.key();
            store.list_branches_by_repo(&key, &mut |b| {
                dump.branches.push(b);
                Ok(())
            })?;
            store.list_commits_by_repo(&key, &mut |c| {
                dump.commits.push(c);
                Ok(())
            })?;
            dump.repos.push(info);
        }
        Ok(dump)
    }

    /// Check the identity names of every record without writing anything.
    pub fn validate(&self) -> Result<(), StorageError> {
        for repo in &self.repos {
            validate_repo_info(repo)?;
        }
        for branch in &self.branches {
            validate_branch_info(branch)?;
        }
        for commit in &self.commits {
            validate_commit_info(commit)?;
        }
        Ok(())
    }

    /// Write every record through the plain write path.
    ///
    /// The whole dump is validated first, so a dump with a bad name writes
    /// nothing. A backend error part way through can still leave a prefix of
    /// the dump behind.
    pub fn restore(&self, store: &dyn GraphWriter) -> Result<(), StorageError> {
        self.validate()?;
        for repo in &self.repos {
            store.put_repo(repo)?;
        }
        for branch in &self.branches {
            store.put_branch(branch)?;
        }
        for commit in &self.commits {
            store.put_commit(commit)?;
        }
        Ok(())
    }
}
