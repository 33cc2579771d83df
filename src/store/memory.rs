//! In-memory Graph Store
//!
//! Ordered maps behind a single lock. Transactions stage commit creates
//! outside the lock, so the body may read or write the store, and publish
//! them under the writer lock on success. A create that lost a race to a
//! concurrent write reruns the body.

use crate::error::StorageError;
use crate::graph::name::{validate_branch_info, validate_commit_info, validate_repo_info};
use crate::graph::{BranchInfo, BranchKey, CommitInfo, CommitKey, RepoInfo, RepoKey};
use crate::store::{GraphReader, GraphTransaction, GraphWriter, Visit};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::debug;

#[derive(Debug, Default, Clone)]
struct GraphState {
    repos: BTreeMap<RepoKey, RepoInfo>,
    branches: BTreeMap<BranchKey, BranchInfo>,
    commits: BTreeMap<CommitKey, CommitInfo>,
}

/// In-memory implementation of the graph store
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: RwLock<GraphState>,
    transactional_writes: RwLock<usize>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records written by committed transactions so far.
    pub fn transactional_writes(&self) -> usize {
        *self.transactional_writes.read()
    }

    pub fn commit_count(&self) -> usize {
        self.state.read().commits.len()
    }

    pub fn branch_count(&self) -> usize {
        self.state.read().branches.len()
    }

    /// Remove a commit record without touching anything that references it.
    pub fn remove_commit(&self, key: &CommitKey) -> Option<CommitInfo> {
        self.state.write().commits.remove(key)
    }

    /// Remove a branch record without touching anything that references it.
    pub fn remove_branch(&self, key: &BranchKey) -> Option<BranchInfo> {
        self.state.write().branches.remove(key)
    }
}

/// Values whose key starts with `prefix`, in key order.
fn prefixed<'a, K, V>(map: &'a BTreeMap<K, V>, prefix: &'a str) -> impl Iterator<Item = &'a V> + 'a
where
    K: Ord + AsRef<[u8]> + Borrow<str>,
{
    map.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(k, _)| k.as_ref().starts_with(prefix.as_bytes()))
        .map(|(_, v)| v)
}

impl GraphReader for MemoryGraphStore {
    fn list_repos(&self, visit: Visit<'_, RepoInfo>) -> Result<(), StorageError> {
        // Clone out so visitors may write to the store.
        let repos: Vec<RepoInfo> = self.state.read().repos.values().cloned().collect();
        for info in repos {
            visit(info)?;
        }
        Ok(())
    }

    fn list_commits_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, CommitInfo>,
    ) -> Result<(), StorageError> {
        let prefix = repo.child_prefix();
        let commits: Vec<CommitInfo> = {
            let state = self.state.read();
            prefixed(&state.commits, &prefix).cloned().collect()
        };
        for info in commits {
            visit(info)?;
        }
        Ok(())
    }

    fn list_branches_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, BranchInfo>,
    ) -> Result<(), StorageError> {
        let prefix = repo.child_prefix();
        let branches: Vec<BranchInfo> = {
            let state = self.state.read();
            prefixed(&state.branches, &prefix).cloned().collect()
        };
        for info in branches {
            visit(info)?;
        }
        Ok(())
    }
}

struct StagedCommits<'a> {
    state: &'a RwLock<GraphState>,
    created: BTreeMap<CommitKey, CommitInfo>,
}

impl GraphTransaction for StagedCommits<'_> {
    fn create_commit(&mut self, key: &CommitKey, info: &CommitInfo) -> Result<(), StorageError> {
        validate_commit_info(info)?;
        if self.created.contains_key(key) || self.state.read().commits.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        self.created.insert(key.clone(), info.clone());
        Ok(())
    }
}

impl GraphWriter for MemoryGraphStore {
    fn put_repo(&self, info: &RepoInfo) -> Result<(), StorageError> {
        validate_repo_info(info)?;
        self.state.write().repos.insert(info.repo.key(), info.clone());
        Ok(())
    }

    fn put_branch(&self, info: &BranchInfo) -> Result<(), StorageError> {
        validate_branch_info(info)?;
        self.state
            .write()
            .branches
            .insert(info.branch.key(), info.clone());
        Ok(())
    }

    fn put_commit(&self, info: &CommitInfo) -> Result<(), StorageError> {
        validate_commit_info(info)?;
        self.state
            .write()
            .commits
            .insert(info.commit.key(), info.clone());
        Ok(())
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn GraphTransaction) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        loop {
            let mut txn = StagedCommits {
                state: &self.state,
                created: BTreeMap::new(),
            };
            f(&mut txn)?;
            let created = txn.created;

            let mut state = self.state.write();
            if let Some(key) = created.keys().find(|k| state.commits.contains_key(*k)) {
                debug!(commit = %key, "transaction conflict, retrying");
                continue;
            }
            let writes = created.len();
            state.commits.extend(created);
            *self.transactional_writes.write() += writes;
            return Ok(());
        }
    }
}
