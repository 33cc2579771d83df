//! Persistence layer for the Graph Store
//!
//! One sled tree per record kind, values encoded with bincode. Branch and
//! commit keys start with their repo key (see [`crate::graph::key`]), so a
//! prefix scan doubles as the by-repo secondary index.

use crate::error::StorageError;
use crate::graph::name::{validate_branch_info, validate_commit_info, validate_repo_info};
use crate::graph::{BranchInfo, CommitInfo, CommitKey, RepoInfo, RepoKey};
use crate::store::{GraphReader, GraphTransaction, GraphWriter, Visit};
use serde::de::DeserializeOwned;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, UnabortableTransactionError,
};
use std::cell::RefCell;
use std::path::Path;
use tracing::debug;

const REPOS_TREE: &str = "repos";
const BRANCHES_TREE: &str = "branches";
const COMMITS_TREE: &str = "commits";

/// Sled-based implementation of the graph store
pub struct SledGraphStore {
    db: sled::Db,
    repos: sled::Tree,
    branches: sled::Tree,
    commits: sled::Tree,
}

impl SledGraphStore {
    /// Open (or create) a store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Backend(format!(
                "Failed to open sled database at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_db(db)
    }

    /// Temporary store that is removed when dropped
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            repos: db.open_tree(REPOS_TREE)?,
            branches: db.open_tree(BRANCHES_TREE)?,
            commits: db.open_tree(COMMITS_TREE)?,
            db,
        })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

fn decode<T: DeserializeOwned>(kind: &str, bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| {
        StorageError::Serialization(format!("Failed to deserialize {} record: {}", kind, e))
    })
}

fn visit_all<T: DeserializeOwned>(
    kind: &str,
    iter: sled::Iter,
    visit: Visit<'_, T>,
) -> Result<(), StorageError> {
    for item in iter {
        let (_, value) = item?;
        visit(decode(kind, &value)?)?;
    }
    Ok(())
}

impl GraphReader for SledGraphStore {
    fn list_repos(&self, visit: Visit<'_, RepoInfo>) -> Result<(), StorageError> {
        visit_all("repo", self.repos.iter(), visit)
    }

    fn list_commits_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, CommitInfo>,
    ) -> Result<(), StorageError> {
        visit_all("commit", self.commits.scan_prefix(repo.child_prefix()), visit)
    }

    fn list_branches_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, BranchInfo>,
    ) -> Result<(), StorageError> {
        visit_all("branch", self.branches.scan_prefix(repo.child_prefix()), visit)
    }
}

/// Commit writes against a sled transactional view.
///
/// sled's conflict errors must reach the transaction loop untouched so it can
/// retry; they are parked in `conflict` while the caller sees a plain
/// `StorageError`.
struct SledCommitTransaction<'a> {
    tree: &'a TransactionalTree,
    conflict: Option<UnabortableTransactionError>,
}

impl SledCommitTransaction<'_> {
    fn park(&mut self, err: UnabortableTransactionError) -> StorageError {
        let message = err.to_string();
        self.conflict = Some(err);
        StorageError::Backend(message)
    }
}

impl GraphTransaction for SledCommitTransaction<'_> {
    fn create_commit(&mut self, key: &CommitKey, info: &CommitInfo) -> Result<(), StorageError> {
        validate_commit_info(info)?;
        let existing = match self.tree.get(key.as_bytes()) {
            Ok(existing) => existing,
            Err(e) => return Err(self.park(e)),
        };
        if existing.is_some() {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        let value = bincode::serialize(info)?;
        if let Err(e) = self.tree.insert(key.as_bytes(), value) {
            return Err(self.park(e));
        }
        Ok(())
    }
}

impl GraphWriter for SledGraphStore {
    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    fn put_repo(&self, info: &RepoInfo) -> Result<(), StorageError> {
        validate_repo_info(info)?;
        self.repos
            .insert(info.repo.key().as_bytes(), bincode::serialize(info)?)?;
        Ok(())
    }

    fn put_branch(&self, info: &BranchInfo) -> Result<(), StorageError> {
        validate_branch_info(info)?;
        self.branches
            .insert(info.branch.key().as_bytes(), bincode::serialize(info)?)?;
        Ok(())
    }

    fn put_commit(&self, info: &CommitInfo) -> Result<(), StorageError> {
        validate_commit_info(info)?;
        self.commits
            .insert(info.commit.key().as_bytes(), bincode::serialize(info)?)?;
        Ok(())
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn GraphTransaction) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        // sled wants an `Fn` so it can rerun the body after a conflict.
        let f = RefCell::new(f);
        let result = self.commits.transaction(|tree| {
            let mut txn = SledCommitTransaction {
                tree,
                conflict: None,
            };
            let outcome = {
                let mut body = f.borrow_mut();
                (&mut **body)(&mut txn)
            };
            if let Some(conflict) = txn.conflict.take() {
                debug!("commit transaction hit a sled conflict, retrying");
                return Err(ConflictableTransactionError::from(conflict));
            }
            outcome.map_err(ConflictableTransactionError::Abort)
        });
        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StorageError::from(e)),
        }
    }
}
