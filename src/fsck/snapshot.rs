//! Snapshot collection
//!
//! Copies every branch and commit record out of the store, repo by repo. Each
//! repo's listings are separate reads, so a graph written to during the scan
//! can yield a snapshot that never existed as a whole.

use crate::error::FsckError;
use crate::graph::{BranchInfo, BranchKey, CommitInfo, CommitKey, RepoInfo};
use crate::store::GraphReader;
use std::collections::BTreeMap;
use tracing::debug;

/// Private copy of the graph taken for one check
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub repos: Vec<RepoInfo>,
    pub branches: BTreeMap<BranchKey, BranchInfo>,
    pub commits: BTreeMap<CommitKey, CommitInfo>,
}

impl Snapshot {
    pub fn collect<E>(store: &dyn GraphReader) -> Result<Self, FsckError<E>> {
        let mut snapshot = Snapshot::default();

        let mut repos = Vec::new();
        store
            .list_repos(&mut |info| {
                repos.push(info);
                Ok(())
            })
            .map_err(|e| FsckError::storage("listing repos", e))?;

        for info in &repos {
            let repo_key = info.repo.key();

            let commits = &mut snapshot.commits;
            store
                .list_commits_by_repo(&repo_key, &mut |commit| {
                    commits.insert(commit.commit.key(), commit);
                    Ok(())
                })
                .map_err(|e| FsckError::storage(format!("listing commits of repo {}", info.repo), e))?;

            let branches = &mut snapshot.branches;
            store
                .list_branches_by_repo(&repo_key, &mut |branch| {
                    branches.insert(branch.branch.key(), branch);
                    Ok(())
                })
                .map_err(|e| {
                    FsckError::storage(format!("listing branches of repo {}", info.repo), e)
                })?;

            debug!(repo = %info.repo, "collected repo records");
        }

        snapshot.repos = repos;
        Ok(snapshot)
    }

    pub fn branch(&self, key: &BranchKey) -> Option<&BranchInfo> {
        self.branches.get(key)
    }

    pub fn commit(&self, key: &CommitKey) -> Option<&CommitInfo> {
        self.commits.get(key)
    }
}
