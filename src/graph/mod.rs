//! Graph Model
//!
//! Repos, branches and commits plus the provenance relation between branches.
//! Identity values (`Repo`, `Branch`, `Commit`) are small comparable structs;
//! the `*Info` records carry the mutable attributes stored in the graph.

pub mod key;
pub mod name;
pub mod set;

pub use key::{BranchKey, CommitKey, RepoKey};
pub use name::validate_name;
pub use set::{branch_in_set, equal_branches};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repo type used when none is given.
pub const DEFAULT_REPO_TYPE: &str = "user";

/// Repo identity: (name, type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    #[serde(default = "default_repo_type", rename = "type")]
    pub repo_type: String,
}

fn default_repo_type() -> String {
    DEFAULT_REPO_TYPE.to_string()
}

impl Repo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_type: default_repo_type(),
        }
    }

    pub fn with_type(name: impl Into<String>, repo_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_type: repo_type.into(),
        }
    }

    pub fn branch(&self, name: impl Into<String>) -> Branch {
        Branch {
            repo: self.clone(),
            name: name.into(),
        }
    }

    pub fn commit(&self, id: impl Into<String>) -> Commit {
        Commit {
            repo: self.clone(),
            id: id.into(),
        }
    }

    pub fn key(&self) -> RepoKey {
        RepoKey::of(self)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.repo_type)
    }
}

/// Branch identity: (repo, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Branch {
    pub repo: Repo,
    pub name: String,
}

impl Branch {
    pub fn key(&self) -> BranchKey {
        BranchKey::of(self)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo, self.name)
    }
}

/// Commit identity: (repo, id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commit {
    pub repo: Repo,
    pub id: String,
}

impl Commit {
    pub fn key(&self) -> CommitKey {
        CommitKey::of(self)
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo, self.id)
    }
}

/// Repo record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub repo: Repo,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl RepoInfo {
    pub fn new(repo: Repo) -> Self {
        Self {
            repo,
            description: None,
            created: None,
        }
    }
}

/// Branch record
///
/// `provenance` and `subvenance` are denormalized caches maintained by the
/// write path; the checker verifies them against `direct_provenance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub branch: Branch,
    #[serde(default)]
    pub head: Option<Commit>,
    #[serde(default)]
    pub direct_provenance: Vec<Branch>,
    #[serde(default)]
    pub provenance: Vec<Branch>,
    #[serde(default)]
    pub subvenance: Vec<Branch>,
}

impl BranchInfo {
    pub fn new(branch: Branch) -> Self {
        Self {
            branch,
            head: None,
            direct_provenance: Vec::new(),
            provenance: Vec::new(),
            subvenance: Vec::new(),
        }
    }

    pub fn with_head(mut self, head: Commit) -> Self {
        self.head = Some(head);
        self
    }
}

/// How a commit came to exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitOrigin {
    #[default]
    User,
    Auto,
    Fsck,
}

/// Commit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub commit: Commit,
    #[serde(default)]
    pub parent_commit: Option<Commit>,
    #[serde(default)]
    pub child_commits: Vec<Commit>,
    #[serde(default)]
    pub origin: CommitOrigin,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
}

impl CommitInfo {
    pub fn new(commit: Commit) -> Self {
        Self {
            commit,
            parent_commit: None,
            child_commits: Vec::new(),
            origin: CommitOrigin::default(),
            description: None,
            started: None,
            finished: None,
        }
    }

    pub fn with_parent(mut self, parent: Commit) -> Self {
        self.parent_commit = Some(parent);
        self
    }

    pub fn with_children(mut self, children: Vec<Commit>) -> Self {
        self.child_commits = children;
        self
    }
}
