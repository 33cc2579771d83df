//! Name validation for repos, branches and commit ids.

use crate::error::StorageError;
use crate::graph::{BranchInfo, CommitInfo, RepoInfo};

const MAX_NAME_LEN: usize = 255;

/// Validate a single identity component.
///
/// Allowed characters are ASCII letters, digits, `_` and `-`. This keeps the
/// key separators out of every component.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("is longer than 255 bytes"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(invalid(&format!("contains disallowed character {:?}", c)));
    }
    Ok(())
}

pub(crate) fn validate_repo_info(info: &RepoInfo) -> Result<(), StorageError> {
    validate_name("repo", &info.repo.name)?;
    validate_name("repo type", &info.repo.repo_type)
}

/// Only the record's own identity is validated; references are checked by fsck.
pub(crate) fn validate_branch_info(info: &BranchInfo) -> Result<(), StorageError> {
    validate_name("repo", &info.branch.repo.name)?;
    validate_name("repo type", &info.branch.repo.repo_type)?;
    validate_name("branch", &info.branch.name)
}

pub(crate) fn validate_commit_info(info: &CommitInfo) -> Result<(), StorageError> {
    validate_name("repo", &info.commit.repo.name)?;
    validate_name("repo type", &info.commit.repo.repo_type)?;
    validate_name("commit id", &info.commit.id)
}
