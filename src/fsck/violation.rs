//! Consistency violations
//!
//! Each violation keeps typed copies of the offending records so callers can
//! inspect fields directly; `Display` renders the diagnostic text.

use crate::graph::{Branch, BranchInfo, BranchKey, Commit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Location tag for the head-provenance check.
pub const HEAD_COMMIT_PROVENANCE: &str = "head commit provenance (=>)";

/// A broken graph invariant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Recorded provenance differs from the closure of direct provenance.
    BranchProvenanceTransitivity {
        branch_info: BranchInfo,
        full_provenance: Vec<Branch>,
    },
    /// A provenant branch's subvenance omits a branch that depends on it.
    BranchSubvenanceTransitivity {
        branch_info: BranchInfo,
        missing_subvenance: Branch,
    },
    /// A referenced branch has no record.
    BranchInfoNotFound { branch: Branch },
    /// A referenced commit has no record.
    CommitInfoNotFound { location: String, commit: Commit },
    /// Parent and child disagree about their relationship.
    CommitAncestryBroken { parent: Commit, child: Commit },
    /// A branch has no head commit.
    MissingBranchHead { branch: Branch },
}

impl Violation {
    /// Stable short name of the violation kind
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::BranchProvenanceTransitivity { .. } => "branch_provenance_transitivity",
            Violation::BranchSubvenanceTransitivity { .. } => "branch_subvenance_transitivity",
            Violation::BranchInfoNotFound { .. } => "branch_info_not_found",
            Violation::CommitInfoNotFound { .. } => "commit_info_not_found",
            Violation::CommitAncestryBroken { .. } => "commit_ancestry_broken",
            Violation::MissingBranchHead { .. } => "missing_branch_head",
        }
    }

    /// Branches in `full_provenance` that the recorded provenance lacks,
    /// sorted by key. Empty for every other kind.
    pub fn missing_provenance(&self) -> Vec<&Branch> {
        let Violation::BranchProvenanceTransitivity {
            branch_info,
            full_provenance,
        } = self
        else {
            return Vec::new();
        };

        let mut recorded: Vec<BranchKey> =
            branch_info.provenance.iter().map(Branch::key).collect();
        recorded.push(branch_info.branch.key());

        let full: BTreeMap<BranchKey, &Branch> =
            full_provenance.iter().map(|b| (b.key(), b)).collect();
        full.into_iter()
            .filter(|(k, _)| !recorded.contains(k))
            .map(|(_, b)| b)
            .collect()
    }

    /// Branches recorded as provenance that the closure does not produce.
    pub fn extra_provenance(&self) -> Vec<&Branch> {
        let Violation::BranchProvenanceTransitivity {
            branch_info,
            full_provenance,
        } = self
        else {
            return Vec::new();
        };

        let full: Vec<BranchKey> = full_provenance.iter().map(Branch::key).collect();
        let mut extra: BTreeMap<BranchKey, &Branch> = BTreeMap::new();
        for b in &branch_info.provenance {
            let key = b.key();
            if !full.contains(&key) {
                extra.insert(key, b);
            }
        }
        extra.into_values().collect()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BranchProvenanceTransitivity { branch_info, .. } => {
                writeln!(f, "consistency error: branch provenance was not transitive")?;
                writeln!(f, "on branch {}", branch_info.branch)?;
                writeln!(f, "the following branches are missing from the provenance:")?;
                for b in self.missing_provenance() {
                    writeln!(f, "{} in repo {}", b.name, b.repo)?;
                }
                let extra = self.extra_provenance();
                if !extra.is_empty() {
                    writeln!(f, "the following branches are not implied by direct provenance:")?;
                    for b in extra {
                        writeln!(f, "{} in repo {}", b.name, b.repo)?;
                    }
                }
                Ok(())
            }
            Violation::BranchSubvenanceTransitivity {
                branch_info,
                missing_subvenance,
            } => write!(
                f,
                "consistency error: branch {} is missing branch {} in its subvenance",
                branch_info.branch, missing_subvenance
            ),
            Violation::BranchInfoNotFound { branch } => write!(
                f,
                "consistency error: the branch {} on repo {} could not be found",
                branch.name, branch.repo
            ),
            Violation::CommitInfoNotFound { location, commit } => write!(
                f,
                "consistency error: the commit {} could not be found while checking {}",
                commit, location
            ),
            Violation::CommitAncestryBroken { parent, child } => write!(
                f,
                "consistency error: parent commit {} and child commit {} disagree about their parent/child relationship",
                parent, child
            ),
            Violation::MissingBranchHead { branch } => write!(
                f,
                "consistency error: branch {} does not have a head commit",
                branch
            ),
        }
    }
}
