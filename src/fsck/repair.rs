//! Repairer
//!
//! Turns fixable violations into commit records and writes them in a single
//! transaction. Creates that hit an existing record count as done; any other
//! failure rolls the whole batch back.

use crate::error::StorageError;
use crate::fsck::Violation;
use crate::graph::{Commit, CommitInfo, CommitKey};
use crate::store::GraphWriter;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Commits to create, keyed by canonical key
#[derive(Debug, Default, Clone)]
pub struct RepairPlan {
    commits: BTreeMap<CommitKey, CommitInfo>,
}

impl RepairPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whatever `violation` can be repaired with.
    pub fn consider(&mut self, violation: &Violation) {
        if let Some(info) = synthesize(violation) {
            self.commits.insert(info.commit.key(), info);
        }
    }

    pub fn add_commit(&mut self, info: CommitInfo) {
        self.commits.insert(info.commit.key(), info);
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }
}

/// Synthesis rule: which commit, if any, repairs a violation.
///
/// No violation kind is mechanically repairable yet; every arm says so
/// explicitly so a new kind has to make the decision.
fn synthesize(violation: &Violation) -> Option<CommitInfo> {
    match violation {
        Violation::BranchProvenanceTransitivity { .. }
        | Violation::BranchSubvenanceTransitivity { .. }
        | Violation::BranchInfoNotFound { .. }
        | Violation::CommitInfoNotFound { .. }
        | Violation::CommitAncestryBroken { .. }
        | Violation::MissingBranchHead { .. } => None,
    }
}

/// What a repair pass wrote
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RepairOutcome {
    pub created: Vec<Commit>,
    pub already_present: Vec<Commit>,
}

impl RepairOutcome {
    /// One human-readable line per applied fix
    pub fn descriptions(&self) -> Vec<String> {
        self.created
            .iter()
            .map(|c| format!("created commit {}", c))
            .chain(
                self.already_present
                    .iter()
                    .map(|c| format!("commit {} already present, left unchanged", c)),
            )
            .collect()
    }
}

pub struct Repairer<'a> {
    store: &'a dyn GraphWriter,
}

impl<'a> Repairer<'a> {
    pub fn new(store: &'a dyn GraphWriter) -> Self {
        Self { store }
    }

    /// Apply `plan` atomically.
    pub fn apply(&self, plan: &RepairPlan) -> Result<RepairOutcome, StorageError> {
        let mut outcome = RepairOutcome::default();
        self.store.transaction(&mut |txn| {
            // The body can be rerun after a backend conflict.
            outcome = RepairOutcome::default();
            for (key, commit_info) in &plan.commits {
                match txn.create_commit(key, commit_info) {
                    Ok(()) => outcome.created.push(commit_info.commit.clone()),
                    Err(e) if e.is_already_exists() => {
                        // Concurrent writers can get there first.
                        warn!(commit = %commit_info.commit, "repair commit already exists");
                        outcome.already_present.push(commit_info.commit.clone());
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })?;

        info!(
            created = outcome.created.len(),
            already_present = outcome.already_present.len(),
            "repair transaction committed"
        );
        Ok(outcome)
    }
}
