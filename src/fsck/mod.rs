//! Consistency Checker
//!
//! Takes a snapshot of the graph, checks every branch and commit against the
//! graph invariants and streams each violation to a caller-supplied sink:
//!
//! 1. Branch provenance is the transitive closure of direct provenance.
//! 2. Every provenant branch lists the dependent branch in its subvenance.
//! 3. Every branch has a head, and the head commit of a branch with
//!    provenant heads has a record.
//! 4. Parent and child commits agree about their relationship.
//!
//! The sink is both the collector and the only way to stop a scan: its first
//! error ends the scan and is handed back unchanged in
//! [`FsckError::Aborted`]. With `fix` set, the violations of the same pass
//! feed a [`RepairPlan`] that is applied in one transaction.

pub mod repair;
pub mod response;
pub mod snapshot;
pub mod violation;

pub use repair::{RepairOutcome, RepairPlan, Repairer};
pub use response::FsckResponse;
pub use snapshot::Snapshot;
pub use violation::{Violation, HEAD_COMMIT_PROVENANCE};

use crate::error::FsckError;
use crate::graph::{branch_in_set, equal_branches, Branch, BranchInfo, CommitInfo};
use crate::store::GraphStore;
use serde::Serialize;
use std::iter;
use tracing::{debug, info};

/// Totals for a completed scan
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FsckSummary {
    pub repos: usize,
    pub branches: usize,
    pub commits: usize,
    pub violations: usize,
    /// Present only when the scan ran with `fix`.
    pub repair: Option<RepairOutcome>,
}

impl FsckSummary {
    pub fn is_clean(&self) -> bool {
        self.violations == 0
    }
}

/// Delivers violations to the sink and remembers what the repair pass needs.
struct Reporter<F> {
    sink: F,
    plan: RepairPlan,
    reported: usize,
}

impl<F, E> Reporter<F>
where
    F: FnMut(Violation) -> Result<(), E>,
{
    fn report(&mut self, violation: Violation) -> Result<(), FsckError<E>> {
        debug!(kind = violation.kind(), "fsck violation");
        self.plan.consider(&violation);
        self.reported += 1;
        (self.sink)(violation).map_err(FsckError::Aborted)
    }
}

/// Consistency checker over a graph store
pub struct Fsck<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> Fsck<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Check every invariant, passing each violation to `sink` once.
    ///
    /// Returns `Ok` once the scan completes, however many violations were
    /// reported. Returns `Err` only when reading or repairing the store fails
    /// or when `sink` returns an error.
    pub fn check_consistency<E, F>(&self, fix: bool, sink: F) -> Result<FsckSummary, FsckError<E>>
    where
        F: FnMut(Violation) -> Result<(), E>,
    {
        let snapshot = Snapshot::collect::<E>(self.store.as_reader())?;
        info!(
            repos = snapshot.repos.len(),
            branches = snapshot.branches.len(),
            commits = snapshot.commits.len(),
            "collected graph snapshot"
        );

        let mut reporter = Reporter {
            sink,
            plan: RepairPlan::new(),
            reported: 0,
        };

        for bi in snapshot.branches.values() {
            check_branch(&snapshot, bi, &mut reporter)?;
        }
        for ci in snapshot.commits.values() {
            check_commit(&snapshot, ci, &mut reporter)?;
        }

        // Commit sets (commits created together across branches) are not checked.

        let mut summary = FsckSummary {
            repos: snapshot.repos.len(),
            branches: snapshot.branches.len(),
            commits: snapshot.commits.len(),
            violations: reporter.reported,
            repair: None,
        };

        if fix {
            let outcome = Repairer::new(self.store.as_writer())
                .apply(&reporter.plan)
                .map_err(|e| FsckError::storage("applying repairs", e))?;
            summary.repair = Some(outcome);
        }

        info!(violations = summary.violations, fix, "fsck complete");
        Ok(summary)
    }
}

fn check_branch<F, E>(
    snapshot: &Snapshot,
    bi: &BranchInfo,
    reporter: &mut Reporter<F>,
) -> Result<(), FsckError<E>>
where
    F: FnMut(Violation) -> Result<(), E>,
{
    // union(branch, provenance) must equal
    // union(branch, direct provenance, provenance of each direct provenance)
    let mut union: Vec<Branch> = vec![bi.branch.clone()];
    for direct in &bi.direct_provenance {
        union.push(direct.clone());
        if let Some(direct_info) = snapshot.branch(&direct.key()) {
            union.extend(direct_info.provenance.iter().cloned());
        }
    }
    if !equal_branches(bi.provenance.iter().chain(iter::once(&bi.branch)), &union) {
        reporter.report(Violation::BranchProvenanceTransitivity {
            branch_info: bi.clone(),
            full_provenance: union,
        })?;
    }

    for prov in &bi.provenance {
        // A missing record is reported by the head check below.
        let Some(prov_info) = snapshot.branch(&prov.key()) else {
            continue;
        };
        if !branch_in_set(&bi.branch, &prov_info.subvenance) {
            reporter.report(Violation::BranchSubvenanceTransitivity {
                branch_info: prov_info.clone(),
                missing_subvenance: bi.branch.clone(),
            })?;
        }
    }

    let Some(head) = &bi.head else {
        return reporter.report(Violation::MissingBranchHead {
            branch: bi.branch.clone(),
        });
    };

    // Only checks that the head commit resolves. Whether the head commit's
    // provenance contains each provenant head is not verified.
    for prov in &bi.provenance {
        let Some(prov_info) = snapshot.branch(&prov.key()) else {
            reporter.report(Violation::BranchInfoNotFound {
                branch: prov.clone(),
            })?;
            continue;
        };
        if prov_info.head.is_some() && snapshot.commit(&head.key()).is_none() {
            reporter.report(Violation::CommitInfoNotFound {
                location: HEAD_COMMIT_PROVENANCE.to_string(),
                commit: head.clone(),
            })?;
        }
    }
    Ok(())
}

fn check_commit<F, E>(
    snapshot: &Snapshot,
    ci: &CommitInfo,
    reporter: &mut Reporter<F>,
) -> Result<(), FsckError<E>>
where
    F: FnMut(Violation) -> Result<(), E>,
{
    if let Some(parent) = &ci.parent_commit {
        match snapshot.commit(&parent.key()) {
            None => reporter.report(Violation::CommitInfoNotFound {
                location: format!("parent commit of {}", ci.commit),
                commit: parent.clone(),
            })?,
            Some(parent_info) => {
                if !parent_info.child_commits.contains(&ci.commit) {
                    reporter.report(Violation::CommitAncestryBroken {
                        parent: parent_info.commit.clone(),
                        child: ci.commit.clone(),
                    })?;
                }
            }
        }
    }

    for child in &ci.child_commits {
        match snapshot.commit(&child.key()) {
            None => reporter.report(Violation::CommitInfoNotFound {
                location: format!("child commit of {}", ci.commit),
                commit: child.clone(),
            })?,
            Some(child_info) => {
                if child_info.parent_commit.as_ref() != Some(&ci.commit) {
                    reporter.report(Violation::CommitAncestryBroken {
                        parent: ci.commit.clone(),
                        child: child_info.commit.clone(),
                    })?;
                }
            }
        }
    }
    Ok(())
}
