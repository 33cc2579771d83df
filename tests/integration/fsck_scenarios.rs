//! Integration tests for the consistency checker over the in-memory store

use super::test_utils::{data_repo, run_fsck, run_fsck_aborting, Fixture};
use provgraph::error::{FsckError, StorageError};
use provgraph::fsck::{Fsck, Violation, HEAD_COMMIT_PROVENANCE};
use provgraph::graph::{BranchInfo, BranchKey, CommitInfo, CommitKey, Repo, RepoInfo, RepoKey};
use provgraph::store::{
    GraphReader, GraphTransaction, GraphWriter, MemoryGraphStore, Visit,
};
use std::collections::BTreeSet;

#[test]
fn test_single_branch_with_head_is_clean() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let head = fx.put_commit("c1");
    fx.put_branch_info(&BranchInfo::new(fx.branch("master")).with_head(head));

    let (found, summary) = run_fsck(&store, false);
    assert!(found.is_empty(), "unexpected violations: {:?}", found);
    assert!(summary.is_clean());
    assert_eq!(summary.branches, 1);
    assert_eq!(summary.commits, 1);
}

#[test]
fn test_unclosed_provenance_reports_full_closure() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_branch_info(&fx.branch_with_head("in"));
    let mut out = fx.branch_with_head("out");
    out.direct_provenance = vec![fx.branch("in")];
    fx.put_branch_info(&out);

    let (found, _) = run_fsck(&store, false);
    assert_eq!(found.len(), 1, "{:?}", found);
    let Violation::BranchProvenanceTransitivity {
        branch_info,
        full_provenance,
    } = &found[0]
    else {
        panic!("expected provenance violation, got {:?}", found[0]);
    };
    assert_eq!(branch_info.branch, fx.branch("out"));
    let keys: BTreeSet<BranchKey> = full_provenance.iter().map(|b| b.key()).collect();
    let expected: BTreeSet<BranchKey> =
        [fx.branch("out").key(), fx.branch("in").key()].into_iter().collect();
    assert_eq!(keys, expected);
    assert_eq!(found[0].missing_provenance(), vec![&fx.branch("in")]);
}

#[test]
fn test_child_missing_from_parent_breaks_ancestry() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let c1 = fx.put_commit("c1");
    fx.put_commit_info(CommitInfo::new(fx.commit("c2")).with_parent(c1.clone()));

    let (found, _) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![Violation::CommitAncestryBroken {
            parent: c1,
            child: fx.commit("c2"),
        }]
    );
}

#[test]
fn test_branch_without_head() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_branch_info(&BranchInfo::new(fx.branch("b")));

    let (found, summary) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![Violation::MissingBranchHead {
            branch: fx.branch("b")
        }]
    );
    assert_eq!(summary.violations, 1);
}

#[test]
fn test_subvenance_missing_dependent_branch() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let q = fx.branch_with_head("q");
    fx.put_branch_info(&q);
    let mut p = fx.branch_with_head("p");
    p.direct_provenance = vec![fx.branch("q")];
    p.provenance = vec![fx.branch("q")];
    fx.put_branch_info(&p);

    let (found, _) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![Violation::BranchSubvenanceTransitivity {
            branch_info: q,
            missing_subvenance: fx.branch("p"),
        }]
    );
}

#[test]
fn test_consistent_chain_across_repos_is_clean() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let other = Repo::with_type("images", "input");
    store.put_repo(&RepoInfo::new(other.clone())).unwrap();

    // images@master -> data@clean -> data@model
    let src_head = other.commit("i1");
    store.put_commit(&CommitInfo::new(src_head.clone())).unwrap();
    let mut src = BranchInfo::new(other.branch("master")).with_head(src_head);
    src.subvenance = vec![fx.branch("clean"), fx.branch("model")];
    store.put_branch(&src).unwrap();

    let mut clean = fx.branch_with_head("clean");
    clean.direct_provenance = vec![other.branch("master")];
    clean.provenance = vec![other.branch("master")];
    clean.subvenance = vec![fx.branch("model")];
    fx.put_branch_info(&clean);

    let mut model = fx.branch_with_head("model");
    model.direct_provenance = vec![fx.branch("clean")];
    model.provenance = vec![fx.branch("clean"), other.branch("master")];
    fx.put_branch_info(&model);

    let (found, summary) = run_fsck(&store, false);
    assert!(found.is_empty(), "unexpected violations: {:?}", found);
    assert_eq!(summary.repos, 2);
    assert_eq!(summary.branches, 3);
}

#[test]
fn test_extra_provenance_is_reported() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let mut stray = fx.branch_with_head("stray");
    stray.subvenance = vec![fx.branch("out")];
    fx.put_branch_info(&stray);
    let mut out = fx.branch_with_head("out");
    out.provenance = vec![fx.branch("stray")];
    fx.put_branch_info(&out);

    let (found, _) = run_fsck(&store, false);
    assert_eq!(found.len(), 1, "{:?}", found);
    assert_eq!(found[0].extra_provenance(), vec![&fx.branch("stray")]);
    assert!(found[0].missing_provenance().is_empty());
    assert!(found[0]
        .to_string()
        .contains("not implied by direct provenance"));
}

#[test]
fn test_missing_parent_and_child_records() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_commit_info(
        CommitInfo::new(fx.commit("c2"))
            .with_parent(fx.commit("c1"))
            .with_children(vec![fx.commit("c3")]),
    );

    let (found, _) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![
            Violation::CommitInfoNotFound {
                location: "parent commit of data.user@c2".to_string(),
                commit: fx.commit("c1"),
            },
            Violation::CommitInfoNotFound {
                location: "child commit of data.user@c2".to_string(),
                commit: fx.commit("c3"),
            },
        ]
    );
}

#[test]
fn test_child_pointing_at_other_parent() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_commit_info(CommitInfo::new(fx.commit("c1")).with_children(vec![fx.commit("c2")]));
    fx.put_commit("c2");

    let (found, _) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![Violation::CommitAncestryBroken {
            parent: fx.commit("c1"),
            child: fx.commit("c2"),
        }]
    );
}

#[test]
fn test_removed_head_commit_is_reported_once_per_provenant_head() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let mut a = fx.branch_with_head("a");
    a.subvenance = vec![fx.branch("out")];
    fx.put_branch_info(&a);
    let mut b = fx.branch_with_head("b");
    b.subvenance = vec![fx.branch("out")];
    fx.put_branch_info(&b);
    let mut out = fx.branch_with_head("out");
    out.direct_provenance = vec![fx.branch("a"), fx.branch("b")];
    out.provenance = vec![fx.branch("a"), fx.branch("b")];
    fx.put_branch_info(&out);

    assert!(run_fsck(&store, false).0.is_empty());
    store.remove_commit(&fx.commit("out-head").key());

    let (found, _) = run_fsck(&store, false);
    let expected = Violation::CommitInfoNotFound {
        location: HEAD_COMMIT_PROVENANCE.to_string(),
        commit: fx.commit("out-head"),
    };
    assert_eq!(found, vec![expected.clone(), expected]);
}

#[test]
fn test_removed_provenant_branch_is_not_found() {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    let mut input = fx.branch_with_head("in");
    input.subvenance = vec![fx.branch("out")];
    fx.put_branch_info(&input);
    let mut out = fx.branch_with_head("out");
    out.direct_provenance = vec![fx.branch("in")];
    out.provenance = vec![fx.branch("in")];
    fx.put_branch_info(&out);

    store.remove_branch(&fx.branch("in").key());

    let (found, _) = run_fsck(&store, false);
    assert_eq!(
        found,
        vec![Violation::BranchInfoNotFound {
            branch: fx.branch("in")
        }]
    );
}

fn messy_store() -> MemoryGraphStore {
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_branch_info(&BranchInfo::new(fx.branch("a")));
    fx.put_branch_info(&BranchInfo::new(fx.branch("b")));
    let mut c = fx.branch_with_head("c");
    c.direct_provenance = vec![fx.branch("a")];
    fx.put_branch_info(&c);
    fx.put_commit_info(CommitInfo::new(fx.commit("x2")).with_parent(fx.commit("x1")));
    store
}

#[test]
fn test_rerun_reports_same_violations() {
    let store = messy_store();
    let (first, _) = run_fsck(&store, false);
    let (second, _) = run_fsck(&store, false);
    assert_eq!(first.len(), 4, "{:?}", first);

    let as_set = |vs: &[Violation]| -> Vec<String> {
        let mut lines: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
        lines.sort();
        lines
    };
    assert_eq!(as_set(&first), as_set(&second));
}

#[test]
fn test_sink_error_stops_scan() {
    let store = messy_store();
    let (delivered, result) = run_fsck_aborting(&store, 2);

    assert_eq!(delivered.len(), 2);
    match result {
        Err(FsckError::Aborted(reason)) => assert_eq!(reason, "sink full after 2"),
        other => panic!("expected sink abort, got {:?}", other),
    }
}

#[test]
fn test_sink_abort_skips_repair() {
    let store = messy_store();
    let writes_before = store.transactional_writes();
    let result = Fsck::new(&store).check_consistency(true, |_| Err("stop"));
    assert!(result.unwrap_err().is_aborted());
    assert_eq!(store.transactional_writes(), writes_before);
}

#[test]
fn test_fix_without_synthesizable_violations_writes_nothing() {
    let store = messy_store();
    let commits_before = store.commit_count();

    let (found, summary) = run_fsck(&store, true);
    assert_eq!(found.len(), 4);
    let repair = summary.repair.expect("fix requested");
    assert!(repair.created.is_empty());
    assert!(repair.already_present.is_empty());
    assert_eq!(store.transactional_writes(), 0);
    assert_eq!(store.commit_count(), commits_before);
}

/// Store whose branch listing fails after repos and commits succeed
struct BrokenBranchIndex {
    inner: MemoryGraphStore,
}

impl GraphReader for BrokenBranchIndex {
    fn list_repos(&self, visit: Visit<'_, RepoInfo>) -> Result<(), StorageError> {
        self.inner.list_repos(visit)
    }

    fn list_commits_by_repo(
        &self,
        repo: &RepoKey,
        visit: Visit<'_, CommitInfo>,
    ) -> Result<(), StorageError> {
        self.inner.list_commits_by_repo(repo, visit)
    }

    fn list_branches_by_repo(
        &self,
        _repo: &RepoKey,
        _visit: Visit<'_, BranchInfo>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Backend("branch index unavailable".to_string()))
    }
}

impl GraphWriter for BrokenBranchIndex {
    fn put_repo(&self, info: &RepoInfo) -> Result<(), StorageError> {
        self.inner.put_repo(info)
    }

    fn put_branch(&self, info: &BranchInfo) -> Result<(), StorageError> {
        self.inner.put_branch(info)
    }

    fn put_commit(&self, info: &CommitInfo) -> Result<(), StorageError> {
        self.inner.put_commit(info)
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn GraphTransaction) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        self.inner.transaction(f)
    }
}

#[test]
fn test_storage_failure_aborts_with_context() {
    let store = BrokenBranchIndex {
        inner: messy_store(),
    };
    let mut delivered = 0;
    let result = Fsck::new(&store).check_consistency::<(), _>(false, |_| {
        delivered += 1;
        Ok(())
    });

    assert_eq!(delivered, 0, "no violation may be reported from a partial snapshot");
    match result {
        Err(FsckError::Storage { context, source }) => {
            assert_eq!(context, format!("listing branches of repo {}", data_repo()));
            assert!(matches!(source, StorageError::Backend(_)));
        }
        other => panic!("expected storage failure, got {:?}", other),
    }
}

#[test]
fn test_commit_key_lookup_is_exact() {
    // "c1" and "c10" share a prefix; only the exact key resolves.
    let store = MemoryGraphStore::new();
    let fx = Fixture::new(&store);
    fx.put_commit("c10");
    fx.put_commit_info(CommitInfo::new(fx.commit("c2")).with_parent(fx.commit("c1")));

    let (found, _) = run_fsck(&store, false);
    assert_eq!(found.len(), 1);
    assert!(matches!(
        &found[0],
        Violation::CommitInfoNotFound { commit, .. } if commit.key() == CommitKey::of(&fx.commit("c1"))
    ));
}
