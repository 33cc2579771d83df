//! Set predicates over branch collections

use super::{Branch, BranchKey};
use std::collections::HashSet;

/// Set equality by canonical key; order and duplicates are ignored.
pub fn equal_branches<'a, A, B>(a: A, b: B) -> bool
where
    A: IntoIterator<Item = &'a Branch>,
    B: IntoIterator<Item = &'a Branch>,
{
    let a: HashSet<BranchKey> = a.into_iter().map(Branch::key).collect();
    let b: HashSet<BranchKey> = b.into_iter().map(Branch::key).collect();
    a == b
}

/// Membership by full value equality.
pub fn branch_in_set(branch: &Branch, set: &[Branch]) -> bool {
    set.iter().any(|b| b == branch)
}
