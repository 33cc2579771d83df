//! Canonical identity keys
//!
//! Every map lookup and every stored record is addressed by one of these keys.
//! Keys are derived here and nowhere else:
//!
//! - `RepoKey`   = `<name>.<type>`
//! - `BranchKey` = `<repo key>@<branch name>`
//! - `CommitKey` = `<repo key>@<commit id>`
//!
//! Components are escaped before joining (`%` as `%25`, `.` as `%2E`, `@` as
//! `%40`), so the mapping stays injective for references that never passed
//! [`super::name`] validation. Valid names contain none of these characters
//! and appear in keys verbatim.

use super::{Branch, Commit, Repo};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

const TYPE_SEPARATOR: char = '.';
const ENTITY_SEPARATOR: char = '@';

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            TYPE_SEPARATOR => out.push_str("%2E"),
            ENTITY_SEPARATOR => out.push_str("%40"),
            c => out.push(c),
        }
    }
    out
}

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(
    /// Canonical key of a repo
    RepoKey
);
string_key!(
    /// Canonical key of a branch
    BranchKey
);
string_key!(
    /// Canonical key of a commit
    CommitKey
);

impl RepoKey {
    pub fn of(repo: &Repo) -> Self {
        Self(format!(
            "{}{}{}",
            escape(&repo.name),
            TYPE_SEPARATOR,
            escape(&repo.repo_type)
        ))
    }

    /// Prefix shared by every branch and commit key of this repo.
    ///
    /// Used as the secondary "by repo" index in ordered stores.
    pub fn child_prefix(&self) -> String {
        format!("{}{}", self.0, ENTITY_SEPARATOR)
    }
}

impl BranchKey {
    pub fn of(branch: &Branch) -> Self {
        Self(format!(
            "{}{}",
            RepoKey::of(&branch.repo).child_prefix(),
            escape(&branch.name)
        ))
    }
}

impl CommitKey {
    pub fn of(commit: &Commit) -> Self {
        Self(format!(
            "{}{}",
            RepoKey::of(&commit.repo).child_prefix(),
            escape(&commit.id)
        ))
    }
}
