//! Composite key encoding.
//!
//! The metadata index is a flat key-value store; hierarchy is emulated by
//! concatenating identifiers into partition/sort key pairs. These literal
//! formats are shared with data already at rest, so they must not drift.
//!
//! Identifiers are embedded unescaped. Callers guarantee that org, project,
//! prompt and branch identifiers do not contain the delimiters below
//! (`Org#`, `Project#`, `Prompt#`, `#Branch#`, `Commit#`) or `/` and `:`.

use std::fmt;
use std::time::Duration;

pub const ORG_PREFIX: &str = "Org#";
pub const PROJECT_PREFIX: &str = "Project#";
pub const PROMPT_PREFIX: &str = "Prompt#";
pub const BRANCH_PREFIX: &str = "Branch#";
pub const COMMIT_PREFIX: &str = "Commit#";
pub const BLOB_ROOT: &str = "prompts/";
pub const BLOB_EXTENSION: &str = ".txt";
pub const COMMIT_CACHE_PREFIX: &str = "commit:";

/// Sliding expiration applied to cached commit content.
pub const COMMIT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A partition/sort key pair addressing one record in the metadata index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    pub partition: String,
    pub sort: String,
}

impl CompositeKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.partition, self.sort)
    }
}

/// Partition key grouping every commit of one branch.
pub fn commit_partition_key(org_id: &str, prompt_id: &str, branch_name: &str) -> String {
    format!("{ORG_PREFIX}{org_id}{PROMPT_PREFIX}{prompt_id}#{BRANCH_PREFIX}{branch_name}")
}

pub fn commit_sort_key(commit_id: &str) -> String {
    format!("{COMMIT_PREFIX}{commit_id}")
}

/// Keys for one commit. With an empty `commit_id` the partition key is still
/// the branch's full partition, usable for enumerating its history.
pub fn commit_keys(org_id: &str, prompt_id: &str, branch_name: &str, commit_id: &str) -> CompositeKey {
    CompositeKey::new(
        commit_partition_key(org_id, prompt_id, branch_name),
        commit_sort_key(commit_id),
    )
}

/// Partition key grouping every branch of one prompt.
pub fn branch_partition_key(org_id: &str, prompt_id: &str) -> String {
    format!("{ORG_PREFIX}{org_id}{PROMPT_PREFIX}{prompt_id}")
}

pub fn branch_keys(org_id: &str, prompt_id: &str, branch_name: &str) -> CompositeKey {
    CompositeKey::new(
        branch_partition_key(org_id, prompt_id),
        format!("{BRANCH_PREFIX}{branch_name}"),
    )
}

/// Partition key grouping every prompt of one project.
pub fn prompt_partition_key(org_id: &str, project_id: &str) -> String {
    format!("{ORG_PREFIX}{org_id}{PROJECT_PREFIX}{project_id}")
}

pub fn prompt_keys(org_id: &str, project_id: &str, prompt_id: &str) -> CompositeKey {
    CompositeKey::new(
        prompt_partition_key(org_id, project_id),
        format!("{PROMPT_PREFIX}{prompt_id}"),
    )
}

/// Partition key grouping every project of one org.
pub fn project_partition_key(org_id: &str) -> String {
    format!("{ORG_PREFIX}{org_id}")
}

pub fn project_keys(org_id: &str, project_id: &str) -> CompositeKey {
    CompositeKey::new(
        project_partition_key(org_id),
        format!("{PROJECT_PREFIX}{project_id}"),
    )
}

/// The single logical blob path holding every version of a branch's content.
pub fn blob_path(org_id: &str, project_id: &str, prompt_id: &str, branch_name: &str) -> String {
    format!("{BLOB_ROOT}{org_id}/{project_id}/{prompt_id}/{branch_name}{BLOB_EXTENSION}")
}

pub fn commit_cache_key(prompt_id: &str, branch_name: &str, commit_id: &str) -> String {
    format!("{COMMIT_CACHE_PREFIX}{prompt_id}:{branch_name}:{commit_id}")
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    /// Identifiers free of every delimiter used by the encoder.
    fn id_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,24}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Distinct (org, prompt, branch, commit) tuples never share a key.
        #[test]
        fn prop_commit_keys_injective(
            a in (id_strategy(), id_strategy(), id_strategy(), id_strategy()),
            b in (id_strategy(), id_strategy(), id_strategy(), id_strategy()),
        ) {
            let ka = commit_keys(&a.0, &a.1, &a.2, &a.3);
            let kb = commit_keys(&b.0, &b.1, &b.2, &b.3);
            if a == b {
                prop_assert_eq!(ka, kb);
            } else {
                prop_assert_ne!(ka, kb);
            }
        }

        /// Distinct tenants/projects/prompts/branches never share a blob path.
        #[test]
        fn prop_blob_path_injective(
            a in (id_strategy(), id_strategy(), id_strategy(), id_strategy()),
            b in (id_strategy(), id_strategy(), id_strategy(), id_strategy()),
        ) {
            let pa = blob_path(&a.0, &a.1, &a.2, &a.3);
            let pb = blob_path(&b.0, &b.1, &b.2, &b.3);
            prop_assert_eq!(a == b, pa == pb);
        }

        /// Every commit key of a branch lives under that branch's partition.
        #[test]
        fn prop_commit_partition_ignores_commit_id(
            org in id_strategy(),
            prompt in id_strategy(),
            branch in id_strategy(),
            commit in id_strategy(),
        ) {
            let key = commit_keys(&org, &prompt, &branch, &commit);
            prop_assert_eq!(key.partition, commit_keys(&org, &prompt, &branch, "").partition);
        }

        /// Encoding is pure.
        #[test]
        fn prop_cache_key_deterministic(
            prompt in id_strategy(),
            branch in id_strategy(),
            commit in id_strategy(),
        ) {
            prop_assert_eq!(
                commit_cache_key(&prompt, &branch, &commit),
                commit_cache_key(&prompt, &branch, &commit)
            );
        }
    }
}
