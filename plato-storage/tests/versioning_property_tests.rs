//! Property-Based Tests for Commit Versioning
//!
//! - Any content read back through `get_commit` equals what was committed,
//!   whether served from the cache or the blob store.
//! - Branch history is always listed newest first and without content.
//! - Every blob version created on a branch path stays addressable.

use plato_core::Checksum;
use plato_test_utils::assertions::{assert_newest_first, assert_no_content};
use plato_test_utils::fixtures::{instrumented_store, uncached_store, BRANCH, ORG, PROJECT, PROMPT};
use plato_test_utils::generators::{arb_commit_history, arb_content, arb_identifier};
use plato_test_utils::NewCommit;
use proptest::prelude::*;
use tokio::runtime::Runtime;

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn to_case_error(e: plato_core::PlatoError) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Content and checksum survive a round trip through both read paths.
    #[test]
    fn prop_content_round_trips(content in arb_content()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let harness = instrumented_store();
            let created = harness
                .store
                .create_commit(ORG, PROJECT, PROMPT, BRANCH, NewCommit::new("u", "m", content.clone()))
                .await
                .map_err(to_case_error)?;
            prop_assert_eq!(&created.checksum, &Checksum::of(content.as_bytes()));

            let cached = harness
                .store
                .get_commit(ORG, PROJECT, PROMPT, BRANCH, created.commit_id.as_str())
                .await
                .map_err(to_case_error)?;

            harness.cache.force_misses(true);
            let from_blob = harness
                .store
                .get_commit(ORG, PROJECT, PROMPT, BRANCH, created.commit_id.as_str())
                .await
                .map_err(to_case_error)?;

            prop_assert_eq!(cached.as_ref().and_then(|c| c.content.as_deref()), Some(content.as_str()));
            prop_assert_eq!(cached, from_blob);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// History is strictly newest first, content-free, and complete.
    #[test]
    fn prop_history_newest_first(commits in arb_commit_history(8)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = uncached_store();
            let mut created_ids = Vec::new();
            for commit in commits.iter().cloned() {
                let created = store
                    .create_commit(ORG, PROJECT, PROMPT, BRANCH, commit)
                    .await
                    .map_err(to_case_error)?;
                created_ids.push(created.commit_id);
            }

            let history = store
                .list_commits_by_branch(ORG, PROJECT, PROMPT, BRANCH)
                .await
                .map_err(to_case_error)?;
            assert_newest_first(&history);
            assert_no_content(&history);

            created_ids.reverse();
            let listed: Vec<_> = history.into_iter().map(|c| c.commit_id).collect();
            prop_assert_eq!(listed, created_ids);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Every committed version of a branch reads back its own content.
    #[test]
    fn prop_all_versions_readable(commits in arb_commit_history(6)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = uncached_store();
            let mut created = Vec::new();
            for commit in commits.iter().cloned() {
                created.push(
                    store
                        .create_commit(ORG, PROJECT, PROMPT, BRANCH, commit)
                        .await
                        .map_err(to_case_error)?,
                );
            }

            for (record, input) in created.iter().zip(commits.iter()) {
                let fetched = store
                    .get_commit(ORG, PROJECT, PROMPT, BRANCH, record.commit_id.as_str())
                    .await
                    .map_err(to_case_error)?;
                prop_assert_eq!(
                    fetched.and_then(|c| c.content),
                    Some(input.content.clone())
                );
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Branch names round-trip and deleted names disappear from listings.
    #[test]
    fn prop_branch_listing_tracks_deletes(
        names in prop::collection::btree_set(arb_identifier(), 1..6),
        delete_mask in prop::collection::vec(any::<bool>(), 6),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let harness = instrumented_store();
            let mut expected = Vec::new();
            for (name, delete) in names.iter().zip(delete_mask.iter()) {
                harness
                    .store
                    .create_branch(ORG, PROMPT, name)
                    .await
                    .map_err(to_case_error)?;
                if *delete {
                    harness
                        .store
                        .delete_branch(ORG, PROMPT, name)
                        .await
                        .map_err(to_case_error)?;
                } else {
                    expected.push(name.clone());
                }
            }

            let listed: Vec<_> = harness
                .store
                .list_branches_by_prompt(ORG, PROMPT)
                .await
                .map_err(to_case_error)?
                .into_iter()
                .map(|b| b.name)
                .collect();
            // btree_set iteration is already name-ordered.
            prop_assert_eq!(listed, expected);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
