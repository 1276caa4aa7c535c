//! Property-based tests for the comparator and the divergence locator.
//!
//! - identical results always PASS, whatever the bytes
//! - nondeterministic fixtures are SKIPPED regardless of their results
//! - any stdout difference is a MISMATCH whose offset is the first
//!   differing byte

use diffharness::compare::{Comparator, first_divergence};
use diffharness::model::{ExecutionResult, FixtureDescriptor, VerdictStatus};
use proptest::prelude::*;
use std::path::PathBuf;

fn fixture(nondeterministic: bool) -> FixtureDescriptor {
    FixtureDescriptor {
        id: "Prop_01".to_string(),
        entry_point: "Prop_01.Main".to_string(),
        args: Vec::new(),
        timeout_ms: 1000,
        nondeterministic_expected: nondeterministic,
        category: None,
        dir: PathBuf::from("Prop_01"),
    }
}

fn result(config: &str, stdout: &[u8], exit_code: i32) -> ExecutionResult {
    let mut result = ExecutionResult::new("Prop_01", config);
    result.stdout = stdout.to_vec();
    result.exit_code = exit_code;
    result
}

fn config_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 2..5).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn identical_results_pass(
        names in config_names(),
        stdout in prop::collection::vec(any::<u8>(), 0..256),
        exit_code in 0i32..3,
    ) {
        let comparator = Comparator::new(names.clone());
        let results: Vec<_> = names.iter().map(|n| result(n, &stdout, exit_code)).collect();
        let verdict = comparator.compare(&fixture(false), &results);
        prop_assert_eq!(verdict.status, VerdictStatus::Pass);
        prop_assert!(verdict.detail.is_none());
    }

    #[test]
    fn nondeterministic_always_skipped(
        names in config_names(),
        outputs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 4),
    ) {
        let comparator = Comparator::new(names.clone());
        let results: Vec<_> = names
            .iter()
            .zip(outputs.iter().cycle())
            .map(|(n, out)| result(n, out, 0))
            .collect();
        let verdict = comparator.compare(&fixture(true), &results);
        prop_assert_eq!(verdict.status, VerdictStatus::Skipped);
    }

    #[test]
    fn different_stdout_is_mismatch(
        prefix in prop::collection::vec(any::<u8>(), 0..128),
        a in any::<u8>(),
        b in any::<u8>(),
    ) {
        prop_assume!(a != b);
        let mut left = prefix.clone();
        left.push(a);
        let mut right = prefix.clone();
        right.push(b);

        let comparator = Comparator::new(["baseline", "optimized"]);
        let verdict = comparator.compare(
            &fixture(false),
            &[result("baseline", &left, 0), result("optimized", &right, 0)],
        );
        prop_assert_eq!(verdict.status, VerdictStatus::Mismatch);
        let expected = format!("first divergent byte at offset {}", prefix.len());
        prop_assert!(verdict.detail.unwrap_or_default().contains(&expected));
    }

    #[test]
    fn divergence_is_symmetric(
        a in prop::collection::vec(any::<u8>(), 0..64),
        b in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let ab = first_divergence(&a, &b).map(|d| d.offset);
        let ba = first_divergence(&b, &a).map(|d| d.offset);
        prop_assert_eq!(ab, ba);
        prop_assert_eq!(ab.is_none(), a == b);
    }
}
