use mom_basis::{MomentIndexSet, QnMomentIndex};
use mom_core::MomError;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]
    #[test]
    fn flat_index_is_a_bijection(max_l in 0u32..12) {
        let set = MomentIndexSet::new(max_l);
        prop_assert_eq!(set.len(), MomentIndexSet::expected_len(max_l));
        for (flat, qn) in set.iter().enumerate() {
            prop_assert_eq!(set.flat_index(qn).expect("member"), flat);
            prop_assert!(qn.m() <= qn.l());
            prop_assert!(qn.l() <= max_l);
            prop_assert!(!(qn.moment_index() == 2 && qn.m() == 0));
        }
    }

    #[test]
    fn ordering_is_strictly_increasing(max_l in 0u32..10) {
        let set = MomentIndexSet::new(max_l);
        let keys: Vec<(u8, u32, u32)> = set.iter().map(|qn| (qn.moment_index(), qn.l(), qn.m())).collect();
        prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn small_sets_have_known_sizes() {
    assert_eq!(MomentIndexSet::new(0).len(), 2);
    assert_eq!(MomentIndexSet::new(2).len(), 15);
    assert_eq!(MomentIndexSet::for_max_spin(2).len(), 40);
    assert_eq!(MomentIndexSet::for_max_spin(2).max_l(), 4);
}

#[test]
fn malformed_quantum_numbers_fail_fast() {
    for (i, l, m) in [(3, 1, 0), (-1, 1, 0), (0, -1, 0), (0, 2, 3), (1, 2, -1), (2, 4, 0)] {
        let result = QnMomentIndex::new(i, l, m);
        assert!(matches!(result, Err(MomError::Index(_))), "({i}, {l}, {m}) accepted");
    }
}

#[test]
fn labels_beyond_max_l_are_rejected() {
    let set = MomentIndexSet::new(2);
    let qn = QnMomentIndex::new(0, 3, 1).expect("valid label");
    let err = set.flat_index(&qn).expect_err("outside set");
    assert_eq!(err.info().code, "unknown-moment");
}

#[test]
fn mismatched_sets_are_reported() {
    let left = MomentIndexSet::new(2);
    assert!(left.ensure_same(&MomentIndexSet::new(2)).is_ok());
    let err = left.ensure_same(&MomentIndexSet::new(4)).expect_err("differ");
    assert_eq!(err.info().code, "index-set-mismatch");
    assert!(left.ensure_len("moment vector", 14).is_err());
}
