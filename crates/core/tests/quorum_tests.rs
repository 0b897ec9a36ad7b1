use mesh_core::quorum::{majority, VotePolicy};

const EXACT: VotePolicy = VotePolicy { decimals: None };

#[test]
fn empty_ledger_has_no_majority() {
    assert_eq!(majority(&[], EXACT), None);
}

#[test]
fn single_submission_is_its_own_majority() {
    assert_eq!(majority(&[4.0], EXACT), Some(4.0));
}

#[test]
fn split_pair_has_no_majority() {
    assert_eq!(majority(&[4.0, 5.0], EXACT), None);
}

#[test]
fn two_of_three_wins() {
    assert_eq!(majority(&[4.0, 5.0, 4.0], EXACT), Some(4.0));
}

#[test]
fn threshold_is_floor_half_plus_one() {
    // n = 4: two-two splits miss the bar, three of four clears it.
    assert_eq!(majority(&[1.0, 1.0, 2.0, 2.0], EXACT), None);
    assert_eq!(majority(&[1.0, 1.0, 1.0, 2.0], EXACT), Some(1.0));
    // n = 5: three of five clears it.
    assert_eq!(majority(&[1.0, 2.0, 1.0, 3.0, 1.0], EXACT), Some(1.0));
}

#[test]
fn comparison_is_exact_bitwise() {
    let computed: f64 = 0.1 + 0.2;
    assert_ne!(computed.to_bits(), 0.3f64.to_bits());
    assert_eq!(majority(&[computed, 0.3], EXACT), None);
    assert_eq!(majority(&[computed, 0.3, 0.3], EXACT), Some(0.3));
}

#[test]
fn quantized_policy_merges_near_values() {
    let policy = VotePolicy { decimals: Some(6) };
    assert_eq!(majority(&[1.0, 1.0 + 1e-9], policy), Some(1.0));
    // Differences above the grain still split the vote.
    assert_eq!(majority(&[1.0, 1.1], policy), None);
}

#[test]
fn quantized_policy_respects_threshold() {
    let policy = VotePolicy { decimals: Some(2) };
    assert_eq!(majority(&[2.001, 2.002, 3.0], policy), Some(2.0));
    assert_eq!(majority(&[2.0, 3.0, 4.0], policy), None);
}
