use crate::search::bias::BiasTerm;
use crate::state::Float;

#[test]
fn matches_uct_formula() {
    let mut bias = BiasTerm::new(2.0);
    bias.start_iteration(8.0);
    let expected = 2.0 * ((8.0 as Float).ln() / 2.0).sqrt();
    assert!((bias.get(2.0) - expected).abs() < 1e-6);
    // The cached log is reused for every child of the step.
    let expected = 2.0 * ((8.0 as Float).ln() / 5.0).sqrt();
    assert!((bias.get(5.0) - expected).abs() < 1e-6);
}

#[test]
fn unvisited_child_is_preferred() {
    let mut bias = BiasTerm::new(1.0);
    bias.start_iteration(100.0);
    assert_eq!(bias.get(0.0), Float::INFINITY);
}

#[test]
fn zero_constant_disables_exploration() {
    let mut bias = BiasTerm::new(0.0);
    bias.start_iteration(100.0);
    assert_eq!(bias.get(0.0), 0.0);
    assert_eq!(bias.get(10.0), 0.0);
}

#[test]
fn small_parent_counts_never_go_negative() {
    let mut bias = BiasTerm::new(1.0);
    bias.start_iteration(0.0);
    assert_eq!(bias.get(3.0), 0.0);
}
