//! Weighted grant aggregation
//!
//! Among all grants a principal's roles hold for one permission, only those
//! from the highest-weight roles count; a single deny among them wins.

use crate::types::WeightedGrant;

/// Aggregate grants for one permission
///
/// Returns `None` when there are no grants (the permission is "not found" at
/// this layer), otherwise the top-weight verdict with deny winning ties.
pub fn resolve_grants(grants: &[WeightedGrant]) -> Option<bool> {
    let top_weight = top_weight(grants)?;

    Some(
        grants
            .iter()
            .filter(|g| g.weight == top_weight)
            .all(|g| g.value),
    )
}

/// Highest weight among the grants
pub fn top_weight(grants: &[WeightedGrant]) -> Option<i32> {
    grants.iter().map(|g| g.weight).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn g(value: bool, weight: i32) -> WeightedGrant {
        WeightedGrant::new(value, weight)
    }

    #[test]
    fn test_empty_is_not_found() {
        assert_eq!(resolve_grants(&[]), None);
    }

    #[test]
    fn test_highest_weight_wins() {
        assert_eq!(resolve_grants(&[g(true, 1), g(false, 100)]), Some(false));
        assert_eq!(resolve_grants(&[g(false, 1), g(true, 100)]), Some(true));
    }

    #[test]
    fn test_deny_wins_ties() {
        assert_eq!(resolve_grants(&[g(true, 10), g(false, 10), g(true, 1)]), Some(false));
        assert_eq!(resolve_grants(&[g(true, 10), g(true, 10), g(false, 1)]), Some(true));
    }

    #[test]
    fn test_negative_weights() {
        assert_eq!(resolve_grants(&[g(false, -5), g(true, -1)]), Some(true));
    }

    proptest! {
        #[test]
        fn prop_matches_top_weight_rule(
            grants in prop::collection::vec((any::<bool>(), -50i32..50), 1..20)
        ) {
            let grants: Vec<WeightedGrant> = grants.into_iter().map(|(v, w)| g(v, w)).collect();
            let max = grants.iter().map(|g| g.weight).max().unwrap();
            let any_top_deny = grants.iter().any(|g| g.weight == max && !g.value);

            prop_assert_eq!(resolve_grants(&grants), Some(!any_top_deny));
        }

        #[test]
        fn prop_order_independent(
            mut grants in prop::collection::vec((any::<bool>(), 0i32..5), 1..12)
        ) {
            let forward: Vec<WeightedGrant> = grants.iter().map(|(v, w)| g(*v, *w)).collect();
            grants.reverse();
            let backward: Vec<WeightedGrant> = grants.iter().map(|(v, w)| g(*v, *w)).collect();

            prop_assert_eq!(resolve_grants(&forward), resolve_grants(&backward));
        }
    }
}
