//! Pool pricing strategies.
//!
//! A strategy answers two separate questions, kept as two separate functions:
//! which single a pool hands out first (`selection_order`) and which price a
//! pool quotes when it has no own price (`price_aggregate`). Once a single is
//! allocated, the single's own price is charged regardless of strategy.

use serde::{Deserialize, Serialize};

use reserva_core::div_round_half_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingStrategy {
    #[default]
    Lowest,
    Highest,
    Average,
}

/// Order candidate singles for allocation.
///
/// `candidates` is in declaration order. LOWEST sorts ascending by price,
/// HIGHEST descending, AVERAGE keeps declaration order. Unpriced candidates
/// go last. Ties keep declaration order (the sort is stable).
pub fn selection_order<K: Copy>(strategy: PricingStrategy, candidates: &[(K, Option<i64>)]) -> Vec<K> {
    let mut ordered: Vec<&(K, Option<i64>)> = candidates.iter().collect();
    match strategy {
        PricingStrategy::Lowest => {
            ordered.sort_by_key(|(_, price)| (price.is_none(), price.unwrap_or(0)));
        }
        PricingStrategy::Highest => {
            ordered.sort_by_key(|(_, price)| (price.is_none(), core::cmp::Reverse(price.unwrap_or(0))));
        }
        PricingStrategy::Average => {}
    }
    ordered.into_iter().map(|(key, _)| *key).collect()
}

/// Aggregate the prices of available singles into one quoted pool price.
///
/// Empty input → `None`. AVERAGE is the arithmetic mean rounded half-up to the
/// nearest minor unit.
pub fn price_aggregate(strategy: PricingStrategy, amounts: &[i64]) -> Option<i64> {
    if amounts.is_empty() {
        return None;
    }
    match strategy {
        PricingStrategy::Lowest => amounts.iter().copied().min(),
        PricingStrategy::Highest => amounts.iter().copied().max(),
        PricingStrategy::Average => {
            let sum: i128 = amounts.iter().map(|a| *a as i128).sum();
            Some(div_round_half_up(sum, amounts.len() as i128))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_orders_ascending_with_stable_ties() {
        let candidates = [("a", Some(30)), ("b", Some(20)), ("c", Some(20)), ("d", Some(25))];
        assert_eq!(
            selection_order(PricingStrategy::Lowest, &candidates),
            vec!["b", "c", "d", "a"]
        );
    }

    #[test]
    fn highest_orders_descending_with_stable_ties() {
        let candidates = [("a", Some(20)), ("b", Some(30)), ("c", Some(30)), ("d", Some(25))];
        assert_eq!(
            selection_order(PricingStrategy::Highest, &candidates),
            vec!["b", "c", "d", "a"]
        );
    }

    #[test]
    fn average_keeps_declaration_order() {
        let candidates = [("a", Some(30)), ("b", Some(10)), ("c", None)];
        assert_eq!(
            selection_order(PricingStrategy::Average, &candidates),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn unpriced_singles_go_last() {
        let candidates = [("a", None), ("b", Some(50)), ("c", Some(10))];
        assert_eq!(selection_order(PricingStrategy::Lowest, &candidates), vec!["c", "b", "a"]);
        assert_eq!(selection_order(PricingStrategy::Highest, &candidates), vec!["b", "c", "a"]);
    }

    #[test]
    fn aggregates_follow_strategy() {
        let prices = [20, 30, 25];
        assert_eq!(price_aggregate(PricingStrategy::Lowest, &prices), Some(20));
        assert_eq!(price_aggregate(PricingStrategy::Highest, &prices), Some(30));
        assert_eq!(price_aggregate(PricingStrategy::Average, &prices), Some(25));
        assert_eq!(price_aggregate(PricingStrategy::Average, &[]), None);
    }

    #[test]
    fn average_rounds_to_nearest_minor_unit() {
        assert_eq!(price_aggregate(PricingStrategy::Average, &[10, 11]), Some(11));
        assert_eq!(price_aggregate(PricingStrategy::Average, &[10, 10, 11]), Some(10));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: every aggregate lies between the cheapest and dearest input.
            #[test]
            fn aggregate_is_bounded(prices in proptest::collection::vec(0i64..1_000_000, 1..20)) {
                let min = *prices.iter().min().unwrap();
                let max = *prices.iter().max().unwrap();
                for strategy in [PricingStrategy::Lowest, PricingStrategy::Highest, PricingStrategy::Average] {
                    let agg = price_aggregate(strategy, &prices).unwrap();
                    prop_assert!(agg >= min && agg <= max);
                }
            }

            /// Property: ordering is a permutation of the candidates.
            #[test]
            fn order_is_a_permutation(prices in proptest::collection::vec(proptest::option::of(0i64..100), 0..20)) {
                let candidates: Vec<(usize, Option<i64>)> = prices.into_iter().enumerate().collect();
                for strategy in [PricingStrategy::Lowest, PricingStrategy::Highest, PricingStrategy::Average] {
                    let mut order = selection_order(strategy, &candidates);
                    order.sort();
                    let expected: Vec<usize> = (0..candidates.len()).collect();
                    prop_assert_eq!(order, expected);
                }
            }
        }
    }
}
