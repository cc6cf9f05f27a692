use serde::{Deserialize, Serialize};

use reserva_core::{PriceId, ResourceId, Window, div_round_half_up};

use crate::strategy::PricingStrategy;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Where a resolved amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum PriceSource {
    /// The resource's own default price.
    Own { price: PriceId },
    /// The allocated single's default price.
    Single { resource: ResourceId, price: PriceId },
    /// Strategy aggregate over the pool's currently available singles.
    PoolAggregate { strategy: PricingStrategy },
}

/// An amount in minor units, its currency and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub amount: i64,
    pub currency: String,
    pub source: PriceSource,
}

/// Price of a booking over `window`, given a per-day `unit_amount`.
///
/// Duration is fractional days (seconds / 86400, never floored); the result
/// rounds half-up to the nearest minor unit.
pub fn booking_line_price(unit_amount: i64, window: &Window) -> i64 {
    let seconds = window.duration().num_seconds() as i128;
    div_round_half_up(unit_amount as i128 * seconds, SECONDS_PER_DAY as i128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap()
    }

    fn window(len: Duration) -> Window {
        Window::new(start(), start() + len).unwrap()
    }

    #[test]
    fn half_a_day_costs_half() {
        assert_eq!(booking_line_price(10_000, &window(Duration::hours(12))), 5_000);
    }

    #[test]
    fn ninety_minutes_is_prorated() {
        assert_eq!(booking_line_price(10_000, &window(Duration::minutes(90))), 625);
    }

    #[test]
    fn multi_day_is_not_floored() {
        assert_eq!(booking_line_price(10_000, &window(Duration::hours(36))), 15_000);
        assert_eq!(booking_line_price(9_999, &window(Duration::days(3))), 29_997);
    }

    #[test]
    fn rounds_half_up() {
        // 1 * 43200 / 86400 = 0.5 -> 1
        assert_eq!(booking_line_price(1, &window(Duration::hours(12))), 1);
        // 1 * 3600 / 86400 = 0.041 -> 0
        assert_eq!(booking_line_price(1, &window(Duration::hours(1))), 0);
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

            /// Property: whole days price exactly.
            #[test]
            fn whole_days_are_exact(unit in 0i64..1_000_000, days in 1i64..60) {
                prop_assert_eq!(booking_line_price(unit, &window(Duration::days(days))), unit * days);
            }

            /// Property: proration is monotonic in duration.
            #[test]
            fn longer_is_never_cheaper(unit in 0i64..1_000_000, minutes in 1i64..10_000) {
                let shorter = booking_line_price(unit, &window(Duration::minutes(minutes)));
                let longer = booking_line_price(unit, &window(Duration::minutes(minutes + 1)));
                prop_assert!(longer >= shorter);
            }
        }
    }
}
