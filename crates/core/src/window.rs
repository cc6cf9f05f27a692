//! Half-open reservation windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A half-open time window `[start, end)`.
///
/// Construction guarantees `start < end`, so a checkout at `T` and a check-in
/// at `T` never overlap and back-to-back bookings are allowed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ValueObject for Window {}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build an optional window from external `from?` / `until?` bounds.
    ///
    /// Both absent means "no window"; exactly one present is a validation error.
    pub fn from_bounds(
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<Option<Self>> {
        match (from, until) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            (Some(_), None) => Err(DomainError::validation("window has a start but no end")),
            (None, Some(_)) => Err(DomainError::validation("window has an end but no start")),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `[a1,a2)` and `[b1,b2)` overlap iff `a1 < b2 && b1 < a2`.
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `at` lies in `[start, end)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Overlap test where an absent window is unbounded and overlaps everything.
pub fn windows_overlap(a: Option<&Window>, b: Option<&Window>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.overlaps(b),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let morning = Window::new(at(10, 0), at(12, 0)).unwrap();
        let afternoon = Window::new(at(12, 0), at(14, 0)).unwrap();
        assert!(!morning.overlaps(&afternoon));
        assert!(!afternoon.overlaps(&morning));
    }

    #[test]
    fn one_minute_of_overlap_counts() {
        let morning = Window::new(at(10, 0), at(12, 1)).unwrap();
        let afternoon = Window::new(at(12, 0), at(14, 0)).unwrap();
        assert!(morning.overlaps(&afternoon));
    }

    #[test]
    fn empty_or_reversed_window_is_rejected() {
        let err = Window::new(at(12, 0), at(12, 0)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidWindow { .. }));
        assert!(Window::new(at(13, 0), at(12, 0)).is_err());
    }

    #[test]
    fn from_bounds_requires_both_or_neither() {
        assert_eq!(Window::from_bounds(None, None).unwrap(), None);
        assert!(Window::from_bounds(Some(at(10, 0)), Some(at(11, 0))).unwrap().is_some());
        assert!(matches!(
            Window::from_bounds(Some(at(10, 0)), None),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Window::from_bounds(None, Some(at(10, 0))),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn unbounded_overlaps_everything() {
        let w = Window::new(at(10, 0), at(11, 0)).unwrap();
        assert!(windows_overlap(None, Some(&w)));
        assert!(windows_overlap(Some(&w), None));
        assert!(windows_overlap(None, None));
    }

    #[test]
    fn contains_is_half_open() {
        let w = Window::new(at(10, 0), at(11, 0)).unwrap();
        assert!(w.contains(at(10, 0)));
        assert!(!w.contains(at(11, 0)));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn window(start: i64, len: i64) -> Window {
            let base = at(0, 0);
            Window::new(
                base + Duration::minutes(start),
                base + Duration::minutes(start + len),
            )
            .unwrap()
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: overlap is symmetric.
            #[test]
            fn overlap_is_symmetric(a in 0i64..2000, la in 1i64..500, b in 0i64..2000, lb in 1i64..500) {
                let x = window(a, la);
                let y = window(b, lb);
                prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
            }

            /// Property: a window starting where another ends never overlaps it.
            #[test]
            fn adjacent_never_overlaps(a in 0i64..2000, la in 1i64..500, lb in 1i64..500) {
                let x = window(a, la);
                let y = window(a + la, lb);
                prop_assert!(!x.overlaps(&y));
            }
        }
    }
}
