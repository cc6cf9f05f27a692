//! Minor-unit money arithmetic.

/// `numerator / denominator` rounded half away from zero.
///
/// `denominator` must be positive; a zero denominator yields 0.
pub fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    if denominator <= 0 {
        return 0;
    }
    let magnitude = (numerator.abs() * 2 + denominator) / (denominator * 2);
    let signed = if numerator < 0 { -magnitude } else { magnitude };
    signed.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        assert_eq!(div_round_half_up(5, 2), 3);
        assert_eq!(div_round_half_up(4, 2), 2);
        assert_eq!(div_round_half_up(7, 3), 2);
        assert_eq!(div_round_half_up(8, 3), 3);
    }

    #[test]
    fn rounds_negative_away_from_zero() {
        assert_eq!(div_round_half_up(-5, 2), -3);
        assert_eq!(div_round_half_up(-7, 3), -2);
    }

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(div_round_half_up(10, 0), 0);
    }
}
