pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Clamp `value` into `[lower, upper]`.
pub(crate) fn clamp_between(value: f64, lower: f64, upper: f64) -> f64 {
    max_of_2(lower, min_of_2(value, upper))
}

/// Whether a set of shares closes at `expected` when both are rounded to `decimals` places.
pub(crate) fn closes_at(
    shares: impl IntoIterator<Item = f64>,
    expected: f64,
    decimals: i32,
) -> bool {
    let total: f64 = shares.into_iter().sum();
    let scale = 10f64.powi(decimals);
    (total * scale).round() == (expected * scale).round()
        || is_close!(total, expected, abs_tol = 0.5 / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    pub fn should_calc_2_as_min_of_2_and_4_ints() {
        assert_eq!(min_of_2(2, 4), 2);
    }

    #[rstest]
    pub fn should_calc_2_as_min_of_4_and_2_floats() {
        assert_eq!(min_of_2(4., 2.), 2.);
    }

    #[rstest]
    pub fn should_calc_4_as_max_of_4_and_2_ints() {
        assert_eq!(max_of_2(4, 2), 4);
    }

    #[rstest]
    pub fn should_calc_4_as_max_of_2_and_4_floats() {
        assert_eq!(max_of_2(2., 4.), 4.);
    }

    #[rstest]
    #[case(-0.5, 0.)]
    #[case(0.25, 0.25)]
    #[case(1.5, 1.)]
    fn should_clamp_between_bounds(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(clamp_between(value, 0., 1.), expected);
    }

    #[test]
    fn should_accept_shares_closing_at_one() {
        assert!(closes_at([0.1, 0.2, 0.3, 0.4], 1.0, 5));
        assert!(closes_at([0.333333, 0.333333, 0.333334], 1.0, 5));
    }

    #[test]
    fn should_reject_shares_not_closing_at_one() {
        assert!(!closes_at([0.5, 0.4], 1.0, 5));
        assert!(!closes_at([0.5, 0.50002], 1.0, 5));
    }
}
