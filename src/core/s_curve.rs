use crate::core::units::DEFAULT_LIFETIME_YEARS;
use crate::errors::EbmError;
use serde::Deserialize;
use serde_valid::Validate;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Validate)]
pub struct SCurveParameters {
    pub earliest_age: u32,
    pub average_age: u32,
    pub last_age: u32,
    pub rush_years: u32,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub rush_share: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub never_share: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SCurve {
    rates: Vec<f64>,
    cumulative: Vec<f64>,
    never_share: f64,
}

impl SCurve {
    pub fn new(parameters: &SCurveParameters) -> Result<Self, EbmError> {
        Self::with_lifetime(parameters, DEFAULT_LIFETIME_YEARS)
    }

    /// Lay out the measure rates for ages `1..=lifetime` in five constant segments:
    /// nothing before the earliest age, an even pre-rush uptake, the rush, an even
    /// post-rush uptake, and nothing after the last age.
    pub fn with_lifetime(parameters: &SCurveParameters, lifetime: u32) -> Result<Self, EbmError> {
        let SCurveParameters {
            earliest_age,
            average_age,
            last_age,
            rush_years,
            rush_share,
            never_share,
        } = *parameters;

        for (name, value) in [
            ("earliest_age", earliest_age),
            ("average_age", average_age),
            ("last_age", last_age),
            ("rush_years", rush_years),
            ("lifetime", lifetime),
        ] {
            if value == 0 {
                return Err(EbmError::numeric_domain(format!("s-curve {name}"), 0.));
            }
        }
        if !(rush_share > 0. && rush_share <= 1.) {
            return Err(EbmError::numeric_domain("s-curve rush_share", rush_share));
        }
        if !(0. ..1.).contains(&never_share) {
            return Err(EbmError::numeric_domain("s-curve never_share", never_share));
        }
        let spread_share = 1. - rush_share - never_share;
        if spread_share < 0. {
            return Err(EbmError::numeric_domain(
                "s-curve share left outside the rush (1 - rush_share - never_share)",
                spread_share,
            ));
        }

        let half_rush = i64::from(rush_years / 2);
        let earliest_years = i64::from(earliest_age) - 1;
        let pre_rush_years = i64::from(average_age) - i64::from(earliest_age) - half_rush;
        let post_rush_years = i64::from(last_age) - i64::from(average_age) - half_rush;
        if pre_rush_years <= 0 {
            return Err(EbmError::numeric_domain(
                "s-curve pre-rush length (average_age - earliest_age - rush_years / 2)",
                pre_rush_years as f64,
            ));
        }
        if post_rush_years <= 0 {
            return Err(EbmError::numeric_domain(
                "s-curve post-rush length (last_age - average_age - rush_years / 2)",
                post_rush_years as f64,
            ));
        }

        let pre_rush_rate = spread_share * 0.5 / pre_rush_years as f64;
        let rush_rate = rush_share / f64::from(rush_years);
        let post_rush_rate = spread_share * 0.5 / post_rush_years as f64;

        let segments = [
            (earliest_years, 0.),
            (pre_rush_years, pre_rush_rate),
            (i64::from(rush_years), rush_rate),
            (post_rush_years, post_rush_rate),
        ];

        // a negative tail cuts the post-rush segment short at the end of the lifetime
        let mut rates: Vec<f64> = segments
            .iter()
            .flat_map(|(length, rate)| std::iter::repeat(*rate).take(*length as usize))
            .take(lifetime as usize)
            .collect();
        rates.resize(lifetime as usize, 0.);

        if let Some(bad) = rates.iter().find(|rate| !rate.is_finite() || **rate < 0.) {
            return Err(EbmError::numeric_domain("s-curve measure rate", *bad));
        }

        let cumulative = rates
            .iter()
            .scan(0., |total, rate| {
                *total += rate;
                Some(*total)
            })
            .collect();

        Ok(Self {
            rates,
            cumulative,
            never_share,
        })
    }

    pub fn lifetime(&self) -> usize {
        self.rates.len()
    }

    pub fn never_share(&self) -> f64 {
        self.never_share
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Measure rate at building age `age` (1-based); zero outside the lifetime.
    pub fn rate_at_age(&self, age: i64) -> f64 {
        if age < 1 {
            return 0.;
        }
        self.rates.get((age - 1) as usize).copied().unwrap_or(0.)
    }

    /// Cumulative share at building age `age`; held at the lifetime total beyond it.
    pub fn cumulative_at_age(&self, age: i64) -> f64 {
        if age < 1 {
            return 0.;
        }
        let idx = ((age - 1) as usize).min(self.cumulative.len().saturating_sub(1));
        self.cumulative.get(idx).copied().unwrap_or(0.)
    }
}
