use crate::compare_floats::{clamp_between, closes_at, max_of_2, min_of_2};
use crate::core::building::{BuildingCategory, BuildingCode, BuildingCodes, BuildingCondition};
use crate::core::s_curve::SCurve;
use crate::core::units::SHARE_CLOSURE_DECIMALS;
use crate::errors::EbmError;
use crate::model_period::YearRange;
use indexmap::IndexMap;

/// Fractions of a code's floor area in each condition for one year.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConditionShareSet {
    pub original_condition: f64,
    pub small_measure: f64,
    pub renovation: f64,
    pub renovation_and_small_measure: f64,
    pub demolition: f64,
}

impl ConditionShareSet {
    pub fn get(&self, condition: BuildingCondition) -> f64 {
        match condition {
            BuildingCondition::OriginalCondition => self.original_condition,
            BuildingCondition::SmallMeasure => self.small_measure,
            BuildingCondition::Renovation => self.renovation,
            BuildingCondition::RenovationAndSmallMeasure => self.renovation_and_small_measure,
            BuildingCondition::Demolition => self.demolition,
        }
    }

    /// Total of the four conditions describing surviving area.
    pub fn surviving(&self) -> f64 {
        BuildingCondition::existing()
            .iter()
            .map(|condition| self.get(*condition))
            .sum()
    }

    fn all(&self) -> [f64; 5] {
        [
            self.original_condition,
            self.small_measure,
            self.renovation,
            self.renovation_and_small_measure,
            self.demolition,
        ]
    }
}

/// The s-curves driving one building category.
#[derive(Clone, Debug)]
pub struct CategorySCurves {
    pub small_measure: SCurve,
    pub renovation: SCurve,
    pub demolition: SCurve,
}

/// Condition shares per (code, year) for one building category.
#[derive(Clone, Debug)]
pub struct ConditionShares {
    category: BuildingCategory,
    shares: IndexMap<(BuildingCode, u32), ConditionShareSet>,
}

impl ConditionShares {
    pub fn calculate(
        category: BuildingCategory,
        s_curves: &CategorySCurves,
        codes: &BuildingCodes,
        model_years: YearRange,
    ) -> Result<Self, EbmError> {
        let mut shares = IndexMap::with_capacity(codes.len() * model_years.len());
        let model_start = model_years.start();

        for (code, params) in codes.iter() {
            let mut demolition_cumulative = 0.;

            for year in model_years.iter() {
                if !params.is_active_in(year, model_start) {
                    shares.insert((code.clone(), year), ConditionShareSet::default());
                    continue;
                }

                let age = i64::from(year) - i64::from(params.birth_year);

                // demolition accumulates from the model start; the first year after birth
                // takes the age-1 rate directly
                if year > model_start && age >= 1 {
                    demolition_cumulative = min_of_2(
                        1.,
                        demolition_cumulative + s_curves.demolition.rate_at_age(age),
                    );
                }

                let share_set = if age <= 0 || year == model_start {
                    ConditionShareSet {
                        original_condition: 1. - demolition_cumulative,
                        demolition: demolition_cumulative,
                        ..Default::default()
                    }
                } else {
                    measure_shares(s_curves, age, demolition_cumulative)
                };

                check_share_set(category, code, year, &share_set)?;
                shares.insert((code.clone(), year), share_set);
            }
        }

        Ok(Self { category, shares })
    }

    pub fn category(&self) -> BuildingCategory {
        self.category
    }

    pub fn get(&self, code: &BuildingCode, year: u32) -> Option<&ConditionShareSet> {
        self.shares.get(&(code.clone(), year))
    }

    /// Share for one condition, zero for (code, year) pairs outside the table.
    pub fn share(&self, code: &BuildingCode, condition: BuildingCondition, year: u32) -> f64 {
        self.get(code, year).map_or(0., |set| set.get(condition))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(BuildingCode, u32), &ConditionShareSet)> {
        self.shares.iter()
    }
}

/// Resolve the conditions in dependency order: demolition, renovation total, small-measure
/// total, their overlap, exclusive renovation, exclusive small measure, and original condition.
///
/// The overlap is whatever the two totals exceed of the area either measure can reach, so the
/// smaller never-share always stays in original condition.
fn measure_shares(s_curves: &CategorySCurves, age: i64, demolition: f64) -> ConditionShareSet {
    let surviving = 1. - demolition;
    let renovation_never = s_curves.renovation.never_share();
    let small_measure_never = s_curves.small_measure.never_share();

    let renovation_total = clamp_between(
        s_curves.renovation.cumulative_at_age(age),
        0.,
        surviving - renovation_never,
    );
    let small_measure_total = clamp_between(
        s_curves.small_measure.cumulative_at_age(age),
        0.,
        surviving - small_measure_never,
    );

    let available = max_of_2(0., surviving - min_of_2(renovation_never, small_measure_never));
    let joint = max_of_2(0., renovation_total + small_measure_total - available);
    let renovation = renovation_total - joint;
    let small_measure = small_measure_total - joint;
    let original_condition = max_of_2(0., surviving - renovation - small_measure - joint);

    ConditionShareSet {
        original_condition,
        small_measure,
        renovation,
        renovation_and_small_measure: joint,
        demolition,
    }
}

fn check_share_set(
    category: BuildingCategory,
    code: &BuildingCode,
    year: u32,
    share_set: &ConditionShareSet,
) -> Result<(), EbmError> {
    if let Some(bad) = share_set
        .all()
        .into_iter()
        .find(|share| !share.is_finite() || *share < 0.)
    {
        return Err(EbmError::numeric_domain(
            format!("condition share of {category}/{code} in {year}"),
            bad,
        ));
    }
    if !closes_at(share_set.all(), 1., SHARE_CLOSURE_DECIMALS) {
        return Err(EbmError::InvariantBreach {
            description: "condition shares do not sum to 1".to_string(),
            offending: vec![format!("{category}/{code}/{year}: {share_set:?}")],
        });
    }
    Ok(())
}
