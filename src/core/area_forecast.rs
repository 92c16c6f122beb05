use crate::core::building::{BuildingCategory, BuildingCode, BuildingCodes, BuildingCondition};
use crate::core::condition_shares::ConditionShares;
use crate::core::construction::ConstructionForecast;
use crate::model_period::YearRange;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AreaKey {
    pub category: BuildingCategory,
    pub code: BuildingCode,
    pub condition: BuildingCondition,
    pub year: u32,
}

/// Floor area (m2) per (category, code, condition, year).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaForecast {
    values: IndexMap<AreaKey, f64>,
}

impl AreaForecast {
    /// Area of every code of one category over the model period.
    ///
    /// Pre-construction codes carry their start-year area through the condition shares.
    /// Construction-active codes add the area built during their period, frozen at the
    /// total reached when the period ends.
    pub fn for_category(
        category: BuildingCategory,
        codes: &BuildingCodes,
        shares: &ConditionShares,
        start_areas: &IndexMap<BuildingCode, f64>,
        construction: &ConstructionForecast,
        model_years: YearRange,
    ) -> Self {
        let mut values = IndexMap::with_capacity(codes.len() * model_years.len() * 5);

        for (code, params) in codes.iter() {
            let start_area = start_areas.get(code).copied().unwrap_or(0.);

            for year in model_years.iter() {
                let total = if params.is_pre_construction(model_years.start())
                    || year < params.period_start_year
                {
                    start_area
                } else {
                    let built_until = construction.accumulated(year.min(params.period_end_year));
                    let built_before = params
                        .period_start_year
                        .checked_sub(1)
                        .map_or(0., |year| construction.accumulated(year));
                    start_area + built_until - built_before
                };

                for condition in BuildingCondition::iter() {
                    values.insert(
                        AreaKey {
                            category,
                            code: code.clone(),
                            condition,
                            year,
                        },
                        total * shares.share(code, condition, year),
                    );
                }
            }
        }

        Self { values }
    }

    pub fn from_values(values: impl IntoIterator<Item = (AreaKey, f64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn merge(forecasts: impl IntoIterator<Item = AreaForecast>) -> Self {
        Self {
            values: forecasts.into_iter().flat_map(|f| f.values).collect(),
        }
    }

    pub fn get(&self, key: &AreaKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Area for one slice, zero when the slice is not part of the forecast.
    pub fn area(
        &self,
        category: BuildingCategory,
        code: &BuildingCode,
        condition: BuildingCondition,
        year: u32,
    ) -> f64 {
        self.get(&AreaKey {
            category,
            code: code.clone(),
            condition,
            year,
        })
        .unwrap_or(0.)
    }

    /// Surviving area of a category in `year`, demolished area excluded.
    pub fn surviving_total(&self, category: BuildingCategory, year: u32) -> f64 {
        self.values
            .iter()
            .filter(|(key, _)| {
                key.category == category
                    && key.year == year
                    && key.condition != BuildingCondition::Demolition
            })
            .map(|(_, area)| area)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AreaKey, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
