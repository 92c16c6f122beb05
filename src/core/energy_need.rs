use crate::core::building::{BuildingCategory, BuildingCode, BuildingCondition, EnergyPurpose};
use crate::core::column_operations::{Keyspace, ResolvedTable, ScopeKey};
use crate::core::units::DEFAULT_YEARLY_IMPROVEMENT_START_YEAR;
use crate::errors::EbmError;
use crate::model_period::YearRange;
use indexmap::IndexMap;

/// A calendar efficiency improvement compounding every year from `start_year`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YearlyReduction {
    pub rate: f64,
    pub start_year: u32,
    pub end_year: Option<u32>,
}

impl Default for YearlyReduction {
    fn default() -> Self {
        Self {
            rate: 0.,
            start_year: DEFAULT_YEARLY_IMPROVEMENT_START_YEAR,
            end_year: None,
        }
    }
}

impl YearlyReduction {
    /// `(1 - rate)^(year - start)` with the exponent kept within the active years.
    /// A policy improvement on the same key moves the start to the end of the policy.
    pub fn factor(&self, year: u32, policy: Option<&PolicyImprovement>) -> f64 {
        let effective_start = policy.map_or(self.start_year, |policy| {
            self.start_year.max(policy.end_year)
        });
        let mut exponent = i64::from(year) - i64::from(effective_start);
        if let Some(end_year) = self.end_year {
            exponent = exponent.min(i64::from(end_year) - i64::from(effective_start));
        }
        let exponent = exponent.max(0);

        (1. - self.rate).powi(exponent as i32)
    }
}

/// A policy improvement reached linearly over `[start_year, end_year]` and held after.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolicyImprovement {
    pub start_year: u32,
    pub end_year: u32,
    pub improvement_at_end_year: f64,
}

impl PolicyImprovement {
    pub fn factor(&self, year: u32) -> f64 {
        if year < self.start_year {
            return 1.;
        }
        if year >= self.end_year {
            return 1. - self.improvement_at_end_year;
        }
        let from = f64::from(self.start_year) - 1.;
        let progress = (f64::from(year) - from) / (f64::from(self.end_year) - from);
        1. - self.improvement_at_end_year * progress
    }
}

/// The configuration tables of the energy-need stage, each already resolved per key.
#[derive(Clone, Debug)]
pub struct EnergyNeedTables {
    pub original_condition: ResolvedTable<(), f64>,
    pub behaviour_factor: ResolvedTable<(), f64>,
    pub condition_reduction: ResolvedTable<BuildingCondition, f64>,
    pub yearly_reduction: ResolvedTable<(), YearlyReduction>,
    pub policy_improvement: ResolvedTable<(), PolicyImprovement>,
    pub calibration: ResolvedTable<(), f64>,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EnergyNeedKey {
    pub category: BuildingCategory,
    pub code: BuildingCode,
    pub purpose: EnergyPurpose,
    pub condition: BuildingCondition,
    pub year: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyNeedValue {
    pub kwh_m2: f64,
    /// Without behaviour factor and calibration.
    pub kwh_m2_uncalibrated: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnergyNeed {
    values: IndexMap<EnergyNeedKey, EnergyNeedValue>,
}

impl EnergyNeed {
    pub fn calculate(
        tables: &EnergyNeedTables,
        keyspace: &Keyspace,
        model_years: YearRange,
    ) -> Result<Self, EbmError> {
        let mut values = IndexMap::new();

        for category in &keyspace.categories {
            for code in &keyspace.codes {
                for purpose in &keyspace.purposes {
                    let key = ScopeKey {
                        category: *category,
                        code: code.clone(),
                        purpose: Some(*purpose),
                        extra: (),
                    };
                    let factors = KeyFactors::lookup(tables, &key);

                    for condition in BuildingCondition::existing() {
                        let reduction = tables
                            .condition_reduction
                            .get(&ScopeKey {
                                category: *category,
                                code: code.clone(),
                                purpose: Some(*purpose),
                                extra: condition,
                            })
                            .copied()
                            .unwrap_or(0.);

                        for year in model_years.iter() {
                            let value = factors.value_in(reduction, year);
                            if !(value.kwh_m2.is_finite() && value.kwh_m2 >= 0.) {
                                return Err(EbmError::numeric_domain(
                                    format!("kwh_m2 of {key} in {condition}, {year}"),
                                    value.kwh_m2,
                                ));
                            }
                            values.insert(
                                EnergyNeedKey {
                                    category: *category,
                                    code: code.clone(),
                                    purpose: *purpose,
                                    condition,
                                    year,
                                },
                                value,
                            );
                        }
                    }
                }
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &EnergyNeedKey) -> Option<&EnergyNeedValue> {
        self.values.get(key)
    }

    pub fn kwh_m2(
        &self,
        category: BuildingCategory,
        code: &BuildingCode,
        purpose: EnergyPurpose,
        condition: BuildingCondition,
        year: u32,
    ) -> f64 {
        self.get(&EnergyNeedKey {
            category,
            code: code.clone(),
            purpose,
            condition,
            year,
        })
        .map_or(0., |value| value.kwh_m2)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EnergyNeedKey, &EnergyNeedValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The factors that depend only on (category, code, purpose).
struct KeyFactors {
    original_condition: f64,
    behaviour_factor: f64,
    yearly_reduction: Option<YearlyReduction>,
    policy_improvement: Option<PolicyImprovement>,
    calibration: f64,
}

impl KeyFactors {
    fn lookup(tables: &EnergyNeedTables, key: &ScopeKey<()>) -> Self {
        let original_condition = tables.original_condition.get_or_neutral(key, 0.);
        let behaviour_factor = if tables.behaviour_factor.is_empty() {
            1.
        } else {
            tables.behaviour_factor.get_or_neutral(key, 1.)
        };
        let calibration = if key.purpose == Some(EnergyPurpose::HeatingRv) {
            tables.calibration.get(key).copied().unwrap_or(1.)
        } else {
            1.
        };

        Self {
            original_condition,
            behaviour_factor,
            yearly_reduction: tables.yearly_reduction.get(key).copied(),
            policy_improvement: tables.policy_improvement.get(key).copied(),
            calibration,
        }
    }

    fn value_in(&self, condition_reduction: f64, year: u32) -> EnergyNeedValue {
        let policy = self
            .policy_improvement
            .as_ref()
            .map_or(1., |policy| policy.factor(year));
        let yearly = self.yearly_reduction.as_ref().map_or(1., |yearly| {
            yearly.factor(year, self.policy_improvement.as_ref())
        });
        let reduced = self.original_condition * (1. - condition_reduction) * yearly * policy;

        EnergyNeedValue {
            kwh_m2: reduced * self.behaviour_factor * self.calibration,
            kwh_m2_uncalibrated: reduced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::building::{BuildingCodeParameters, BuildingCodes};
    use crate::core::column_operations::{
        parse_category_selector, parse_code_selector, parse_purpose_selector, ScopedRow,
    };
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn codes() -> BuildingCodes {
        BuildingCodes::new([(
            BuildingCode::new("TEK01"),
            BuildingCodeParameters {
                birth_year: 2001,
                period_start_year: 1999,
                period_end_year: 2006,
            },
        )])
    }

    fn scoped<K, V>(
        category: &str,
        code: &str,
        purpose: &str,
        extra: K,
        value: V,
        codes: &BuildingCodes,
    ) -> ScopedRow<K, V> {
        ScopedRow {
            row: 1,
            category: parse_category_selector(category).unwrap(),
            code: parse_code_selector(code, codes).unwrap(),
            purpose: Some(parse_purpose_selector(purpose).unwrap()),
            extra,
            value,
        }
    }

    fn resolve<K, V>(rows: &[ScopedRow<K, V>], codes: &BuildingCodes) -> ResolvedTable<K, V>
    where
        K: Clone + std::fmt::Debug + Eq + std::hash::Hash,
        V: Clone + PartialEq,
    {
        ResolvedTable::resolve("test", rows, &Keyspace::new(codes)).unwrap()
    }

    fn tables(codes: &BuildingCodes) -> EnergyNeedTables {
        EnergyNeedTables {
            original_condition: resolve(
                &[scoped("default", "default", "default", (), 100., codes)],
                codes,
            ),
            behaviour_factor: resolve(
                &[scoped("house", "TEK01", "lighting", (), 0.5, codes)],
                codes,
            ),
            condition_reduction: resolve(
                &[scoped(
                    "default",
                    "default",
                    "default",
                    BuildingCondition::Renovation,
                    0.25,
                    codes,
                )],
                codes,
            ),
            yearly_reduction: resolve(
                &[scoped(
                    "house",
                    "TEK01",
                    "lighting",
                    (),
                    YearlyReduction {
                        rate: 0.1,
                        start_year: 2010,
                        end_year: None,
                    },
                    codes,
                )],
                codes,
            ),
            policy_improvement: resolve(
                &[scoped(
                    "house",
                    "TEK01",
                    "lighting",
                    (),
                    PolicyImprovement {
                        start_year: 2012,
                        end_year: 2015,
                        improvement_at_end_year: 0.8,
                    },
                    codes,
                )],
                codes,
            ),
            calibration: resolve(
                &[
                    scoped("residential", "default", "heating_rv", (), 1.5, codes),
                    scoped("house", "default", "heating_rv", (), 1.2, codes),
                ],
                codes,
            ),
        }
    }

    // 50, 40, 30, 20, 10, 9, 8.1 needs behaviour 0.5 on the 100 kWh/m2 base and a
    // 2012..2015 policy window. A 2010..2020 window with behaviour 1.0 cannot start at 50.
    // After 2015 the 10 % yearly reduction continues from the policy end year.
    #[rstest]
    fn should_chain_policy_and_yearly_reductions(codes: BuildingCodes) {
        let need = EnergyNeed::calculate(
            &tables(&codes),
            &Keyspace::new(&codes),
            YearRange::new(2011, 2017).unwrap(),
        )
        .unwrap();
        let code = BuildingCode::new("TEK01");

        let series: Vec<f64> = (2011..=2017)
            .map(|year| {
                need.kwh_m2(
                    BuildingCategory::House,
                    &code,
                    EnergyPurpose::Lighting,
                    BuildingCondition::OriginalCondition,
                    year,
                )
            })
            .collect();
        for (actual, expected) in series.iter().zip([50., 40., 30., 20., 10., 9., 8.1]) {
            assert_relative_eq!(*actual, expected, max_relative = 1e-9);
        }
    }

    #[rstest]
    fn should_apply_condition_reduction_and_keep_uncalibrated_value(codes: BuildingCodes) {
        let need = EnergyNeed::calculate(
            &tables(&codes),
            &Keyspace::new(&codes),
            YearRange::new(2020, 2021).unwrap(),
        )
        .unwrap();
        let value = need
            .get(&EnergyNeedKey {
                category: BuildingCategory::House,
                code: BuildingCode::new("TEK01"),
                purpose: EnergyPurpose::HeatingRv,
                condition: BuildingCondition::Renovation,
                year: 2020,
            })
            .unwrap();
        assert_relative_eq!(value.kwh_m2_uncalibrated, 75.);
        assert_relative_eq!(value.kwh_m2, 75. * 1.2);
    }

    #[rstest]
    #[case(BuildingCategory::ApartmentBlock, EnergyPurpose::HeatingRv, 150.)]
    #[case(BuildingCategory::House, EnergyPurpose::HeatingRv, 120.)]
    #[case(BuildingCategory::Office, EnergyPurpose::HeatingRv, 100.)]
    #[case(BuildingCategory::ApartmentBlock, EnergyPurpose::HeatingDhw, 100.)]
    fn should_calibrate_room_heating_only(
        codes: BuildingCodes,
        #[case] category: BuildingCategory,
        #[case] purpose: EnergyPurpose,
        #[case] expected: f64,
    ) {
        let need = EnergyNeed::calculate(
            &tables(&codes),
            &Keyspace::new(&codes),
            YearRange::new(2020, 2020).unwrap(),
        )
        .unwrap();
        assert_relative_eq!(
            need.kwh_m2(
                category,
                &BuildingCode::new("TEK01"),
                purpose,
                BuildingCondition::OriginalCondition,
                2020
            ),
            expected
        );
    }

    #[rstest]
    fn should_exclude_demolition_from_energy_need(codes: BuildingCodes) {
        let need = EnergyNeed::calculate(
            &tables(&codes),
            &Keyspace::new(&codes),
            YearRange::new(2020, 2020).unwrap(),
        )
        .unwrap();
        assert_eq!(need.len(), 13 * 6 * 4);
        assert!(need
            .iter()
            .all(|(key, _)| key.condition != BuildingCondition::Demolition));
    }

    #[rstest]
    #[case(2011, 1.)]
    #[case(2012, 0.8)]
    #[case(2014, 0.4)]
    #[case(2015, 0.2)]
    #[case(2030, 0.2)]
    fn should_reach_policy_improvement_linearly(#[case] year: u32, #[case] expected: f64) {
        let policy = PolicyImprovement {
            start_year: 2012,
            end_year: 2015,
            improvement_at_end_year: 0.8,
        };
        assert_relative_eq!(policy.factor(year), expected, max_relative = 1e-12);
    }

    #[rstest]
    #[case(2019, 1.)]
    #[case(2020, 1.)]
    #[case(2022, 0.81)]
    #[case(2040, 0.729)]
    fn should_compound_yearly_reduction_within_active_years(
        #[case] year: u32,
        #[case] expected: f64,
    ) {
        let yearly = YearlyReduction {
            rate: 0.1,
            end_year: Some(2023),
            ..Default::default()
        };
        assert_relative_eq!(yearly.factor(year, None), expected, max_relative = 1e-12);
    }
}
