use crate::compare_floats::max_of_2;
use crate::core::building::{BuildingCategory, BuildingCode, BuildingCondition, BuildingCodes};
use crate::core::condition_shares::ConditionShares;
use crate::errors::EbmError;
use crate::input::{AreaNewResidentialRow, NewBuildingsResidentialRow};
use crate::model_period::YearRange;
use anyhow::anyhow;
use indexmap::IndexMap;

/// Yearly drivers shared by every category's construction forecast.
#[derive(Clone, Debug, Default)]
pub struct ConstructionDrivers {
    pub population: IndexMap<u32, f64>,
    pub new_buildings_residential: IndexMap<u32, NewBuildingsResidentialRow>,
    pub area_new_residential_buildings: IndexMap<u32, AreaNewResidentialRow>,
    pub area_per_person: IndexMap<BuildingCategory, f64>,
}

impl ConstructionDrivers {
    fn population(&self, year: u32) -> anyhow::Result<f64> {
        self.population
            .get(&year)
            .copied()
            .ok_or_else(|| anyhow!("population_forecast has no row for year {year}"))
    }

    fn new_buildings(&self, year: u32) -> anyhow::Result<&NewBuildingsResidentialRow> {
        self.new_buildings_residential
            .get(&year)
            .ok_or_else(|| anyhow!("new_buildings_residential has no row for year {year}"))
    }

    fn households(&self, year: u32) -> anyhow::Result<f64> {
        Ok(self.population(year)? / self.new_buildings(year)?.household_size)
    }
}

/// Sum over codes of the yearly increase in demolished share times the code's start-year area.
pub fn demolition_floor_area(
    shares: &ConditionShares,
    codes: &BuildingCodes,
    start_areas: &IndexMap<BuildingCode, f64>,
    model_years: YearRange,
) -> IndexMap<u32, f64> {
    model_years
        .iter()
        .map(|year| {
            let demolished = codes
                .codes()
                .map(|code| {
                    let current = shares.share(code, BuildingCondition::Demolition, year);
                    let previous = if year > model_years.start() {
                        shares.share(code, BuildingCondition::Demolition, year - 1)
                    } else {
                        0.
                    };
                    (current - previous) * start_areas.get(code).copied().unwrap_or(0.)
                })
                .sum();
            (year, demolished)
        })
        .collect()
}

/// New floor area per year for one category, and its running total.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstructionForecast {
    category: BuildingCategory,
    model_years: YearRange,
    demolition: IndexMap<u32, f64>,
    constructed: IndexMap<u32, f64>,
    accumulated: IndexMap<u32, f64>,
}

impl ConstructionForecast {
    pub fn calculate(
        category: BuildingCategory,
        drivers: &ConstructionDrivers,
        start_stock: f64,
        demolition: &IndexMap<u32, f64>,
        model_years: YearRange,
    ) -> Result<Self, EbmError> {
        let demolished = |year: u32| demolition.get(&year).copied().unwrap_or(0.);

        let mut constructed = IndexMap::with_capacity(model_years.len());
        for (idx, year) in model_years.iter().enumerate() {
            let raw = if category.is_residential() {
                residential_construction(category, drivers, idx, year, demolished(year))?
            } else {
                non_residential_construction(
                    category,
                    drivers,
                    start_stock,
                    model_years.start(),
                    year,
                    demolished(year),
                )?
            };

            let area = if raw < 0. {
                tracing::warn!(
                    category = %category,
                    year,
                    "Negative construction of {raw:.1} m2 clamped to zero"
                );
                0.
            } else {
                raw
            };
            constructed.insert(year, area);
        }

        let accumulated = constructed
            .iter()
            .scan(0., |total, (year, area)| {
                *total += area;
                Some((*year, *total))
            })
            .collect();

        Ok(Self {
            category,
            model_years,
            demolition: model_years
                .iter()
                .map(|year| (year, demolished(year)))
                .collect(),
            constructed,
            accumulated,
        })
    }

    pub fn category(&self) -> BuildingCategory {
        self.category
    }

    pub fn constructed(&self, year: u32) -> f64 {
        self.constructed.get(&year).copied().unwrap_or(0.)
    }

    pub fn demolition(&self, year: u32) -> f64 {
        self.demolition.get(&year).copied().unwrap_or(0.)
    }

    /// Constructed area accumulated up to and including `year`. Zero before the model
    /// period, held at the final total after it.
    pub fn accumulated(&self, year: u32) -> f64 {
        if year < self.model_years.start() {
            return 0.;
        }
        let year = year.min(self.model_years.end());
        self.accumulated.get(&year).copied().unwrap_or(0.)
    }
}

fn residential_construction(
    category: BuildingCategory,
    drivers: &ConstructionDrivers,
    idx: usize,
    year: u32,
    demolished: f64,
) -> anyhow::Result<f64> {
    // the first two model years are seeded from observed new residential area
    if idx < 2 {
        return Ok(drivers
            .area_new_residential_buildings
            .get(&year)
            .map_or(0., |seed| seed.area_for(category)));
    }

    let household_change = drivers.households(year)? - drivers.households(year - 1)?;
    let new_buildings = drivers.new_buildings(year)?;
    let building_change = household_change * new_buildings.share_for(category);

    Ok(building_change * new_buildings.floor_area_for(category) + demolished)
}

fn non_residential_construction(
    category: BuildingCategory,
    drivers: &ConstructionDrivers,
    start_stock: f64,
    model_start: u32,
    year: u32,
    demolished: f64,
) -> anyhow::Result<f64> {
    if year == model_start {
        return Ok(0.);
    }

    let target_stock = |year: u32| -> anyhow::Result<f64> {
        if category == BuildingCategory::StorageRepairs {
            return Ok(start_stock);
        }
        let area_per_person = match drivers.area_per_person.get(&category) {
            Some(area_per_person) => *area_per_person,
            None => {
                let start_population = drivers.population(model_start)?;
                if start_population > 0. {
                    start_stock / start_population
                } else {
                    0.
                }
            }
        };
        Ok(area_per_person * drivers.population(year)?)
    };

    Ok(target_stock(year)? - target_stock(year - 1)? + max_of_2(0., demolished))
}
