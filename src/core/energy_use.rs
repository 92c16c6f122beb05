use crate::core::area_forecast::AreaForecast;
use crate::core::building::{
    BuildingCategory, BuildingCode, BuildingCondition, BuildingGroup, EnergyPurpose,
};
use crate::core::energy_need::EnergyNeed;
use crate::core::heating_systems::efficiencies::{EnergyProduct, HeatingSystemEfficiencies};
use crate::core::heating_systems::projection::HeatingSystemProjection;
use crate::core::heating_systems::{HeatingLoad, HeatingSystem};
use crate::core::holiday_home::HolidayHomeEnergy;
use crate::core::units::kwh_to_gwh;
use crate::errors::EbmError;
use anyhow::anyhow;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EnergyUseKey {
    pub category: BuildingCategory,
    pub code: BuildingCode,
    pub condition: BuildingCondition,
    pub purpose: EnergyPurpose,
    pub year: u32,
    pub heating_system: HeatingSystem,
    pub load: HeatingLoad,
    pub energy_product: EnergyProduct,
}

/// Delivered kWh per (category, code, condition, purpose, year, heating system, load).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnergyUse {
    values: IndexMap<EnergyUseKey, f64>,
}

impl EnergyUse {
    /// `kwh = area * kwh_m2 * share * load_share / load_efficiency` for every load of every
    /// heating system in use.
    pub fn calculate(
        area: &AreaForecast,
        energy_need: &EnergyNeed,
        projection: &HeatingSystemProjection,
        efficiencies: &HeatingSystemEfficiencies,
    ) -> Result<Self, EbmError> {
        let mut values = IndexMap::new();

        for (key, floor_area) in area.iter() {
            if key.condition == BuildingCondition::Demolition || *floor_area <= 0. {
                continue;
            }

            for purpose in EnergyPurpose::iter() {
                let energy_requirement = floor_area
                    * energy_need.kwh_m2(key.category, &key.code, purpose, key.condition, key.year);
                if energy_requirement == 0. {
                    continue;
                }

                for (heating_system, share) in projection.shares(key.category, &key.code, key.year)
                {
                    if share <= 0. {
                        continue;
                    }
                    let efficiency = efficiencies.get(heating_system).ok_or_else(|| {
                        anyhow!("heating_system_efficiencies has no row for '{heating_system}'")
                    })?;

                    for (load, spec) in efficiency.loads_for(purpose) {
                        let kwh = energy_requirement * share * spec.share / spec.efficiency;
                        *values
                            .entry(EnergyUseKey {
                                category: key.category,
                                code: key.code.clone(),
                                condition: key.condition,
                                purpose,
                                year: key.year,
                                heating_system: heating_system.clone(),
                                load,
                                energy_product: spec.energy_product,
                            })
                            .or_default() += kwh;
                    }
                }
            }
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &EnergyUseKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EnergyUseKey, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CarrierKey {
    pub energy_product: EnergyProduct,
    pub building_group: BuildingGroup,
    pub year: u32,
}

/// Delivered GWh per (energy carrier, building group, year).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnergyUseByCarrier {
    values: IndexMap<CarrierKey, f64>,
}

impl EnergyUseByCarrier {
    pub fn aggregate(energy_use: &EnergyUse, holiday_homes: Option<&HolidayHomeEnergy>) -> Self {
        let mut values: IndexMap<CarrierKey, f64> = IndexMap::new();

        for (key, kwh) in energy_use.iter() {
            *values
                .entry(CarrierKey {
                    energy_product: key.energy_product,
                    building_group: key.category.building_group(),
                    year: key.year,
                })
                .or_default() += kwh_to_gwh(*kwh);
        }

        if let Some(holiday_homes) = holiday_homes {
            for ((energy_product, year), gwh) in holiday_homes.iter() {
                *values
                    .entry(CarrierKey {
                        energy_product: *energy_product,
                        building_group: BuildingGroup::HolidayHome,
                        year: *year,
                    })
                    .or_default() += gwh;
            }
        }

        values.sort_keys();
        Self { values }
    }

    pub fn gwh(
        &self,
        energy_product: EnergyProduct,
        building_group: BuildingGroup,
        year: u32,
    ) -> f64 {
        self.values
            .get(&CarrierKey {
                energy_product,
                building_group,
                year,
            })
            .copied()
            .unwrap_or(0.)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CarrierKey, &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
