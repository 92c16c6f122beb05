use crate::core::area_forecast::AreaForecast;
use crate::core::building::{BuildingCategory, BuildingCode, BuildingCodes};
use crate::core::column_operations::{Keyspace, ResolvedTable};
use crate::core::condition_shares::{CategorySCurves, ConditionShares};
use crate::core::construction::{demolition_floor_area, ConstructionDrivers, ConstructionForecast};
use crate::core::energy_need::{EnergyNeed, EnergyNeedTables};
use crate::core::energy_use::{EnergyUse, EnergyUseByCarrier};
use crate::core::heating_systems::efficiencies::HeatingSystemEfficiencies;
use crate::core::heating_systems::projection::{
    HeatingSystemProjection, SwitchFractions, SystemSwitch,
};
use crate::core::heating_systems::HeatingSystem;
use crate::core::holiday_home::HolidayHomeEnergy;
use crate::errors::EbmError;
use crate::input::{HolidayHomeRow, InputTables};
use crate::model_period::YearRange;
use indexmap::IndexMap;
use tracing::info;

/// The last pipeline stage a run computes and reports.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Step {
    Area,
    EnergyNeed,
    HeatingSystems,
    #[default]
    EnergyUse,
}

/// Everything a run computed, each stage present when the run reached it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunResults {
    pub model_years: YearRange,
    pub step: Step,
    pub area: AreaForecast,
    pub energy_need: Option<EnergyNeed>,
    pub heating_system_shares: Option<HeatingSystemProjection>,
    pub energy_use: Option<EnergyUse>,
    pub energy_use_by_carrier: Option<EnergyUseByCarrier>,
    pub holiday_home_energy: Option<HolidayHomeEnergy>,
}

#[derive(Debug)]
pub struct Corpus {
    model_years: YearRange,
    building_codes: BuildingCodes,
    keyspace: Keyspace,
    s_curves: IndexMap<BuildingCategory, CategorySCurves>,
    start_areas: IndexMap<BuildingCategory, IndexMap<BuildingCode, f64>>,
    construction_drivers: ConstructionDrivers,
    energy_need_tables: EnergyNeedTables,
    heating_system_initial_shares: ResolvedTable<HeatingSystem, f64>,
    heating_system_forecast: ResolvedTable<SystemSwitch, SwitchFractions>,
    heating_system_efficiencies: HeatingSystemEfficiencies,
    holiday_home_energy: Vec<HolidayHomeRow>,
}

impl Corpus {
    pub fn from_inputs(input: InputTables, model_years: YearRange) -> Result<Self, EbmError> {
        let missing_curves: Vec<String> = input
            .keyspace
            .categories
            .iter()
            .filter(|category| !input.s_curves.contains_key(*category))
            .map(|category| category.to_string())
            .collect();
        if !missing_curves.is_empty() {
            return Err(EbmError::InvariantBreach {
                description: "building categories without s-curves".to_string(),
                offending: missing_curves,
            });
        }

        Ok(Self {
            model_years,
            building_codes: input.building_codes,
            keyspace: input.keyspace,
            s_curves: input.s_curves,
            start_areas: input.start_areas,
            construction_drivers: input.construction_drivers,
            energy_need_tables: input.energy_need,
            heating_system_initial_shares: input.heating_system_initial_shares,
            heating_system_forecast: input.heating_system_forecast,
            heating_system_efficiencies: input.heating_system_efficiencies,
            holiday_home_energy: input.holiday_home_energy,
        })
    }

    /// Run the pipeline stages in order, stopping after `step`.
    pub fn run(&self, step: Step) -> Result<RunResults, EbmError> {
        let mut results = RunResults {
            model_years: self.model_years,
            step,
            area: self.area_forecast()?,
            ..Default::default()
        };
        if step == Step::Area {
            return Ok(results);
        }

        let energy_need = self.energy_need()?;
        if step == Step::EnergyNeed {
            results.energy_need = Some(energy_need);
            return Ok(results);
        }

        let projection = self.heating_system_projection()?;
        if step == Step::HeatingSystems {
            results.energy_need = Some(energy_need);
            results.heating_system_shares = Some(projection);
            return Ok(results);
        }

        info!("Calculating energy use");
        let energy_use = EnergyUse::calculate(
            &results.area,
            &energy_need,
            &projection,
            &self.heating_system_efficiencies,
        )?;
        let holiday_home_energy =
            HolidayHomeEnergy::extrapolate(&self.holiday_home_energy, self.model_years);
        let by_carrier = EnergyUseByCarrier::aggregate(&energy_use, Some(&holiday_home_energy));
        info!(
            rows = energy_use.len(),
            carrier_rows = by_carrier.len(),
            "Calculated energy use"
        );

        results.energy_need = Some(energy_need);
        results.heating_system_shares = Some(projection);
        results.energy_use = Some(energy_use);
        results.energy_use_by_carrier = Some(by_carrier);
        results.holiday_home_energy = Some(holiday_home_energy);
        Ok(results)
    }

    /// Condition shares, then demolition feeding construction, then area, per category.
    pub(crate) fn area_forecast(&self) -> Result<AreaForecast, EbmError> {
        info!(years = %self.model_years, "Forecasting floor area");
        let empty = IndexMap::new();
        let mut forecasts = vec![];

        for category in &self.keyspace.categories {
            let Some(s_curves) = self.s_curves.get(category) else {
                continue;
            };
            let start_areas = self.start_areas.get(category).unwrap_or(&empty);

            let shares = ConditionShares::calculate(
                *category,
                s_curves,
                &self.building_codes,
                self.model_years,
            )?;
            let demolition = demolition_floor_area(
                &shares,
                &self.building_codes,
                start_areas,
                self.model_years,
            );
            let construction = ConstructionForecast::calculate(
                *category,
                &self.construction_drivers,
                start_areas.values().sum(),
                &demolition,
                self.model_years,
            )?;

            forecasts.push(AreaForecast::for_category(
                *category,
                &self.building_codes,
                &shares,
                start_areas,
                &construction,
                self.model_years,
            ));
        }

        let area = AreaForecast::merge(forecasts);
        info!(rows = area.len(), "Forecast floor area");
        Ok(area)
    }

    pub(crate) fn energy_need(&self) -> Result<EnergyNeed, EbmError> {
        info!("Calculating energy need");
        let energy_need =
            EnergyNeed::calculate(&self.energy_need_tables, &self.keyspace, self.model_years)?;
        info!(rows = energy_need.len(), "Calculated energy need");
        Ok(energy_need)
    }

    pub(crate) fn heating_system_projection(&self) -> Result<HeatingSystemProjection, EbmError> {
        info!("Projecting heating system shares");
        let known_systems: Vec<HeatingSystem> = self
            .heating_system_efficiencies
            .heating_systems()
            .cloned()
            .collect();
        let projection = HeatingSystemProjection::project(
            &self.heating_system_initial_shares,
            &self.heating_system_forecast,
            &known_systems,
            &self.keyspace,
            self.model_years,
        )?;
        info!(rows = projection.len(), "Projected heating system shares");
        Ok(projection)
    }
}
