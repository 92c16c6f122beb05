use crate::compare_floats::closes_at;
use crate::core::building::{
    BuildingCategory, BuildingCode, BuildingCodeParameters, BuildingCodes, BuildingCondition,
    EnergyPurpose,
};
use crate::core::column_operations::{
    parse_category_selector, parse_code_selector, parse_purpose_selector, resolve_one, Keyspace,
    ResolvedTable, ScopeKey, ScopedRow, Selector,
};
use crate::core::condition_shares::CategorySCurves;
use crate::core::construction::ConstructionDrivers;
use crate::core::energy_need::{EnergyNeedTables, PolicyImprovement, YearlyReduction};
use crate::core::heating_systems::efficiencies::{
    EnergyProduct, HeatingSystemEfficiencies, HeatingSystemEfficiency, LoadSpec,
};
use crate::core::heating_systems::projection::{SwitchFractions, SystemSwitch};
use crate::core::heating_systems::HeatingSystem;
use crate::core::s_curve::{SCurve, SCurveParameters};
use crate::core::units::{
    BUILDING_CODE_YEAR_RANGE, DEFAULT_FLOOR_AREA_NEW_APARTMENT_BLOCK,
    DEFAULT_FLOOR_AREA_NEW_HOUSE, DEFAULT_YEARLY_IMPROVEMENT_START_YEAR, SHARE_CLOSURE_DECIMALS,
};
use crate::errors::{EbmError, SchemaViolation};
use crate::model_period::YearRange;
use csv::{ReaderBuilder as CsvReaderBuilder, StringRecord, Trim};
use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_valid::Validate;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

pub const BUILDING_CODE_PARAMETERS: &str = "building_code_parameters.csv";
pub const S_CURVE: &str = "s_curve.csv";
pub const AREA: &str = "area.csv";
pub const POPULATION_FORECAST: &str = "population_forecast.csv";
pub const NEW_BUILDINGS_RESIDENTIAL: &str = "new_buildings_residential.csv";
pub const AREA_NEW_RESIDENTIAL_BUILDINGS: &str = "area_new_residential_buildings.csv";
pub const AREA_PER_PERSON: &str = "area_per_person.csv";
pub const ENERGY_NEED_ORIGINAL_CONDITION: &str = "energy_need_original_condition.csv";
pub const ENERGY_NEED_BEHAVIOUR_FACTOR: &str = "energy_need_behaviour_factor.csv";
pub const IMPROVEMENT_BUILDING_UPGRADE: &str = "improvement_building_upgrade.csv";
pub const ENERGY_NEED_IMPROVEMENTS: &str = "energy_need_improvements.csv";
pub const CALIBRATE_HEATING_RV: &str = "calibrate_heating_rv.csv";
pub const HEATING_SYSTEM_INITIAL_SHARES: &str = "heating_system_initial_shares.csv";
pub const HEATING_SYSTEM_EFFICIENCIES: &str = "heating_system_efficiencies.csv";
pub const HEATING_SYSTEM_FORECAST: &str = "heating_system_forecast.csv";
pub const HOLIDAY_HOME_ENERGY_CONSUMPTION: &str = "holiday_home_energy_consumption.csv";

pub const REQUIRED_FILES: [&str; 10] = [
    BUILDING_CODE_PARAMETERS,
    S_CURVE,
    AREA,
    POPULATION_FORECAST,
    NEW_BUILDINGS_RESIDENTIAL,
    AREA_NEW_RESIDENTIAL_BUILDINGS,
    ENERGY_NEED_ORIGINAL_CONDITION,
    IMPROVEMENT_BUILDING_UPGRADE,
    HEATING_SYSTEM_INITIAL_SHARES,
    HEATING_SYSTEM_EFFICIENCIES,
];

const FORECAST_KEY_COLUMNS: [&str; 4] = [
    "building_category",
    "building_code",
    "heating_system",
    "new_heating_system",
];

#[derive(Debug, Deserialize, Validate)]
struct BuildingCodeRow {
    building_code: String,
    birth_year: u32,
    period_start_year: u32,
    period_end_year: u32,
}

/// The measures an s-curve row can describe.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum SCurveMeasure {
    SmallMeasure,
    Renovation,
    Demolition,
}

#[derive(Debug, Deserialize, Validate)]
struct SCurveRow {
    building_category: String,
    condition: SCurveMeasure,
    #[validate(minimum = 1)]
    earliest_age: u32,
    #[validate(minimum = 1)]
    average_age: u32,
    #[validate(minimum = 1)]
    last_age: u32,
    #[validate(minimum = 1)]
    rush_years: u32,
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    rush_share: f64,
    #[validate(minimum = 0.)]
    #[validate(exclusive_maximum = 1.)]
    never_share: f64,
}

impl SCurveRow {
    fn parameters(&self) -> SCurveParameters {
        SCurveParameters {
            earliest_age: self.earliest_age,
            average_age: self.average_age,
            last_age: self.last_age,
            rush_years: self.rush_years,
            rush_share: self.rush_share,
            never_share: self.never_share,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct AreaRow {
    building_category: String,
    building_code: String,
    #[validate(minimum = 0.)]
    area: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct PopulationRow {
    year: u32,
    #[validate(minimum = 0.)]
    population: f64,
}

fn default_floor_area_new_house() -> f64 {
    DEFAULT_FLOOR_AREA_NEW_HOUSE
}

fn default_floor_area_new_apartment_block() -> f64 {
    DEFAULT_FLOOR_AREA_NEW_APARTMENT_BLOCK
}

/// Household size and the split of new dwellings between houses and apartment blocks.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
pub struct NewBuildingsResidentialRow {
    pub year: u32,
    #[validate(exclusive_minimum = 0.)]
    pub household_size: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub share_new_house: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub share_new_apartment_block: f64,
    #[serde(default = "default_floor_area_new_house")]
    #[validate(exclusive_minimum = 0.)]
    pub floor_area_new_house: f64,
    #[serde(default = "default_floor_area_new_apartment_block")]
    #[validate(exclusive_minimum = 0.)]
    pub floor_area_new_apartment_block: f64,
}

impl NewBuildingsResidentialRow {
    pub fn share_for(&self, category: BuildingCategory) -> f64 {
        match category {
            BuildingCategory::House => self.share_new_house,
            BuildingCategory::ApartmentBlock => self.share_new_apartment_block,
            _ => 0.,
        }
    }

    pub fn floor_area_for(&self, category: BuildingCategory) -> f64 {
        match category {
            BuildingCategory::House => self.floor_area_new_house,
            BuildingCategory::ApartmentBlock => self.floor_area_new_apartment_block,
            _ => 0.,
        }
    }
}

/// Observed new residential floor area (m2), seeding the first construction years.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
pub struct AreaNewResidentialRow {
    pub year: u32,
    #[validate(minimum = 0.)]
    pub house: f64,
    #[validate(minimum = 0.)]
    pub apartment_block: f64,
}

impl AreaNewResidentialRow {
    pub fn area_for(&self, category: BuildingCategory) -> f64 {
        match category {
            BuildingCategory::House => self.house,
            BuildingCategory::ApartmentBlock => self.apartment_block,
            _ => 0.,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
struct AreaPerPersonRow {
    building_category: String,
    #[validate(minimum = 0.)]
    area_per_person: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct EnergyNeedRow {
    building_category: String,
    building_code: String,
    purpose: String,
    #[validate(minimum = 0.)]
    kwh_m2: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct BehaviourFactorRow {
    building_category: String,
    building_code: String,
    purpose: String,
    #[validate(minimum = 0.)]
    behaviour_factor: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct ConditionReductionRow {
    building_category: String,
    building_code: String,
    purpose: String,
    building_condition: BuildingCondition,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    reduction_share: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum ImprovementFunction {
    #[serde(alias = "yearly_efficiency_improvement")]
    YearlyReduction,
    ImprovementAtEndYear,
}

#[derive(Debug, Deserialize, Validate)]
struct ImprovementRow {
    building_category: String,
    building_code: String,
    purpose: String,
    function: ImprovementFunction,
    #[serde(default)]
    start_year: Option<u32>,
    #[serde(default)]
    end_year: Option<u32>,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    value: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct CalibrationRow {
    building_category: String,
    purpose: String,
    #[validate(minimum = 0.)]
    heating_rv_factor: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct InitialShareRow {
    building_category: String,
    building_code: String,
    heating_system: String,
    year: u32,
    #[serde(rename = "TEK_shares")]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    tek_shares: f64,
}

#[derive(Debug, Deserialize, Validate)]
struct HeatingSystemEfficiencyRow {
    heating_system: String,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    base_load_share: f64,
    #[validate(exclusive_minimum = 0.)]
    base_load_efficiency: f64,
    base_load_energy_product: String,
    #[serde(default)]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    peak_load_share: Option<f64>,
    #[serde(default)]
    #[validate(exclusive_minimum = 0.)]
    peak_load_efficiency: Option<f64>,
    #[serde(default)]
    peak_load_energy_product: Option<String>,
    #[serde(default)]
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    tertiary_load_share: Option<f64>,
    #[serde(default)]
    #[validate(exclusive_minimum = 0.)]
    tertiary_load_efficiency: Option<f64>,
    #[serde(default)]
    tertiary_load_energy_product: Option<String>,
    #[validate(exclusive_minimum = 0.)]
    dhw_efficiency: f64,
    dhw_energy_product: String,
    #[serde(default)]
    #[validate(exclusive_minimum = 0.)]
    specific_electricity_efficiency: Option<f64>,
    #[serde(default)]
    #[validate(exclusive_minimum = 0.)]
    cooling_efficiency: Option<f64>,
}

/// Observed holiday-home energy use (GWh) per carrier.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
pub struct HolidayHomeRow {
    pub year: u32,
    #[validate(minimum = 0.)]
    pub electricity: f64,
    #[validate(minimum = 0.)]
    pub fuelwood: f64,
    #[validate(minimum = 0.)]
    pub fossil: f64,
}

/// Every table of an input directory, validated and resolved to one value per key.
#[derive(Clone, Debug)]
pub struct InputTables {
    pub building_codes: BuildingCodes,
    pub keyspace: Keyspace,
    pub s_curves: IndexMap<BuildingCategory, CategorySCurves>,
    pub start_areas: IndexMap<BuildingCategory, IndexMap<BuildingCode, f64>>,
    pub construction_drivers: ConstructionDrivers,
    pub energy_need: EnergyNeedTables,
    pub heating_system_initial_shares: ResolvedTable<HeatingSystem, f64>,
    pub heating_system_forecast: ResolvedTable<SystemSwitch, SwitchFractions>,
    pub heating_system_efficiencies: HeatingSystemEfficiencies,
    pub holiday_home_energy: Vec<HolidayHomeRow>,
}

/// Rows of every table, parsed and validated but not yet resolved.
struct RawTables {
    building_codes: BuildingCodes,
    s_curves: Vec<ScopedRow<SCurveMeasure, SCurveParameters>>,
    start_areas: IndexMap<BuildingCategory, IndexMap<BuildingCode, f64>>,
    construction_drivers: ConstructionDrivers,
    original_condition: Vec<ScopedRow<(), f64>>,
    behaviour_factor: Vec<ScopedRow<(), f64>>,
    condition_reduction: Vec<ScopedRow<BuildingCondition, f64>>,
    yearly_reduction: Vec<ScopedRow<(), YearlyReduction>>,
    policy_improvement: Vec<ScopedRow<(), PolicyImprovement>>,
    calibration: Vec<ScopedRow<(), f64>>,
    initial_shares: Vec<ScopedRow<HeatingSystem, f64>>,
    forecast: Vec<ScopedRow<SystemSwitch, SwitchFractions>>,
    efficiencies: HeatingSystemEfficiencies,
    holiday_home_energy: Vec<HolidayHomeRow>,
}

impl InputTables {
    /// Load every table from `input_dir`.
    ///
    /// Fails with [`EbmError::MissingInput`] naming every absent required table, then with
    /// [`EbmError::SchemaViolations`] listing every violation found across all tables.
    pub fn load(input_dir: &Path, model_years: YearRange) -> Result<Self, EbmError> {
        let missing: Vec<String> = REQUIRED_FILES
            .iter()
            .filter(|file| !input_dir.join(file).is_file())
            .map(|file| file.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EbmError::MissingInput { files: missing });
        }

        let mut reader = TableReader::new(input_dir);
        let raw = reader.read_all(model_years);
        reader.finish()?;

        Self::resolve(raw)
    }

    fn resolve(raw: RawTables) -> Result<Self, EbmError> {
        let keyspace = Keyspace::new(&raw.building_codes);

        let mut s_curves = IndexMap::new();
        // s-curves are keyed by category only, so any known code stands in for the code column
        if let Some(code) = keyspace.codes.first() {
            for category in BuildingCategory::iter() {
                let curve = |measure: SCurveMeasure| -> Result<SCurve, EbmError> {
                    let key = ScopeKey {
                        category,
                        code: code.clone(),
                        purpose: None,
                        extra: measure,
                    };
                    match resolve_one("s_curve", &raw.s_curves, &key)? {
                        Some(parameters) => SCurve::new(&parameters),
                        None => Err(EbmError::SchemaViolations(vec![SchemaViolation::new(
                            S_CURVE,
                            None,
                            format!("no {measure:?} curve covers {category}"),
                        )])),
                    }
                };
                s_curves.insert(
                    category,
                    CategorySCurves {
                        small_measure: curve(SCurveMeasure::SmallMeasure)?,
                        renovation: curve(SCurveMeasure::Renovation)?,
                        demolition: curve(SCurveMeasure::Demolition)?,
                    },
                );
            }
        }

        let energy_need = EnergyNeedTables {
            original_condition: ResolvedTable::resolve(
                "energy_need_original_condition",
                &raw.original_condition,
                &keyspace,
            )?,
            behaviour_factor: ResolvedTable::resolve(
                "energy_need_behaviour_factor",
                &raw.behaviour_factor,
                &keyspace,
            )?,
            condition_reduction: ResolvedTable::resolve(
                "improvement_building_upgrade",
                &raw.condition_reduction,
                &keyspace,
            )?,
            yearly_reduction: ResolvedTable::resolve(
                "energy_need_improvements (yearly_reduction)",
                &raw.yearly_reduction,
                &keyspace,
            )?,
            policy_improvement: ResolvedTable::resolve(
                "energy_need_improvements (improvement_at_end_year)",
                &raw.policy_improvement,
                &keyspace,
            )?,
            calibration: ResolvedTable::resolve(
                "calibrate_heating_rv",
                &raw.calibration,
                &keyspace,
            )?,
        };

        let heating_system_initial_shares = ResolvedTable::resolve(
            "heating_system_initial_shares",
            &raw.initial_shares,
            &keyspace,
        )?;
        let heating_system_forecast =
            ResolvedTable::resolve("heating_system_forecast", &raw.forecast, &keyspace)?;

        Ok(Self {
            building_codes: raw.building_codes,
            keyspace,
            s_curves,
            start_areas: raw.start_areas,
            construction_drivers: raw.construction_drivers,
            energy_need,
            heating_system_initial_shares,
            heating_system_forecast,
            heating_system_efficiencies: raw.efficiencies,
            holiday_home_energy: raw.holiday_home_energy,
        })
    }
}

/// Parsed key cells of one row.
struct Scope {
    category: Selector<BuildingCategory>,
    code: Selector<BuildingCode>,
    purpose: Option<Selector<EnergyPurpose>>,
}

impl Scope {
    fn row<K, V>(self, row: usize, extra: K, value: V) -> ScopedRow<K, V> {
        ScopedRow {
            row,
            category: self.category,
            code: self.code,
            purpose: self.purpose,
            extra,
            value,
        }
    }
}

struct TableReader {
    input_dir: PathBuf,
    violations: Vec<SchemaViolation>,
}

impl TableReader {
    fn new(input_dir: &Path) -> Self {
        Self {
            input_dir: input_dir.to_path_buf(),
            violations: vec![],
        }
    }

    fn violation(&mut self, file: &str, row: Option<usize>, message: impl Into<String>) {
        self.violations.push(SchemaViolation::new(file, row, message));
    }

    fn finish(self) -> Result<(), EbmError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(EbmError::SchemaViolations(self.violations))
        }
    }

    fn csv_reader(&mut self, file: &str) -> Option<csv::Reader<std::fs::File>> {
        match CsvReaderBuilder::new()
            .trim(Trim::All)
            .from_path(self.input_dir.join(file))
        {
            Ok(reader) => Some(reader),
            Err(err) => {
                self.violation(file, None, err.to_string());
                None
            }
        }
    }

    /// Deserialize and validate every row of a table, numbering data rows from 1.
    fn rows<T: DeserializeOwned + Validate>(&mut self, file: &str) -> Vec<(usize, T)> {
        let Some(mut reader) = self.csv_reader(file) else {
            return vec![];
        };

        let mut rows = vec![];
        let mut violations = vec![];
        for (idx, record) in reader.deserialize::<T>().enumerate() {
            let row = idx + 1;
            match record {
                Ok(value) => match value.validate() {
                    Ok(()) => rows.push((row, value)),
                    Err(errors) => {
                        violations.push(SchemaViolation::new(file, Some(row), errors.to_string()))
                    }
                },
                Err(err) => violations.push(SchemaViolation::new(file, Some(row), err.to_string())),
            }
        }
        self.violations.extend(violations);

        debug!(
            file = %self.input_dir.join(file).display(),
            rows = rows.len(),
            "Loaded input table"
        );
        rows
    }

    fn optional_rows<T: DeserializeOwned + Validate>(&mut self, file: &str) -> Vec<(usize, T)> {
        if !self.input_dir.join(file).is_file() {
            warn!(file, "Optional input table is absent");
            return vec![];
        }
        self.rows(file)
    }

    fn scope(
        &mut self,
        file: &str,
        row: usize,
        category: &str,
        code: Option<&str>,
        purpose: Option<&str>,
        codes: &BuildingCodes,
    ) -> Option<Scope> {
        let category = parse_category_selector(category);
        let code = code.map_or(Ok(Selector::Default), |code| parse_code_selector(code, codes));
        let purpose = purpose.map(parse_purpose_selector).transpose();

        match (category, code, purpose) {
            (Ok(category), Ok(code), Ok(purpose)) => Some(Scope {
                category,
                code,
                purpose,
            }),
            (category, code, purpose) => {
                for message in [category.err(), code.err(), purpose.err()].into_iter().flatten() {
                    self.violation(file, Some(row), message);
                }
                None
            }
        }
    }

    fn read_all(&mut self, model_years: YearRange) -> RawTables {
        let building_codes = self.building_codes();
        let s_curves = self.s_curves(&building_codes);
        let start_areas = self.start_areas(&building_codes);
        let construction_drivers = self.construction_drivers(model_years);

        let original_condition = self.scoped_values(
            ENERGY_NEED_ORIGINAL_CONDITION,
            false,
            &building_codes,
            |row: &EnergyNeedRow| {
                (
                    row.building_category.as_str(),
                    row.building_code.as_str(),
                    row.purpose.as_str(),
                    row.kwh_m2,
                )
            },
        );
        let behaviour_factor = self.scoped_values(
            ENERGY_NEED_BEHAVIOUR_FACTOR,
            true,
            &building_codes,
            |row: &BehaviourFactorRow| {
                (
                    row.building_category.as_str(),
                    row.building_code.as_str(),
                    row.purpose.as_str(),
                    row.behaviour_factor,
                )
            },
        );
        let condition_reduction = self.condition_reduction(&building_codes);
        let (yearly_reduction, policy_improvement) = self.improvements(&building_codes);
        let calibration = self.calibration(&building_codes);

        let efficiencies = self.efficiencies();
        let initial_shares = self.initial_shares(&building_codes, model_years);
        let forecast = self.forecast(&building_codes);
        self.check_known_systems(&efficiencies, &initial_shares, &forecast);

        let holiday_home_energy = self
            .optional_rows::<HolidayHomeRow>(HOLIDAY_HOME_ENERGY_CONSUMPTION)
            .into_iter()
            .map(|(_, row)| row)
            .collect();

        RawTables {
            building_codes,
            s_curves,
            start_areas,
            construction_drivers,
            original_condition,
            behaviour_factor,
            condition_reduction,
            yearly_reduction,
            policy_improvement,
            calibration,
            initial_shares,
            forecast,
            efficiencies,
            holiday_home_energy,
        }
    }

    fn building_codes(&mut self) -> BuildingCodes {
        let (first_year, last_year) = BUILDING_CODE_YEAR_RANGE;
        let mut codes = IndexMap::new();
        let mut code_rows = vec![];

        for (row, code_row) in self.rows::<BuildingCodeRow>(BUILDING_CODE_PARAMETERS) {
            let code = BuildingCode::new(&code_row.building_code);
            if !(first_year..=last_year).contains(&code_row.birth_year) {
                self.violation(
                    BUILDING_CODE_PARAMETERS,
                    Some(row),
                    format!(
                        "birth_year {} of {code} is outside {first_year}..{last_year}",
                        code_row.birth_year
                    ),
                );
                continue;
            }
            if code_row.period_start_year > code_row.period_end_year {
                self.violation(
                    BUILDING_CODE_PARAMETERS,
                    Some(row),
                    format!("period of {code} ends before it starts"),
                );
                continue;
            }
            if codes.contains_key(&code) {
                self.violation(
                    BUILDING_CODE_PARAMETERS,
                    Some(row),
                    format!("duplicate building code {code}"),
                );
                continue;
            }
            let params = BuildingCodeParameters {
                birth_year: code_row.birth_year,
                period_start_year: code_row.period_start_year,
                period_end_year: code_row.period_end_year,
            };
            code_rows.push((row, code.clone(), params));
            codes.insert(code, params);
        }

        // construction is allocated by period, so periods must not overlap
        code_rows.sort_by_key(|(_, _, params)| params.period_start_year);
        for pair in code_rows.windows(2) {
            let [(_, earlier, earlier_params), (row, later, later_params)] = pair else {
                continue;
            };
            if later_params.period_start_year <= earlier_params.period_end_year {
                self.violation(
                    BUILDING_CODE_PARAMETERS,
                    Some(*row),
                    format!(
                        "period of {later} ({}..{}) overlaps {earlier} ({}..{})",
                        later_params.period_start_year,
                        later_params.period_end_year,
                        earlier_params.period_start_year,
                        earlier_params.period_end_year,
                    ),
                );
            }
        }

        if codes.is_empty() {
            self.violation(BUILDING_CODE_PARAMETERS, None, "no valid building code");
        }
        BuildingCodes::new(codes)
    }

    fn s_curves(
        &mut self,
        codes: &BuildingCodes,
    ) -> Vec<ScopedRow<SCurveMeasure, SCurveParameters>> {
        let rows = self.rows::<SCurveRow>(S_CURVE);
        let scoped: Vec<_> = rows
            .into_iter()
            .filter_map(|(row, s_curve)| {
                self.scope(S_CURVE, row, &s_curve.building_category, None, None, codes)
                    .map(|scope| scope.row(row, s_curve.condition, s_curve.parameters()))
            })
            .collect();

        for category in BuildingCategory::iter() {
            for measure in [
                SCurveMeasure::SmallMeasure,
                SCurveMeasure::Renovation,
                SCurveMeasure::Demolition,
            ] {
                if !scoped
                    .iter()
                    .any(|row| row.extra == measure && row.category.covers(&category))
                {
                    self.violation(
                        S_CURVE,
                        None,
                        format!("no {measure:?} curve covers {category}"),
                    );
                }
            }
        }
        scoped
    }

    fn start_areas(
        &mut self,
        codes: &BuildingCodes,
    ) -> IndexMap<BuildingCategory, IndexMap<BuildingCode, f64>> {
        let mut areas: IndexMap<BuildingCategory, IndexMap<BuildingCode, f64>> = IndexMap::new();

        for (row, area_row) in self.rows::<AreaRow>(AREA) {
            let Some(scope) = self.scope(
                AREA,
                row,
                &area_row.building_category,
                Some(&area_row.building_code),
                None,
                codes,
            ) else {
                continue;
            };
            let (Selector::Single(category), Selector::Single(code)) = (scope.category, scope.code)
            else {
                self.violation(AREA, Some(row), "area rows must name one category and one code");
                continue;
            };
            let by_code = areas.entry(category).or_default();
            if by_code.contains_key(&code) {
                self.violation(AREA, Some(row), format!("duplicate area for {category}/{code}"));
                continue;
            }
            by_code.insert(code, area_row.area);
        }
        areas
    }

    fn construction_drivers(&mut self, model_years: YearRange) -> ConstructionDrivers {
        let population: IndexMap<u32, f64> = self
            .rows::<PopulationRow>(POPULATION_FORECAST)
            .into_iter()
            .map(|(_, row)| (row.year, row.population))
            .collect();
        let new_buildings_residential: IndexMap<u32, NewBuildingsResidentialRow> = self
            .rows::<NewBuildingsResidentialRow>(NEW_BUILDINGS_RESIDENTIAL)
            .into_iter()
            .map(|(_, row)| (row.year, row))
            .collect();
        let area_new_residential_buildings = self
            .rows::<AreaNewResidentialRow>(AREA_NEW_RESIDENTIAL_BUILDINGS)
            .into_iter()
            .map(|(_, row)| (row.year, row))
            .collect();

        for year in model_years.iter() {
            if !population.contains_key(&year) {
                self.violation(POPULATION_FORECAST, None, format!("no row for year {year}"));
            }
            if !new_buildings_residential.contains_key(&year) {
                self.violation(NEW_BUILDINGS_RESIDENTIAL, None, format!("no row for year {year}"));
            }
        }

        let mut area_per_person = IndexMap::new();
        for (row, per_person) in self.optional_rows::<AreaPerPersonRow>(AREA_PER_PERSON) {
            match parse_category_selector(&per_person.building_category) {
                Ok(Selector::Single(category)) => {
                    area_per_person.insert(category, per_person.area_per_person);
                }
                Ok(_) => self.violation(AREA_PER_PERSON, Some(row), "rows must name one category"),
                Err(message) => self.violation(AREA_PER_PERSON, Some(row), message),
            }
        }

        ConstructionDrivers {
            population,
            new_buildings_residential,
            area_new_residential_buildings,
            area_per_person,
        }
    }

    /// Rows keyed by (category, code, purpose) carrying a single number.
    fn scoped_values<T: DeserializeOwned + Validate>(
        &mut self,
        file: &str,
        optional: bool,
        codes: &BuildingCodes,
        columns: impl Fn(&T) -> (&str, &str, &str, f64),
    ) -> Vec<ScopedRow<(), f64>> {
        let rows = if optional {
            self.optional_rows::<T>(file)
        } else {
            self.rows::<T>(file)
        };
        rows.iter()
            .filter_map(|(row, value)| {
                let (category, code, purpose, value) = columns(value);
                self.scope(file, *row, category, Some(code), Some(purpose), codes)
                    .map(|scope| scope.row(*row, (), value))
            })
            .collect()
    }

    fn condition_reduction(
        &mut self,
        codes: &BuildingCodes,
    ) -> Vec<ScopedRow<BuildingCondition, f64>> {
        self.rows::<ConditionReductionRow>(IMPROVEMENT_BUILDING_UPGRADE)
            .into_iter()
            .filter_map(|(row, reduction)| {
                self.scope(
                    IMPROVEMENT_BUILDING_UPGRADE,
                    row,
                    &reduction.building_category,
                    Some(&reduction.building_code),
                    Some(&reduction.purpose),
                    codes,
                )
                .map(|scope| scope.row(row, reduction.building_condition, reduction.reduction_share))
            })
            .collect()
    }

    fn improvements(
        &mut self,
        codes: &BuildingCodes,
    ) -> (
        Vec<ScopedRow<(), YearlyReduction>>,
        Vec<ScopedRow<(), PolicyImprovement>>,
    ) {
        let mut yearly = vec![];
        let mut policy = vec![];

        for (row, improvement) in self.optional_rows::<ImprovementRow>(ENERGY_NEED_IMPROVEMENTS) {
            let Some(scope) = self.scope(
                ENERGY_NEED_IMPROVEMENTS,
                row,
                &improvement.building_category,
                Some(&improvement.building_code),
                Some(&improvement.purpose),
                codes,
            ) else {
                continue;
            };

            match improvement.function {
                ImprovementFunction::YearlyReduction => {
                    let start_year = improvement
                        .start_year
                        .unwrap_or(DEFAULT_YEARLY_IMPROVEMENT_START_YEAR);
                    if improvement.end_year.is_some_and(|end_year| end_year < start_year) {
                        self.violation(
                            ENERGY_NEED_IMPROVEMENTS,
                            Some(row),
                            "end_year is before start_year",
                        );
                        continue;
                    }
                    yearly.push(scope.row(
                        row,
                        (),
                        YearlyReduction {
                            rate: improvement.value,
                            start_year,
                            end_year: improvement.end_year,
                        },
                    ));
                }
                ImprovementFunction::ImprovementAtEndYear => {
                    let (Some(start_year), Some(end_year)) =
                        (improvement.start_year, improvement.end_year)
                    else {
                        self.violation(
                            ENERGY_NEED_IMPROVEMENTS,
                            Some(row),
                            "improvement_at_end_year needs both start_year and end_year",
                        );
                        continue;
                    };
                    if end_year < start_year {
                        self.violation(
                            ENERGY_NEED_IMPROVEMENTS,
                            Some(row),
                            "end_year is before start_year",
                        );
                        continue;
                    }
                    policy.push(scope.row(
                        row,
                        (),
                        PolicyImprovement {
                            start_year,
                            end_year,
                            improvement_at_end_year: improvement.value,
                        },
                    ));
                }
            }
        }

        (yearly, policy)
    }

    fn calibration(&mut self, codes: &BuildingCodes) -> Vec<ScopedRow<(), f64>> {
        self.optional_rows::<CalibrationRow>(CALIBRATE_HEATING_RV)
            .into_iter()
            .filter_map(|(row, calibration)| {
                let scope = self.scope(
                    CALIBRATE_HEATING_RV,
                    row,
                    &calibration.building_category,
                    None,
                    Some(&calibration.purpose),
                    codes,
                )?;
                if scope.purpose != Some(Selector::Single(EnergyPurpose::HeatingRv)) {
                    warn!(
                        file = CALIBRATE_HEATING_RV,
                        row,
                        purpose = calibration.purpose.as_str(),
                        "Calibration only applies to heating_rv; factor has no effect on other purposes"
                    );
                }
                Some(scope.row(row, (), calibration.heating_rv_factor))
            })
            .collect()
    }

    fn efficiencies(&mut self) -> HeatingSystemEfficiencies {
        let file = HEATING_SYSTEM_EFFICIENCIES;
        let mut efficiencies = vec![];
        let mut seen = IndexSet::new();

        for (row, efficiency) in self.rows::<HeatingSystemEfficiencyRow>(file) {
            let heating_system = HeatingSystem::new(&efficiency.heating_system);
            if !seen.insert(heating_system.clone()) {
                self.violation(file, Some(row), format!("duplicate heating system {heating_system}"));
                continue;
            }

            let mut problems = vec![];
            let base_product = parse_product(&efficiency.base_load_energy_product, &mut problems);
            let dhw_product = parse_product(&efficiency.dhw_energy_product, &mut problems);
            let peak = optional_load(
                "peak",
                efficiency.peak_load_share,
                efficiency.peak_load_efficiency,
                efficiency.peak_load_energy_product.as_deref(),
                &mut problems,
            );
            let tertiary = optional_load(
                "tertiary",
                efficiency.tertiary_load_share,
                efficiency.tertiary_load_efficiency,
                efficiency.tertiary_load_energy_product.as_deref(),
                &mut problems,
            );

            let load_shares = [
                Some(efficiency.base_load_share),
                efficiency.peak_load_share,
                efficiency.tertiary_load_share,
            ];
            if !closes_at(load_shares.into_iter().flatten(), 1., SHARE_CLOSURE_DECIMALS) {
                problems.push(format!("load shares of {heating_system} do not sum to 1"));
            }

            if !problems.is_empty() {
                for problem in problems {
                    self.violation(file, Some(row), problem);
                }
                continue;
            }
            let (Some(base_product), Some(dhw_product)) = (base_product, dhw_product) else {
                continue;
            };

            efficiencies.push(HeatingSystemEfficiency {
                heating_system,
                base: LoadSpec {
                    share: efficiency.base_load_share,
                    efficiency: efficiency.base_load_efficiency,
                    energy_product: base_product,
                },
                peak,
                tertiary,
                dhw_efficiency: efficiency.dhw_efficiency,
                dhw_energy_product: dhw_product,
                specific_electricity_efficiency: efficiency
                    .specific_electricity_efficiency
                    .unwrap_or(1.),
                cooling_efficiency: efficiency.cooling_efficiency.unwrap_or(1.),
            });
        }

        HeatingSystemEfficiencies::new(efficiencies)
    }

    /// Shares of the latest year not after the model start.
    fn initial_shares(
        &mut self,
        codes: &BuildingCodes,
        model_years: YearRange,
    ) -> Vec<ScopedRow<HeatingSystem, f64>> {
        let rows = self.rows::<InitialShareRow>(HEATING_SYSTEM_INITIAL_SHARES);
        let Some(base_year) = rows
            .iter()
            .map(|(_, share)| share.year)
            .filter(|year| *year <= model_years.start())
            .max()
        else {
            if !rows.is_empty() {
                self.violation(
                    HEATING_SYSTEM_INITIAL_SHARES,
                    None,
                    format!("no shares for {} or earlier", model_years.start()),
                );
            }
            return vec![];
        };
        if base_year != model_years.start() {
            warn!(
                base_year,
                start_year = model_years.start(),
                "Heating system shares are taken from a year before the model start"
            );
        }

        rows.into_iter()
            .filter(|(_, share)| share.year == base_year)
            .filter_map(|(row, share)| {
                self.scope(
                    HEATING_SYSTEM_INITIAL_SHARES,
                    row,
                    &share.building_category,
                    Some(&share.building_code),
                    None,
                    codes,
                )
                .map(|scope| {
                    scope.row(row, HeatingSystem::new(&share.heating_system), share.tek_shares)
                })
            })
            .collect()
    }

    /// The forecast is wide: four key columns followed by one fraction column per year.
    fn forecast(&mut self, codes: &BuildingCodes) -> Vec<ScopedRow<SystemSwitch, SwitchFractions>> {
        let file = HEATING_SYSTEM_FORECAST;
        if !self.input_dir.join(file).is_file() {
            warn!(file, "Optional input table is absent");
            return vec![];
        }
        let Some(mut reader) = self.csv_reader(file) else {
            return vec![];
        };
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(err) => {
                self.violation(file, None, err.to_string());
                return vec![];
            }
        };

        let mut key_columns = [0usize; 4];
        for (idx, name) in FORECAST_KEY_COLUMNS.iter().enumerate() {
            match headers.iter().position(|header| header == *name) {
                Some(position) => key_columns[idx] = position,
                None => {
                    self.violation(file, None, format!("missing column {name}"));
                    return vec![];
                }
            }
        }
        let mut year_columns = vec![];
        for (position, header) in headers.iter().enumerate() {
            if key_columns.contains(&position) {
                continue;
            }
            match header.parse::<u32>() {
                Ok(year) => year_columns.push((position, year)),
                Err(_) => self.violation(file, None, format!("column '{header}' is not a year")),
            }
        }

        let records: Vec<(usize, Result<StringRecord, csv::Error>)> = reader
            .records()
            .enumerate()
            .map(|(idx, record)| (idx + 1, record))
            .collect();
        let mut scoped = vec![];
        for (row, record) in records {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    self.violation(file, Some(row), err.to_string());
                    continue;
                }
            };
            let cell = |position: usize| record.get(position).unwrap_or_default();

            let mut fractions = IndexMap::new();
            let mut valid = true;
            for (position, year) in &year_columns {
                let value = cell(*position);
                if value.is_empty() {
                    continue;
                }
                match value.parse::<f64>() {
                    Ok(fraction) if (0. ..=1.).contains(&fraction) => {
                        fractions.insert(*year, fraction);
                    }
                    _ => {
                        self.violation(
                            file,
                            Some(row),
                            format!("fraction '{value}' for {year} is not within [0, 1]"),
                        );
                        valid = false;
                    }
                }
            }

            let [category, code, heating_system, new_heating_system] = key_columns.map(cell);
            let Some(scope) = self.scope(file, row, category, Some(code), None, codes) else {
                continue;
            };
            if valid {
                scoped.push(scope.row(
                    row,
                    SystemSwitch {
                        heating_system: HeatingSystem::new(heating_system),
                        new_heating_system: HeatingSystem::new(new_heating_system),
                    },
                    SwitchFractions(fractions),
                ));
            }
        }

        debug!(file, rows = scoped.len(), "Loaded input table");
        scoped
    }

    fn check_known_systems(
        &mut self,
        efficiencies: &HeatingSystemEfficiencies,
        initial_shares: &[ScopedRow<HeatingSystem, f64>],
        forecast: &[ScopedRow<SystemSwitch, SwitchFractions>],
    ) {
        let referenced = initial_shares
            .iter()
            .map(|row| (HEATING_SYSTEM_INITIAL_SHARES, row.row, &row.extra))
            .chain(forecast.iter().flat_map(|row| {
                [
                    (HEATING_SYSTEM_FORECAST, row.row, &row.extra.heating_system),
                    (HEATING_SYSTEM_FORECAST, row.row, &row.extra.new_heating_system),
                ]
            }));
        let unknown: Vec<_> = referenced
            .filter(|(_, _, system)| efficiencies.get(system).is_none())
            .map(|(file, row, system)| (file, row, system.clone()))
            .collect();
        for (file, row, system) in unknown {
            self.violation(
                file,
                Some(row),
                format!("heating system '{system}' has no row in {HEATING_SYSTEM_EFFICIENCIES}"),
            );
        }
    }
}

fn parse_product(token: &str, problems: &mut Vec<String>) -> Option<EnergyProduct> {
    match token.trim().parse::<EnergyProduct>() {
        Ok(product) => Some(product),
        Err(_) => {
            problems.push(format!("unknown energy product '{token}'"));
            None
        }
    }
}

/// A peak or tertiary load, absent when its share is empty or zero.
fn optional_load(
    name: &str,
    share: Option<f64>,
    efficiency: Option<f64>,
    energy_product: Option<&str>,
    problems: &mut Vec<String>,
) -> Option<LoadSpec> {
    let share = share.filter(|share| *share > 0.)?;
    let (Some(efficiency), Some(energy_product)) = (efficiency, energy_product) else {
        problems.push(format!(
            "{name} load has a share but no efficiency or energy product"
        ));
        return None;
    };
    Some(LoadSpec {
        share,
        efficiency,
        energy_product: parse_product(energy_product, problems)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{copy_demo_input, DEMO_INPUT_DIR};
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::fs;

    #[fixture]
    fn model_years() -> YearRange {
        YearRange::new(2020, 2030).unwrap()
    }

    fn violations(result: Result<InputTables, EbmError>) -> Vec<SchemaViolation> {
        match result {
            Err(EbmError::SchemaViolations(violations)) => violations,
            other => panic!("expected schema violations, got {other:?}"),
        }
    }

    #[rstest]
    fn should_successfully_parse_demo_input(model_years: YearRange) {
        let tables = InputTables::load(Path::new(DEMO_INPUT_DIR), model_years);
        assert!(tables.is_ok(), "error was {:?}", tables.as_ref().err());
        let tables = tables.unwrap();

        assert_eq!(tables.building_codes.len(), 7);
        assert_eq!(tables.s_curves.len(), 13);
        assert_eq!(tables.heating_system_efficiencies.len(), 6);
        assert_eq!(tables.holiday_home_energy.len(), 3);
        assert_eq!(
            tables.start_areas[&BuildingCategory::House][&BuildingCode::new("TEK69")],
            60_000_000.
        );
        assert_eq!(
            tables.construction_drivers.area_per_person[&BuildingCategory::Office],
            4.1
        );
    }

    #[rstest]
    fn should_apply_default_floor_areas_for_new_dwellings(model_years: YearRange) {
        let tables = InputTables::load(Path::new(DEMO_INPUT_DIR), model_years).unwrap();
        let row = &tables.construction_drivers.new_buildings_residential[&2025];
        assert_eq!(row.floor_area_for(BuildingCategory::House), 175.);
        assert_eq!(row.floor_area_for(BuildingCategory::ApartmentBlock), 75.);
        assert_eq!(row.floor_area_for(BuildingCategory::Office), 0.);
    }

    #[rstest]
    fn should_resolve_s_curves_per_category(model_years: YearRange) {
        let tables = InputTables::load(Path::new(DEMO_INPUT_DIR), model_years).unwrap();
        let office = &tables.s_curves[&BuildingCategory::Office];
        let house = &tables.s_curves[&BuildingCategory::House];
        // non_residential overrides the renovation curve only
        assert_ne!(office.renovation, house.renovation);
        assert_eq!(office.demolition, house.demolition);
    }

    #[rstest]
    fn should_read_forecast_year_columns(model_years: YearRange) {
        let tables = InputTables::load(Path::new(DEMO_INPUT_DIR), model_years).unwrap();
        let key = ScopeKey {
            category: BuildingCategory::House,
            code: BuildingCode::new("TEK97"),
            purpose: None,
            extra: SystemSwitch {
                heating_system: HeatingSystem::new("Electricity"),
                new_heating_system: HeatingSystem::new("HP - Electricity"),
            },
        };
        let fractions = tables.heating_system_forecast.get(&key).unwrap();
        assert_eq!(fractions.in_year(2021), 0.02);
        assert_eq!(fractions.in_year(2025), 0.03);
        assert_eq!(fractions.in_year(2026), 0.);

        let office = ScopeKey {
            category: BuildingCategory::Office,
            ..key
        };
        assert!(tables.heating_system_forecast.get(&office).is_none());
    }

    #[rstest]
    fn should_list_every_missing_required_file(model_years: YearRange) {
        let input = copy_demo_input();
        fs::remove_file(input.path().join(AREA)).unwrap();
        fs::remove_file(input.path().join(HEATING_SYSTEM_EFFICIENCIES)).unwrap();
        // optional tables may be absent
        fs::remove_file(input.path().join(HOLIDAY_HOME_ENERGY_CONSUMPTION)).unwrap();

        match InputTables::load(input.path(), model_years) {
            Err(EbmError::MissingInput { files }) => {
                assert_eq!(files, vec![AREA, HEATING_SYSTEM_EFFICIENCIES])
            }
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[rstest]
    fn should_load_without_optional_tables(model_years: YearRange) {
        let input = copy_demo_input();
        for file in [
            AREA_PER_PERSON,
            ENERGY_NEED_BEHAVIOUR_FACTOR,
            ENERGY_NEED_IMPROVEMENTS,
            CALIBRATE_HEATING_RV,
            HEATING_SYSTEM_FORECAST,
            HOLIDAY_HOME_ENERGY_CONSUMPTION,
        ] {
            fs::remove_file(input.path().join(file)).unwrap();
        }

        let tables = InputTables::load(input.path(), model_years).unwrap();
        assert!(tables.heating_system_forecast.is_empty());
        assert!(tables.energy_need.behaviour_factor.is_empty());
        assert!(tables.holiday_home_energy.is_empty());
    }

    #[rstest]
    fn should_collect_violations_across_tables(model_years: YearRange) {
        let input = copy_demo_input();
        fs::write(
            input.path().join(AREA),
            "building_category,building_code,area\nhouse,TEK69,-5\nchurch,TEK69,10\nresidential,TEK97,10\n",
        )
        .unwrap();
        fs::write(
            input.path().join(BUILDING_CODE_PARAMETERS),
            "building_code,birth_year,period_start_year,period_end_year\n\
             TEK69,1977,1969,1986\nTEK97,1998,1987,2006\nTEK10,2012,2007,2016\n\
             TEK17,2020,2017,2024\nTEK21,2026,2025,2050\nPRE_TEK49,1930,1920,1939\nTEK49,1962,1968,1949\n",
        )
        .unwrap();

        let violations = violations(InputTables::load(input.path(), model_years));
        let in_area: Vec<Option<usize>> = violations
            .iter()
            .filter(|violation| violation.file == AREA)
            .map(|violation| violation.row)
            .collect();
        assert_eq!(in_area, vec![Some(1), Some(2), Some(3)]);

        let in_codes: Vec<Option<usize>> = violations
            .iter()
            .filter(|violation| violation.file == BUILDING_CODE_PARAMETERS)
            .map(|violation| violation.row)
            .collect();
        assert_eq!(in_codes, vec![Some(6), Some(7)]);
    }

    #[rstest]
    fn should_reject_overlapping_code_periods(model_years: YearRange) {
        let input = copy_demo_input();
        fs::write(
            input.path().join(BUILDING_CODE_PARAMETERS),
            "building_code,birth_year,period_start_year,period_end_year\n\
             PRE_TEK49,1945,1940,1948\nTEK49,1962,1949,1968\nTEK69,1977,1969,1986\n\
             TEK97,1998,1987,2006\nTEK10,2012,2007,2016\nTEK17,2020,2017,2026\n\
             TEK21,2026,2025,2050\n",
        )
        .unwrap();

        let violations = violations(InputTables::load(input.path(), model_years));
        assert_eq!(
            violations,
            vec![SchemaViolation::new(
                BUILDING_CODE_PARAMETERS,
                Some(7),
                "period of TEK21 (2025..2050) overlaps TEK17 (2017..2026)"
            )]
        );
    }

    #[rstest]
    fn should_require_population_for_every_model_year() {
        let violations = violations(InputTables::load(
            Path::new(DEMO_INPUT_DIR),
            YearRange::new(2020, 2032).unwrap(),
        ));
        assert_eq!(
            violations,
            vec![
                SchemaViolation::new(POPULATION_FORECAST, None, "no row for year 2031"),
                SchemaViolation::new(NEW_BUILDINGS_RESIDENTIAL, None, "no row for year 2031"),
                SchemaViolation::new(POPULATION_FORECAST, None, "no row for year 2032"),
                SchemaViolation::new(NEW_BUILDINGS_RESIDENTIAL, None, "no row for year 2032"),
            ]
        );
    }

    #[rstest]
    fn should_reject_heating_systems_without_efficiency(model_years: YearRange) {
        let input = copy_demo_input();
        let shares = fs::read_to_string(input.path().join(HEATING_SYSTEM_INITIAL_SHARES)).unwrap();
        fs::write(
            input.path().join(HEATING_SYSTEM_INITIAL_SHARES),
            format!("{shares}house,TEK97,Gas boiler,2020,0.0\n"),
        )
        .unwrap();

        let violations = violations(InputTables::load(input.path(), model_years));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].file, HEATING_SYSTEM_INITIAL_SHARES);
        assert_eq!(violations[0].row, Some(7));
    }

    #[rstest]
    fn should_reject_load_shares_not_summing_to_one(model_years: YearRange) {
        let input = copy_demo_input();
        fs::write(
            input.path().join(HEATING_SYSTEM_EFFICIENCIES),
            "heating_system,base_load_share,base_load_efficiency,base_load_energy_product,\
             peak_load_share,peak_load_efficiency,peak_load_energy_product,dhw_efficiency,dhw_energy_product\n\
             Electricity,1,1,Electricity,,,,0.98,Electricity\n\
             HP - Electricity,0.85,2.5,Electricity,0.1,1,Electricity,0.98,Electricity\n\
             HP - Bio - Electricity,0.62,2.5,Electricity,0.38,0.65,Bio,0.98,Electricity\n\
             DH,1,0.95,District heating,,,,0.95,Steam\n\
             DH - Bio,0.95,0.95,District heating,0.05,0.65,Bio,0.95,District heating\n\
             Electricity - Bio,0.7,1,Electricity,0.3,0.65,Bio,0.98,Electricity\n",
        )
        .unwrap();

        let violations = violations(InputTables::load(input.path(), model_years));
        let rows: Vec<Option<usize>> = violations
            .iter()
            .filter(|violation| violation.file == HEATING_SYSTEM_EFFICIENCIES)
            .map(|violation| violation.row)
            .collect();
        assert_eq!(rows, vec![Some(2), Some(4)]);
    }

    #[rstest]
    fn should_report_ambiguous_rows(model_years: YearRange) {
        let input = copy_demo_input();
        let need = fs::read_to_string(input.path().join(ENERGY_NEED_ORIGINAL_CONDITION)).unwrap();
        fs::write(
            input.path().join(ENERGY_NEED_ORIGINAL_CONDITION),
            format!("{need}house,TEK10,heating_rv,75\n"),
        )
        .unwrap();

        match InputTables::load(input.path(), model_years) {
            Err(EbmError::AmbiguousData(error)) => {
                assert_eq!(error.table, "energy_need_original_condition");
                assert_eq!(error.rows, vec![7, 8]);
            }
            other => panic!("expected ambiguous data, got {other:?}"),
        }
    }

    #[rstest]
    fn should_require_years_for_policy_improvements(model_years: YearRange) {
        let input = copy_demo_input();
        fs::write(
            input.path().join(ENERGY_NEED_IMPROVEMENTS),
            "building_category,building_code,purpose,function,start_year,end_year,value\n\
             default,default,lighting,improvement_at_end_year,2020,,0.5\n\
             default,default,lighting,yearly_efficiency_improvement,,,0.01\n",
        )
        .unwrap();

        let violations = violations(InputTables::load(input.path(), model_years));
        assert_eq!(
            violations,
            vec![SchemaViolation::new(
                ENERGY_NEED_IMPROVEMENTS,
                Some(1),
                "improvement_at_end_year needs both start_year and end_year"
            )]
        );
    }
}
