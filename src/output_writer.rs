use crate::core::units::kwh_to_gwh;
use crate::corpus::{RunResults, Step};
use crate::errors::EbmError;
use crate::model_period::YearRange;
use crate::output::Output;
use csv::WriterBuilder;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::info;

pub const AREA_REPORT: &str = "area";
pub const ENERGY_NEED_REPORT: &str = "energy_need";
pub const HEATING_SYSTEM_SHARES_REPORT: &str = "heating_system_shares";
pub const ENERGY_USE_REPORT: &str = "energy_use";
pub const ENERGY_USE_BY_CARRIER_REPORT: &str = "energy_use_by_carrier";

const UNIT_COLUMN: &str = "unit";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Layout {
    /// Pivoted by year, one column per year.
    #[default]
    Horizontal,
    /// One row per key and year.
    Vertical,
}

/// The reports written for a run stopping after `step`.
pub fn location_keys(step: Step) -> &'static [&'static str] {
    match step {
        Step::Area => &[AREA_REPORT],
        Step::EnergyNeed => &[ENERGY_NEED_REPORT],
        Step::HeatingSystems => &[HEATING_SYSTEM_SHARES_REPORT],
        Step::EnergyUse => &[ENERGY_USE_REPORT, ENERGY_USE_BY_CARRIER_REPORT],
    }
}

#[derive(Debug)]
struct Report {
    location_key: &'static str,
    key_columns: &'static [&'static str],
    unit: &'static str,
    values: BTreeMap<Vec<String>, BTreeMap<u32, f64>>,
}

impl Report {
    fn new(
        location_key: &'static str,
        key_columns: &'static [&'static str],
        unit: &'static str,
    ) -> Self {
        Self {
            location_key,
            key_columns,
            unit,
            values: BTreeMap::new(),
        }
    }

    fn add(&mut self, key: Vec<String>, year: u32, value: f64) {
        *self
            .values
            .entry(key)
            .or_default()
            .entry(year)
            .or_default() += value;
    }

    fn write(
        &self,
        writer: impl Write,
        layout: Layout,
        model_years: YearRange,
    ) -> anyhow::Result<()> {
        let mut writer = WriterBuilder::new().from_writer(writer);

        let mut headings: Vec<String> = self
            .key_columns
            .iter()
            .map(|column| column.to_string())
            .collect();
        headings.push(UNIT_COLUMN.to_string());
        match layout {
            Layout::Horizontal => {
                headings.extend(model_years.iter().map(|year| year.to_string()))
            }
            Layout::Vertical => headings.extend(["year".to_string(), "value".to_string()]),
        }
        writer.write_record(&headings)?;

        for (key, by_year) in &self.values {
            let value_in = |year: u32| by_year.get(&year).copied().unwrap_or(0.).to_string();
            match layout {
                Layout::Horizontal => {
                    let mut row = key.clone();
                    row.push(self.unit.to_string());
                    row.extend(model_years.iter().map(value_in));
                    writer.write_record(&row)?;
                }
                Layout::Vertical => {
                    for year in model_years.iter() {
                        let mut row = key.clone();
                        row.extend([self.unit.to_string(), year.to_string(), value_in(year)]);
                        writer.write_record(&row)?;
                    }
                }
            }
        }

        writer.flush()?;
        Ok(())
    }
}

fn area_report(results: &RunResults) -> Report {
    let mut report = Report::new(
        AREA_REPORT,
        &["building_category", "building_code", "building_condition"],
        "m2",
    );
    for (key, area) in results.area.iter() {
        report.add(
            vec![
                key.category.to_string(),
                key.code.to_string(),
                key.condition.to_string(),
            ],
            key.year,
            *area,
        );
    }
    report
}

fn energy_need_report(results: &RunResults) -> Option<Report> {
    let energy_need = results.energy_need.as_ref()?;
    let mut report = Report::new(
        ENERGY_NEED_REPORT,
        &[
            "building_category",
            "building_code",
            "purpose",
            "building_condition",
            "variable",
        ],
        "kWh/m2",
    );
    for (key, value) in energy_need.iter() {
        let scope = [
            key.category.to_string(),
            key.code.to_string(),
            key.purpose.to_string(),
            key.condition.to_string(),
        ];
        for (variable, kwh_m2) in [
            ("kwh_m2", value.kwh_m2),
            ("kwh_m2_uncalibrated", value.kwh_m2_uncalibrated),
        ] {
            let mut row_key = scope.to_vec();
            row_key.push(variable.to_string());
            report.add(row_key, key.year, kwh_m2);
        }
    }
    Some(report)
}

fn heating_system_shares_report(results: &RunResults) -> Option<Report> {
    let projection = results.heating_system_shares.as_ref()?;
    let mut report = Report::new(
        HEATING_SYSTEM_SHARES_REPORT,
        &["building_category", "building_code", "heating_system"],
        "share",
    );
    for (key, share) in projection.iter() {
        report.add(
            vec![
                key.category.to_string(),
                key.code.to_string(),
                key.heating_system.to_string(),
            ],
            key.year,
            share,
        );
    }
    Some(report)
}

fn energy_use_report(results: &RunResults) -> Option<Report> {
    let energy_use = results.energy_use.as_ref()?;
    let mut report = Report::new(
        ENERGY_USE_REPORT,
        &[
            "building_category",
            "building_code",
            "building_condition",
            "purpose",
            "heating_system",
            "load",
            "energy_product",
        ],
        "GWh",
    );
    for (key, kwh) in energy_use.iter() {
        report.add(
            vec![
                key.category.to_string(),
                key.code.to_string(),
                key.condition.to_string(),
                key.purpose.to_string(),
                key.heating_system.to_string(),
                key.load.to_string(),
                key.energy_product.to_string(),
            ],
            key.year,
            kwh_to_gwh(*kwh),
        );
    }
    Some(report)
}

fn energy_use_by_carrier_report(results: &RunResults) -> Option<Report> {
    let by_carrier = results.energy_use_by_carrier.as_ref()?;
    let mut report = Report::new(
        ENERGY_USE_BY_CARRIER_REPORT,
        &["energy_product", "building_group"],
        "GWh",
    );
    for (key, gwh) in by_carrier.iter() {
        report.add(
            vec![key.energy_product.to_string(), key.building_group.to_string()],
            key.year,
            *gwh,
        );
    }
    Some(report)
}

fn reports(results: &RunResults) -> Vec<Report> {
    match results.step {
        Step::Area => vec![area_report(results)],
        Step::EnergyNeed => energy_need_report(results).into_iter().collect(),
        Step::HeatingSystems => heating_system_shares_report(results).into_iter().collect(),
        Step::EnergyUse => [
            energy_use_report(results),
            energy_use_by_carrier_report(results),
        ]
        .into_iter()
        .flatten()
        .collect(),
    }
}

/// Write the reports of the last stage a run reached.
pub fn write_reports(
    output: &impl Output,
    results: &RunResults,
    layout: Layout,
) -> Result<(), EbmError> {
    if output.is_noop() {
        return Ok(());
    }

    for report in reports(results) {
        info!(
            report = report.location_key,
            rows = report.values.len(),
            "Writing report"
        );
        let writer = output.writer_for_location_key(report.location_key)?;
        report.write(writer, layout, results.model_years)?;
    }
    Ok(())
}
