use crate::core::heating_systems::efficiencies::EnergyProduct;
use crate::input::HolidayHomeRow;
use crate::model_period::YearRange;
use indexmap::IndexMap;

/// Number of trailing observed years averaged into the projection.
const TRAILING_YEARS: usize = 3;

/// Holiday-home energy use (GWh) per carrier and year.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HolidayHomeEnergy {
    values: IndexMap<(EnergyProduct, u32), f64>,
}

impl HolidayHomeEnergy {
    /// Report observed years as they are, hold the first observation for earlier years and
    /// the mean of the last three observations for later years.
    pub fn extrapolate(observed: &[HolidayHomeRow], model_years: YearRange) -> Self {
        let mut observed: Vec<&HolidayHomeRow> = observed.iter().collect();
        observed.sort_by_key(|row| row.year);
        if observed.is_empty() {
            return Self::default();
        }

        let carriers: [(EnergyProduct, fn(&HolidayHomeRow) -> f64); 3] = [
            (EnergyProduct::Electricity, |row| row.electricity),
            (EnergyProduct::Bio, |row| row.fuelwood),
            (EnergyProduct::Fossil, |row| row.fossil),
        ];

        let mut values = IndexMap::new();
        for (energy_product, column) in carriers {
            let trailing = &observed[observed.len().saturating_sub(TRAILING_YEARS)..];
            let trailing_mean =
                trailing.iter().map(|row| column(row)).sum::<f64>() / trailing.len() as f64;
            let first = column(observed[0]);
            let last_year = observed[observed.len() - 1].year;

            for year in model_years.iter() {
                let gwh = if year > last_year {
                    trailing_mean
                } else {
                    // observed, or the closest earlier observation
                    observed
                        .iter()
                        .rev()
                        .find(|row| row.year <= year)
                        .map_or(first, |row| column(row))
                };
                values.insert((energy_product, year), gwh);
            }
        }

        Self { values }
    }

    pub fn from_values(values: impl IntoIterator<Item = ((EnergyProduct, u32), f64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn gwh(&self, energy_product: EnergyProduct, year: u32) -> f64 {
        self.values
            .get(&(energy_product, year))
            .copied()
            .unwrap_or(0.)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(EnergyProduct, u32), &f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
