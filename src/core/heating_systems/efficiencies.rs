use crate::core::building::EnergyPurpose;
use crate::core::heating_systems::{HeatingLoad, HeatingSystem};
use indexmap::IndexMap;
use serde::Serialize;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};

/// Delivered energy carrier.
#[derive(
    Clone,
    Copy,
    Debug,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum EnergyProduct {
    #[strum(to_string = "electricity", serialize = "el", serialize = "elektrisitet")]
    Electricity,
    #[strum(to_string = "bio", serialize = "bioenergy", serialize = "bioenergi")]
    Bio,
    #[strum(
        to_string = "district_heating",
        serialize = "district heating",
        serialize = "districtheating",
        serialize = "fjernvarme"
    )]
    DistrictHeating,
    #[strum(to_string = "fossil", serialize = "fossil fuel", serialize = "fossilt")]
    Fossil,
    #[strum(to_string = "solar", serialize = "solar energy", serialize = "solenergi")]
    Solar,
}

/// Share of the room-heating need covered by one load, with its efficiency and carrier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadSpec {
    pub share: f64,
    pub efficiency: f64,
    pub energy_product: EnergyProduct,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeatingSystemEfficiency {
    pub heating_system: HeatingSystem,
    pub base: LoadSpec,
    pub peak: Option<LoadSpec>,
    pub tertiary: Option<LoadSpec>,
    pub dhw_efficiency: f64,
    pub dhw_energy_product: EnergyProduct,
    pub specific_electricity_efficiency: f64,
    pub cooling_efficiency: f64,
}

impl HeatingSystemEfficiency {
    /// The loads through which a purpose's energy need is delivered.
    pub fn loads_for(&self, purpose: EnergyPurpose) -> Vec<(HeatingLoad, LoadSpec)> {
        match purpose {
            EnergyPurpose::HeatingRv => [
                Some((HeatingLoad::Base, self.base)),
                self.peak.map(|spec| (HeatingLoad::Peak, spec)),
                self.tertiary.map(|spec| (HeatingLoad::Tertiary, spec)),
            ]
            .into_iter()
            .flatten()
            .filter(|(_, spec)| spec.share > 0.)
            .collect(),
            EnergyPurpose::HeatingDhw => vec![(
                HeatingLoad::Dhw,
                LoadSpec {
                    share: 1.,
                    efficiency: self.dhw_efficiency,
                    energy_product: self.dhw_energy_product,
                },
            )],
            EnergyPurpose::Cooling => vec![(
                HeatingLoad::Direct,
                LoadSpec {
                    share: 1.,
                    efficiency: self.cooling_efficiency,
                    energy_product: EnergyProduct::Electricity,
                },
            )],
            EnergyPurpose::FansAndPumps
            | EnergyPurpose::Lighting
            | EnergyPurpose::ElectricalEquipment => vec![(
                HeatingLoad::Direct,
                LoadSpec {
                    share: 1.,
                    efficiency: self.specific_electricity_efficiency,
                    energy_product: EnergyProduct::Electricity,
                },
            )],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeatingSystemEfficiencies(IndexMap<HeatingSystem, HeatingSystemEfficiency>);

impl HeatingSystemEfficiencies {
    pub fn new(efficiencies: impl IntoIterator<Item = HeatingSystemEfficiency>) -> Self {
        Self(
            efficiencies
                .into_iter()
                .map(|efficiency| (efficiency.heating_system.clone(), efficiency))
                .collect(),
        )
    }

    pub fn get(&self, heating_system: &HeatingSystem) -> Option<&HeatingSystemEfficiency> {
        self.0.get(heating_system)
    }

    pub fn heating_systems(&self) -> impl Iterator<Item = &HeatingSystem> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    pub fn hp_bio_electricity() -> HeatingSystemEfficiency {
        HeatingSystemEfficiency {
            heating_system: HeatingSystem::new("HP - Bio - Electricity"),
            base: LoadSpec {
                share: 0.62,
                efficiency: 2.5,
                energy_product: EnergyProduct::Electricity,
            },
            peak: Some(LoadSpec {
                share: 0.28,
                efficiency: 0.65,
                energy_product: EnergyProduct::Bio,
            }),
            tertiary: Some(LoadSpec {
                share: 0.10,
                efficiency: 0.99,
                energy_product: EnergyProduct::Electricity,
            }),
            dhw_efficiency: 0.98,
            dhw_energy_product: EnergyProduct::Electricity,
            specific_electricity_efficiency: 1.,
            cooling_efficiency: 4.,
        }
    }

    #[rstest]
    #[case("Electricity", EnergyProduct::Electricity)]
    #[case("bio", EnergyProduct::Bio)]
    #[case("District heating", EnergyProduct::DistrictHeating)]
    #[case("Fjernvarme", EnergyProduct::DistrictHeating)]
    #[case("FOSSIL", EnergyProduct::Fossil)]
    fn should_parse_energy_products(#[case] token: &str, #[case] expected: EnergyProduct) {
        assert_eq!(token.parse::<EnergyProduct>(), Ok(expected));
    }

    #[rstest]
    fn should_split_room_heating_into_three_loads(hp_bio_electricity: HeatingSystemEfficiency) {
        let loads: Vec<HeatingLoad> = hp_bio_electricity
            .loads_for(EnergyPurpose::HeatingRv)
            .into_iter()
            .map(|(load, _)| load)
            .collect();
        assert_eq!(
            loads,
            vec![HeatingLoad::Base, HeatingLoad::Peak, HeatingLoad::Tertiary]
        );
    }

    #[rstest]
    fn should_serve_other_purposes_through_one_load(hp_bio_electricity: HeatingSystemEfficiency) {
        assert_eq!(
            hp_bio_electricity.loads_for(EnergyPurpose::HeatingDhw),
            vec![(
                HeatingLoad::Dhw,
                LoadSpec {
                    share: 1.,
                    efficiency: 0.98,
                    energy_product: EnergyProduct::Electricity
                }
            )]
        );
        assert_eq!(
            hp_bio_electricity.loads_for(EnergyPurpose::Cooling)[0].1.efficiency,
            4.
        );
        assert_eq!(
            hp_bio_electricity.loads_for(EnergyPurpose::Lighting)[0].1,
            LoadSpec {
                share: 1.,
                efficiency: 1.,
                energy_product: EnergyProduct::Electricity
            }
        );
    }

    #[rstest]
    fn should_drop_loads_without_share(mut hp_bio_electricity: HeatingSystemEfficiency) {
        hp_bio_electricity.tertiary = Some(LoadSpec {
            share: 0.,
            efficiency: 1.,
            energy_product: EnergyProduct::Fossil,
        });
        assert_eq!(hp_bio_electricity.loads_for(EnergyPurpose::HeatingRv).len(), 2);
    }
}
