use crate::compare_floats::closes_at;
use crate::core::building::{BuildingCategory, BuildingCode};
use crate::core::column_operations::{Keyspace, ResolvedTable};
use crate::core::heating_systems::HeatingSystem;
use crate::core::units::SHARE_CLOSURE_DECIMALS;
use crate::errors::EbmError;
use crate::model_period::YearRange;
use indexmap::{IndexMap, IndexSet};

/// A switch from one heating system to another, the extra key of a forecast row.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SystemSwitch {
    pub heating_system: HeatingSystem,
    pub new_heating_system: HeatingSystem,
}

/// Fraction of the start-year share switched in each year.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwitchFractions(pub IndexMap<u32, f64>);

impl SwitchFractions {
    pub fn in_year(&self, year: u32) -> f64 {
        self.0.get(&year).copied().unwrap_or(0.)
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HeatingSystemShareKey {
    pub category: BuildingCategory,
    pub code: BuildingCode,
    pub heating_system: HeatingSystem,
    pub year: u32,
}

type Shares = IndexMap<HeatingSystem, f64>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeatingSystemProjection {
    shares: IndexMap<(BuildingCategory, BuildingCode, u32), Shares>,
}

impl HeatingSystemProjection {
    /// Project start-year shares over the model period.
    ///
    /// Every (category, code) holds every known system, with zero where a system is absent
    /// in the start year. In each later year a switch moves `start share * fraction` from
    /// its source system to its target system.
    pub fn project(
        initial_shares: &ResolvedTable<HeatingSystem, f64>,
        forecast: &ResolvedTable<SystemSwitch, SwitchFractions>,
        known_systems: &[HeatingSystem],
        keyspace: &Keyspace,
        model_years: YearRange,
    ) -> Result<Self, EbmError> {
        let mut systems: IndexSet<HeatingSystem> = known_systems.iter().cloned().collect();
        systems.extend(initial_shares.iter().map(|(key, _)| key.extra.clone()));
        systems.extend(forecast.iter().flat_map(|(key, _)| {
            [
                key.extra.heating_system.clone(),
                key.extra.new_heating_system.clone(),
            ]
        }));
        systems.sort();

        let mut starting: IndexMap<(BuildingCategory, BuildingCode), Shares> = IndexMap::new();
        for (key, share) in initial_shares.iter() {
            starting
                .entry((key.category, key.code.clone()))
                .or_default()
                .insert(key.extra.clone(), *share);
        }

        let mut switches: IndexMap<_, Vec<(&SystemSwitch, &SwitchFractions)>> = IndexMap::new();
        for (key, fractions) in forecast.iter() {
            switches
                .entry((key.category, key.code.clone()))
                .or_default()
                .push((&key.extra, fractions));
        }

        let mut shares = IndexMap::new();
        let mut unclosed = vec![];

        for category in &keyspace.categories {
            for code in &keyspace.codes {
                let pair = (*category, code.clone());
                let start: Shares = systems
                    .iter()
                    .map(|system| {
                        let share = starting
                            .get(&pair)
                            .and_then(|shares| shares.get(system))
                            .copied()
                            .unwrap_or(0.);
                        (system.clone(), share)
                    })
                    .collect();
                let pair_switches = switches.get(&pair).map(Vec::as_slice).unwrap_or(&[]);

                let mut current = start.clone();
                for year in model_years.iter() {
                    if year > model_years.start() {
                        for (switch, fractions) in pair_switches {
                            let moved = start.get(&switch.heating_system).copied().unwrap_or(0.)
                                * fractions.in_year(year);
                            *current.entry(switch.heating_system.clone()).or_default() -= moved;
                            *current.entry(switch.new_heating_system.clone()).or_default() += moved;
                        }
                    }

                    if let Some((system, share)) = current
                        .iter()
                        .find(|(_, share)| !share.is_finite() || **share < -1e-12)
                    {
                        return Err(EbmError::numeric_domain(
                            format!("share of {system} for {category}/{code} in {year}"),
                            *share,
                        ));
                    }
                    if !closes_at(current.values().copied(), 1., SHARE_CLOSURE_DECIMALS) {
                        unclosed.push(format!(
                            "{category}/{code}/{year}: {:.6}",
                            current.values().sum::<f64>()
                        ));
                    }

                    shares.insert((*category, code.clone(), year), current.clone());
                }
            }
        }

        if !unclosed.is_empty() {
            return Err(EbmError::InvariantBreach {
                description: "heating-system shares do not sum to 1".to_string(),
                offending: unclosed,
            });
        }

        Ok(Self { shares })
    }

    /// Share per heating system of one (category, code) in `year`.
    pub fn shares(
        &self,
        category: BuildingCategory,
        code: &BuildingCode,
        year: u32,
    ) -> impl Iterator<Item = (&HeatingSystem, f64)> {
        self.shares
            .get(&(category, code.clone(), year))
            .into_iter()
            .flat_map(|shares| shares.iter().map(|(system, share)| (system, *share)))
    }

    pub fn share(&self, key: &HeatingSystemShareKey) -> f64 {
        self.shares
            .get(&(key.category, key.code.clone(), key.year))
            .and_then(|shares| shares.get(&key.heating_system))
            .copied()
            .unwrap_or(0.)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeatingSystemShareKey, f64)> + '_ {
        self.shares.iter().flat_map(|((category, code, year), shares)| {
            shares.iter().map(move |(heating_system, share)| {
                (
                    HeatingSystemShareKey {
                        category: *category,
                        code: code.clone(),
                        heating_system: heating_system.clone(),
                        year: *year,
                    },
                    *share,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.shares.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}
