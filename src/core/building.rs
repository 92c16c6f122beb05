use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use strum::IntoEnumIterator;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/// The building categories of the national stock.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BuildingCategory {
    House,
    ApartmentBlock,
    Kindergarten,
    School,
    University,
    Office,
    Retail,
    Hotel,
    Hospital,
    NursingHome,
    Culture,
    Sports,
    StorageRepairs,
}

impl BuildingCategory {
    pub fn is_residential(&self) -> bool {
        matches!(self, BuildingCategory::House | BuildingCategory::ApartmentBlock)
    }

    pub fn building_group(&self) -> BuildingGroup {
        if self.is_residential() {
            BuildingGroup::Residential
        } else {
            BuildingGroup::NonResidential
        }
    }

    pub fn residential() -> Vec<Self> {
        Self::iter().filter(|c| c.is_residential()).collect()
    }

    pub fn non_residential() -> Vec<Self> {
        Self::iter().filter(|c| !c.is_residential()).collect()
    }
}

/// Aggregation groups used when reporting energy use per carrier.
#[derive(
    Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingGroup {
    Residential,
    NonResidential,
    HolidayHome,
}

/// Renovation state of a slice of floor area.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BuildingCondition {
    OriginalCondition,
    SmallMeasure,
    Renovation,
    RenovationAndSmallMeasure,
    Demolition,
}

impl BuildingCondition {
    /// The four conditions partitioning surviving area.
    pub fn existing() -> [Self; 4] {
        [
            BuildingCondition::OriginalCondition,
            BuildingCondition::SmallMeasure,
            BuildingCondition::Renovation,
            BuildingCondition::RenovationAndSmallMeasure,
        ]
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EnergyPurpose {
    HeatingRv,
    HeatingDhw,
    FansAndPumps,
    Lighting,
    ElectricalEquipment,
    Cooling,
}

/// A construction-era code (e.g. `TEK17`), used as a cohort label for the stock built under it.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct BuildingCode(Arc<str>);

impl BuildingCode {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BuildingCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BuildingCode {
    fn from(value: &str) -> Self {
        BuildingCode::new(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingCodeParameters {
    pub birth_year: u32,
    pub period_start_year: u32,
    pub period_end_year: u32,
}

impl BuildingCodeParameters {
    /// Codes whose period ended before the model starts receive no new construction.
    pub fn is_pre_construction(&self, model_start: u32) -> bool {
        self.period_end_year < model_start
    }

    /// Whether the code holds any stock in `year`. Codes introduced within the model
    /// period hold none before their period starts.
    pub fn is_active_in(&self, year: u32, model_start: u32) -> bool {
        self.period_start_year <= model_start || year >= self.period_start_year
    }
}

/// All building codes known to a run, ordered by birth year.
#[derive(Clone, Debug, Default)]
pub struct BuildingCodes(IndexMap<BuildingCode, BuildingCodeParameters>);

impl BuildingCodes {
    pub fn new(codes: impl IntoIterator<Item = (BuildingCode, BuildingCodeParameters)>) -> Self {
        let mut codes: IndexMap<_, _> = codes.into_iter().collect();
        codes.sort_by(|code_a, params_a, code_b, params_b| {
            params_a
                .birth_year
                .cmp(&params_b.birth_year)
                .then_with(|| code_a.cmp(code_b))
        });
        Self(codes)
    }

    pub fn get(&self, code: &BuildingCode) -> Option<&BuildingCodeParameters> {
        self.0.get(code)
    }

    pub fn find(&self, name: &str) -> Option<&BuildingCode> {
        self.0
            .keys()
            .find(|code| code.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &BuildingCode> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BuildingCode, &BuildingCodeParameters)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse an enum-valued key cell, ignoring surrounding whitespace.
pub(crate) fn parse_token<T: FromStr>(token: &str) -> Option<T> {
    token.trim().parse().ok()
}
