pub mod efficiencies;
pub mod projection;

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use strum_macros::{Display as StrumDisplay, EnumIter};

const LOAD_SEPARATOR: &str = " - ";

/// A named combination of up to three loads, e.g. `HP Central heating - Electric boiler`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct HeatingSystem(Arc<str>);

impl HeatingSystem {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Load labels in base, peak, tertiary order.
    pub fn load_labels(&self) -> Vec<&str> {
        self.0.split(LOAD_SEPARATOR).map(str::trim).collect()
    }
}

impl Display for HeatingSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HeatingSystem {
    fn from(value: &str) -> Self {
        HeatingSystem::new(value)
    }
}

#[derive(
    Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, StrumDisplay,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatingLoad {
    Base,
    Peak,
    Tertiary,
    /// Domestic hot water, served by its own efficiency and carrier.
    Dhw,
    /// Electricity for cooling and non-thermal purposes.
    Direct,
}
