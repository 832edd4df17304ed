use serde::{Deserialize, Serialize};

/// Number of benefit factors. Every curve set and benefit vector is
/// index-aligned to [`Factor::ALL`].
pub const FACTOR_COUNT: usize = 15;

/// One named category of ecological/economic benefit.
///
/// The order of [`Factor::ALL`] is fixed: curve files are loaded into a
/// per-region array indexed by it, and benefit vectors use the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    NaturalGas,
    Electricity,
    HydroInterception,
    Co2Sequestered,
    Co2Avoided,
    Co2Storage,
    AqNoxDep,
    AqOzoneDep,
    AqNoxAvoided,
    AqPm10Dep,
    AqPm10Avoided,
    AqSoxDep,
    AqSoxAvoided,
    AqVocAvoided,
    Bvoc,
}

impl Factor {
    /// All factors, in curve-file index order.
    pub const ALL: [Factor; FACTOR_COUNT] = [
        Factor::NaturalGas,
        Factor::Electricity,
        Factor::HydroInterception,
        Factor::Co2Sequestered,
        Factor::Co2Avoided,
        Factor::Co2Storage,
        Factor::AqNoxDep,
        Factor::AqOzoneDep,
        Factor::AqNoxAvoided,
        Factor::AqPm10Dep,
        Factor::AqPm10Avoided,
        Factor::AqSoxDep,
        Factor::AqSoxAvoided,
        Factor::AqVocAvoided,
        Factor::Bvoc,
    ];

    /// The name used in curve file names and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Factor::NaturalGas => "natural_gas",
            Factor::Electricity => "electricity",
            Factor::HydroInterception => "hydro_interception",
            Factor::Co2Sequestered => "co2_sequestered",
            Factor::Co2Avoided => "co2_avoided",
            Factor::Co2Storage => "co2_storage",
            Factor::AqNoxDep => "aq_nox_dep",
            Factor::AqOzoneDep => "aq_ozone_dep",
            Factor::AqNoxAvoided => "aq_nox_avoided",
            Factor::AqPm10Dep => "aq_pm10_dep",
            Factor::AqPm10Avoided => "aq_pm10_avoided",
            Factor::AqSoxDep => "aq_sox_dep",
            Factor::AqSoxAvoided => "aq_sox_avoided",
            Factor::AqVocAvoided => "aq_voc_avoided",
            Factor::Bvoc => "bvoc",
        }
    }

    /// Parse a factor from its file/JSON name.
    pub fn from_name(name: &str) -> Option<Factor> {
        Factor::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Position of this factor within [`Factor::ALL`].
    pub fn index(&self) -> usize {
        Factor::ALL
            .iter()
            .position(|f| f == self)
            .expect("factor present in ALL")
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Factor {
    type Err = crate::error::EcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::from_name(s).ok_or_else(|| {
            crate::error::EcoError::Validation(format!("Unknown benefit factor: '{s}'"))
        })
    }
}
