//! Parameters of the hierarchy levels.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::processing_unit::ProcessingUnitConfig;
use crate::random::GaussianParams;

/// Level of the client → district → city → territory → country → continent → central hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    District,
    City,
    Territory,
    Country,
    Continent,
    Central,
}

impl Tier {
    /// All tiers from the closest to clients to the most remote one.
    pub const ALL: [Tier; 6] = [
        Tier::District,
        Tier::City,
        Tier::Territory,
        Tier::Country,
        Tier::Continent,
        Tier::Central,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::District => "district",
            Tier::City => "city",
            Tier::Territory => "territory",
            Tier::Country => "country",
            Tier::Continent => "continent",
            Tier::Central => "central",
        }
    }

    /// Default number of units of this tier.
    pub fn default_count(&self) -> u32 {
        match self {
            Tier::District => 1000,
            Tier::City => 400,
            Tier::Territory => 200,
            Tier::Country => 80,
            Tier::Continent => 7,
            Tier::Central => 1,
        }
    }

    /// Cores, per-core bandwidth and processing start delay of a unit of this tier.
    pub fn processing(&self) -> ProcessingUnitConfig {
        match self {
            Tier::District | Tier::City => ProcessingUnitConfig {
                cores: 2,
                bandwidth_mb_per_ms: 0.010,
                start_delay: GaussianParams::new(5., 2.),
            },
            Tier::Territory | Tier::Country => ProcessingUnitConfig {
                cores: 4,
                bandwidth_mb_per_ms: 0.015,
                start_delay: GaussianParams::new(4., 1.),
            },
            Tier::Continent | Tier::Central => ProcessingUnitConfig {
                cores: 1000,
                bandwidth_mb_per_ms: 0.020,
                start_delay: GaussianParams::new(4., 1.),
            },
        }
    }

    /// Distance in km between a client and a unit of this tier.
    pub fn client_distance(&self) -> GaussianParams {
        match self {
            Tier::District => GaussianParams::new(20., 8.),
            Tier::City => GaussianParams::new(60., 15.),
            Tier::Territory => GaussianParams::new(300., 100.),
            Tier::Country => GaussianParams::new(700., 300.),
            Tier::Continent => GaussianParams::new(1500., 500.),
            Tier::Central => GaussianParams::new(5000., 2000.),
        }
    }

    /// Distance in km between a district and a unit of this tier, `None` for the district tier itself.
    pub fn district_distance(&self) -> Option<GaussianParams> {
        match self {
            Tier::District => None,
            Tier::City => Some(GaussianParams::new(50., 15.)),
            Tier::Territory => Some(GaussianParams::new(290., 100.)),
            Tier::Country => Some(GaussianParams::new(690., 200.)),
            Tier::Continent => Some(GaussianParams::new(1490., 500.)),
            Tier::Central => Some(GaussianParams::new(4990., 2000.)),
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
