//! Experiment configuration.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::processing_unit::ProcessingUnitConfig;
use crate::tier::Tier;

/// Number of clients when not set in a run.
pub const DEFAULT_CLIENTS: u32 = 2000;
/// Number of messages sent by each writing client when not set in a run.
pub const DEFAULT_PACKAGES_PER_CLIENT: u64 = 3;
/// Simulated duration of read experiments when not set in a run, ms.
pub const DEFAULT_READ_DURATION: f64 = 2. * 60. * 1000.;

/// Holds raw experiment config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawExperimentConfig {
    pub runs: Option<Vec<RawRunConfig>>,
}

/// Holds raw configuration of a single run.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawRunConfig {
    pub name: String,
    pub seed: Option<u64>,
    pub duration: Option<f64>,
    pub clients: Option<u32>,
    pub packages_per_client: Option<u64>,
    pub unit_counts: Option<BTreeMap<Tier, u32>>,
    pub bandwidth: Option<BTreeMap<Tier, f64>>,
    pub check_additivity: Option<bool>,
    pub topology: TopologyConfig,
}

/// Arrangement of processing units and clients.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopologyConfig {
    /// Producers send data directly to the central unit.
    Cloud,
    /// Producers send data to a random district, each district forwards processed data
    /// to one aggregator of `level` chosen at setup.
    EdgeAggregation { level: Tier },
    /// Producers send data to a random district, each district forwards processed data
    /// to the central unit and to one unit of every intermediate tier.
    AllLevels,
    /// Readers send requests to units of every tier, choosing the tier of each request with the given
    /// probabilities (district first, central last).
    ReadByProbabilities { probabilities: Vec<f64> },
    /// Only units of `level` are created, each reader sends all its requests to one of them chosen at setup.
    ReadByLevel { level: Tier },
}

impl TopologyConfig {
    /// Label of the run type used in summaries.
    pub fn simulation_type(&self) -> &'static str {
        match self {
            TopologyConfig::Cloud => "cloud",
            TopologyConfig::EdgeAggregation { .. } | TopologyConfig::AllLevels => "edge",
            TopologyConfig::ReadByProbabilities { .. } | TopologyConfig::ReadByLevel { .. } => "read",
        }
    }

    /// Whether the total latency equals the sum of stage latencies, i.e. there is no fan-out.
    pub fn is_additive(&self) -> bool {
        !matches!(self, TopologyConfig::AllLevels)
    }

    fn default_duration(&self) -> Option<f64> {
        match self {
            TopologyConfig::ReadByProbabilities { .. } | TopologyConfig::ReadByLevel { .. } => {
                Some(DEFAULT_READ_DURATION)
            }
            _ => None,
        }
    }

    fn default_packages_per_client(&self) -> Option<u64> {
        match self {
            TopologyConfig::ReadByProbabilities { .. } | TopologyConfig::ReadByLevel { .. } => None,
            _ => Some(DEFAULT_PACKAGES_PER_CLIENT),
        }
    }
}

/// Represents configuration of a single simulation run.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RunConfig {
    /// Run name.
    pub name: String,
    /// Seed of the run random number generator.
    pub seed: u64,
    /// Simulated duration in ms. The run lasts until all messages are processed if not set.
    pub duration: Option<f64>,
    /// Number of producing or reading clients.
    pub clients: u32,
    /// Messages sent by each client, unbounded if not set.
    pub packages_per_client: Option<u64>,
    /// Overrides of the default number of units per tier.
    pub unit_counts: BTreeMap<Tier, u32>,
    /// Overrides of the default core bandwidth per tier, MB/ms.
    pub bandwidth: BTreeMap<Tier, f64>,
    /// Whether the additivity of stage latencies is checked in the summary.
    pub check_additivity: bool,
    pub topology: TopologyConfig,
}

impl RunConfig {
    /// Creates a run with default parameters of the topology.
    pub fn new<S: Into<String>>(name: S, topology: TopologyConfig) -> Self {
        Self {
            name: name.into(),
            seed: 123,
            duration: topology.default_duration(),
            clients: DEFAULT_CLIENTS,
            packages_per_client: topology.default_packages_per_client(),
            unit_counts: BTreeMap::new(),
            bandwidth: BTreeMap::new(),
            check_additivity: topology.is_additive(),
            topology,
        }
    }

    /// Number of units of the tier in this run.
    pub fn unit_count(&self, tier: Tier) -> u32 {
        self.unit_counts.get(&tier).copied().unwrap_or_else(|| tier.default_count())
    }

    /// Compute resources of a unit of the tier in this run.
    pub fn processing(&self, tier: Tier) -> ProcessingUnitConfig {
        let mut config = tier.processing();
        if let Some(bandwidth) = self.bandwidth.get(&tier) {
            config.bandwidth_mb_per_ms = *bandwidth;
        }
        config
    }

    fn from_raw(raw: RawRunConfig) -> Self {
        let topology = raw.topology;
        Self {
            name: raw.name,
            seed: raw.seed.unwrap_or(123),
            duration: raw.duration.or_else(|| topology.default_duration()),
            clients: raw.clients.unwrap_or(DEFAULT_CLIENTS),
            packages_per_client: raw.packages_per_client.or_else(|| topology.default_packages_per_client()),
            unit_counts: raw.unit_counts.unwrap_or_default(),
            bandwidth: raw.bandwidth.unwrap_or_default(),
            check_additivity: raw.check_additivity.unwrap_or_else(|| topology.is_additive()),
            topology,
        }
    }

    /// Checks the values that are not validated by the model components.
    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(duration) = self.duration {
            if !(duration > 0.) {
                return Err(SimError::config(format!("run {}: duration must be positive", self.name)));
            }
        }
        if let Some((tier, _)) = self.unit_counts.iter().find(|(_, count)| **count == 0) {
            return Err(SimError::config(format!("run {}: no units of tier {}", self.name, tier)));
        }
        if let Some((tier, bandwidth)) = self.bandwidth.iter().find(|(_, b)| !(**b > 0.) || !b.is_finite()) {
            return Err(SimError::config(format!(
                "run {}: invalid bandwidth {} of tier {}",
                self.name, bandwidth, tier
            )));
        }
        if self.duration.is_none() && self.packages_per_client.is_none() {
            return Err(SimError::config(format!(
                "run {}: unbounded clients require a duration",
                self.name
            )));
        }
        match &self.topology {
            TopologyConfig::EdgeAggregation { level: Tier::District } => Err(SimError::config(format!(
                "run {}: districts can't aggregate data from other districts",
                self.name
            ))),
            TopologyConfig::ReadByProbabilities { probabilities } if probabilities.len() != Tier::ALL.len() => {
                Err(SimError::config(format!(
                    "run {}: expected {} read probabilities, got {}",
                    self.name,
                    Tier::ALL.len(),
                    probabilities.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Represents experiment configuration: a list of independent runs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ExperimentConfig {
    pub runs: Vec<RunConfig>,
}

impl ExperimentConfig {
    /// Creates experiment config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, SimError> {
        let data = std::fs::read_to_string(file_name)
            .map_err(|e| SimError::config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_str(&data).map_err(|e| match e {
            SimError::Configuration(msg) => SimError::config(format!("{}: {}", file_name, msg)),
            other => other,
        })
    }

    /// Edge aggregation at every level compared with the cloud solution.
    pub fn write_by_level() -> Self {
        let mut runs: Vec<RunConfig> = [Tier::City, Tier::Territory, Tier::Country, Tier::Continent, Tier::Central]
            .into_iter()
            .map(|level| {
                let mut name = format!("{} Aggregation", level);
                name[..1].make_ascii_uppercase();
                RunConfig::new(name, TopologyConfig::EdgeAggregation { level })
            })
            .collect();
        runs.push(RunConfig::new("Cloud solution", TopologyConfig::Cloud));
        Self { runs }
    }
}

impl FromStr for ExperimentConfig {
    type Err = SimError;

    /// Parses experiment config from YAML string.
    fn from_str(data: &str) -> Result<Self, SimError> {
        let raw: RawExperimentConfig =
            serde_yaml::from_str(data).map_err(|e| SimError::config(format!("can't parse YAML: {}", e)))?;
        let config = Self {
            runs: raw.runs.unwrap_or_default().into_iter().map(RunConfig::from_raw).collect(),
        };
        for run in &config.runs {
            run.validate()?;
        }
        Ok(config)
    }
}
