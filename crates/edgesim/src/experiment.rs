//! Topology construction and execution of experiment runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::info;
use sugars::{rc, refcell};

use edgesim_core::Simulation;

use crate::client::{ClientConfig, DataProducer, DataReader, ReadTarget};
use crate::config::{ExperimentConfig, RunConfig, TopologyConfig};
use crate::error::SimError;
use crate::processing_unit::{LinkStage, OnProcessingEnded, ProcessingUnit};
use crate::random::GaussianParams;
use crate::result_container::{ResultContainer, Summary};
use crate::tier::Tier;
use crate::transmission::Transmission;

/// Simulation of a single run with all its components created and started.
pub struct RunSetup {
    pub sim: Simulation,
    pub results: Rc<RefCell<ResultContainer>>,
    /// Processing units by tier.
    pub units: BTreeMap<Tier, Vec<Rc<ProcessingUnit>>>,
    config: RunConfig,
}

impl RunSetup {
    /// Creates processing units and clients of the run topology.
    ///
    /// Any invalid parameter is reported before the simulation is started.
    pub fn build(config: &RunConfig) -> Result<Self, SimError> {
        config.validate()?;
        let mut setup = Self {
            sim: Simulation::new(config.seed),
            results: rc!(refcell!(ResultContainer::new(
                config.name.clone(),
                config.topology.simulation_type()
            ))),
            units: BTreeMap::new(),
            config: config.clone(),
        };
        match &config.topology {
            TopologyConfig::Cloud => setup.build_cloud()?,
            TopologyConfig::EdgeAggregation { level } => setup.build_edge_aggregation(*level)?,
            TopologyConfig::AllLevels => setup.build_all_levels()?,
            TopologyConfig::ReadByProbabilities { probabilities } => {
                setup.build_read_by_probabilities(probabilities.clone())?
            }
            TopologyConfig::ReadByLevel { level } => setup.build_read_by_level(*level)?,
        }
        Ok(setup)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs the simulation until the configured duration elapses or, without duration, until no events are left.
    pub fn run(mut self) -> Result<Summary, SimError> {
        match self.config.duration {
            Some(duration) => {
                self.sim.step_until_time(duration);
            }
            None => self.sim.step_until_no_events(),
        }
        info!(
            "Run {} finished at {:.3} ms after {} timers",
            self.config.name,
            self.sim.time(),
            self.sim.timer_count()
        );
        let summary = self.results.borrow().summary(self.config.check_additivity);
        summary
    }

    // Topologies ------------------------------------------------------------------------------------------------------

    fn build_cloud(&mut self) -> Result<(), SimError> {
        self.add_units(Tier::Central, LinkStage::FirstLink, Tier::Central.client_distance(), |_| {
            Ok(OnProcessingEnded::SaveTotalLatency)
        })?;
        self.add_producers(Tier::Central)
    }

    fn build_edge_aggregation(&mut self, level: Tier) -> Result<(), SimError> {
        self.add_units(level, LinkStage::SecondLink, district_distance(level)?, |_| {
            Ok(OnProcessingEnded::SaveTotalLatency)
        })?;
        self.add_units(Tier::District, LinkStage::FirstLink, Tier::District.client_distance(), |setup| {
            Ok(OnProcessingEnded::SendToAggregators(vec![setup.random_target(level)]))
        })?;
        self.add_producers(Tier::District)
    }

    // Only the central unit records total latency: the other aggregators receive copies of the same data.
    fn build_all_levels(&mut self) -> Result<(), SimError> {
        let aggregator_tiers = [Tier::Central, Tier::Continent, Tier::Country, Tier::Territory, Tier::City];
        for tier in aggregator_tiers {
            self.add_units(tier, LinkStage::SecondLink, district_distance(tier)?, |_| {
                Ok(if tier == Tier::Central {
                    OnProcessingEnded::SaveTotalLatency
                } else {
                    OnProcessingEnded::DoNothing
                })
            })?;
        }
        self.add_units(Tier::District, LinkStage::FirstLink, Tier::District.client_distance(), |setup| {
            let targets = aggregator_tiers.iter().map(|tier| setup.random_target(*tier)).collect();
            Ok(OnProcessingEnded::SendToAggregators(targets))
        })?;
        self.add_producers(Tier::District)
    }

    fn build_read_by_probabilities(&mut self, probabilities: Vec<f64>) -> Result<(), SimError> {
        for tier in Tier::ALL {
            self.add_units(tier, LinkStage::FirstLink, tier.client_distance(), |_| {
                Ok(OnProcessingEnded::SaveTotalLatency)
            })?;
        }
        let config = ClientConfig::reader().with_limit(self.config.packages_per_client);
        for i in 0..self.config.clients {
            let targets = Tier::ALL.iter().map(|tier| self.random_target(*tier)).collect();
            let reader = rc!(DataReader::new(
                config,
                ReadTarget::ByProbability {
                    probabilities: probabilities.clone(),
                    targets,
                },
                self.results.clone(),
                self.sim.create_context(format!("reader-{}", i)),
            )?);
            reader.start();
        }
        Ok(())
    }

    fn build_read_by_level(&mut self, level: Tier) -> Result<(), SimError> {
        self.add_units(level, LinkStage::FirstLink, level.client_distance(), |_| {
            Ok(OnProcessingEnded::SaveTotalLatency)
        })?;
        let config = ClientConfig::reader().with_limit(self.config.packages_per_client);
        for i in 0..self.config.clients {
            let target = ReadTarget::Single(self.random_target(level));
            let reader = rc!(DataReader::new(
                config,
                target,
                self.results.clone(),
                self.sim.create_context(format!("reader-{}", i)),
            )?);
            reader.start();
        }
        Ok(())
    }

    // Helpers ---------------------------------------------------------------------------------------------------------

    fn add_units<F>(
        &mut self,
        tier: Tier,
        stage: LinkStage,
        distance: GaussianParams,
        on_processing_ended: F,
    ) -> Result<(), SimError>
    where
        F: Fn(&mut Self) -> Result<OnProcessingEnded, SimError>,
    {
        let count = self.config.unit_count(tier);
        let mut units = Vec::with_capacity(count as usize);
        for i in 0..count {
            let on_processing_ended = on_processing_ended(self)?;
            let unit = rc!(ProcessingUnit::new(
                self.config.processing(tier),
                stage,
                stage.link_config(distance),
                on_processing_ended,
                self.results.clone(),
                self.sim.create_context(format!("{}-{}", tier, i)),
            )?);
            unit.start();
            units.push(unit);
        }
        self.units.insert(tier, units);
        Ok(())
    }

    fn add_producers(&mut self, tier: Tier) -> Result<(), SimError> {
        let config = ClientConfig::producer().with_limit(self.config.packages_per_client);
        for i in 0..self.config.clients {
            let target = self.random_target(tier);
            let producer = rc!(DataProducer::new(
                config,
                target,
                self.results.clone(),
                self.sim.create_context(format!("producer-{}", i)),
            )?);
            producer.start();
        }
        Ok(())
    }

    // Inbound link of a unit of the tier chosen uniformly at random.
    fn random_target(&mut self, tier: Tier) -> Rc<Transmission> {
        let units = &self.units[&tier];
        let idx = self.sim.gen_range(0..units.len());
        units[idx].incoming_transmission()
    }
}

fn district_distance(tier: Tier) -> Result<GaussianParams, SimError> {
    tier.district_distance()
        .ok_or_else(|| SimError::config(format!("no district distance for tier {}", tier)))
}

/// Sequence of independent runs.
pub struct Experiment {
    config: ExperimentConfig,
}

impl Experiment {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Runs every configured run in turn and returns their summaries.
    pub fn run(&self) -> Result<Vec<Summary>, SimError> {
        let mut summaries = Vec::with_capacity(self.config.runs.len());
        for run in &self.config.runs {
            info!("Running configuration: {}", run.name);
            summaries.push(RunSetup::build(run)?.run()?);
        }
        Ok(summaries)
    }
}
