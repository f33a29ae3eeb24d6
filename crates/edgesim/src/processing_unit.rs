//! Simulated compute node.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use edgesim_core::{log_debug, log_trace, Resource, SimulationContext};

use crate::error::SimError;
use crate::message::DataMessage;
use crate::random::{GaussianParams, PositiveGaussian};
use crate::result_container::ResultContainer;
use crate::transmission::{LinkConfig, Transmission};

/// Size in MB of a message produced by processing.
pub const PROCESSED_DATA_SIZE: GaussianParams = GaussianParams::new(0.010, 0.001);

/// Compute resources of a processing unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingUnitConfig {
    /// Number of messages that can be processed simultaneously.
    pub cores: u32,
    /// MB processed by one core per ms.
    pub bandwidth_mb_per_ms: f64,
    /// Delay in ms before processing starts.
    pub start_delay: GaussianParams,
}

/// Position of the inbound link of a unit in the message path.
///
/// Selects the statistics series a unit reports to. Units on the first link receive data from clients
/// over the weak access network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStage {
    FirstLink,
    SecondLink,
}

impl LinkStage {
    /// Link profile of a unit at this stage with the given distance.
    pub fn link_config(&self, distance: GaussianParams) -> LinkConfig {
        LinkConfig::new(distance, *self == LinkStage::FirstLink)
    }
}

/// Action performed once a message has been processed.
pub enum OnProcessingEnded {
    /// Send a new processed message to each of the aggregators.
    SendToAggregators(Vec<Rc<Transmission>>),
    /// Record the end-to-end latency of the message.
    SaveTotalLatency,
    /// Nothing, used by intermediate aggregators when a message is fanned out to several of them.
    DoNothing,
}

/// Number of messages in each processing state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitCounters {
    pub received: u64,
    pub awaiting_core: u64,
    pub processing: u64,
    pub completed: u64,
}

/// Node with one inbound link and a pool of cores.
///
/// Every received message is processed in a separate task: it waits for a free core (in arrival order),
/// holds the core for `start_delay + megabytes / bandwidth` ms and then triggers [`OnProcessingEnded`].
pub struct ProcessingUnit {
    config: ProcessingUnitConfig,
    stage: LinkStage,
    on_processing_ended: OnProcessingEnded,
    incoming: Rc<Transmission>,
    cores: Resource,
    start_delay: PositiveGaussian,
    processed_size: PositiveGaussian,
    results: Rc<RefCell<ResultContainer>>,
    counters: RefCell<UnitCounters>,
    ctx: SimulationContext,
}

impl ProcessingUnit {
    pub fn new(
        config: ProcessingUnitConfig,
        stage: LinkStage,
        link: LinkConfig,
        on_processing_ended: OnProcessingEnded,
        results: Rc<RefCell<ResultContainer>>,
        ctx: SimulationContext,
    ) -> Result<Self, SimError> {
        if config.cores == 0 {
            return Err(SimError::config(format!("{} must have at least one core", ctx.name())));
        }
        if !(config.bandwidth_mb_per_ms > 0.) || !config.bandwidth_mb_per_ms.is_finite() {
            return Err(SimError::config(format!(
                "{} has invalid bandwidth {}",
                ctx.name(),
                config.bandwidth_mb_per_ms
            )));
        }
        if config.start_delay.mean < 0. {
            return Err(SimError::config(format!(
                "{} has negative processing start delay {}",
                ctx.name(),
                config.start_delay.mean
            )));
        }
        if let OnProcessingEnded::SendToAggregators(targets) = &on_processing_ended {
            if targets.is_empty() {
                return Err(SimError::config(format!(
                    "{} sends processed data to aggregators but none is configured",
                    ctx.name()
                )));
            }
        }
        Ok(Self {
            config,
            stage,
            on_processing_ended,
            incoming: Rc::new(Transmission::new(link, ctx.clone())?),
            cores: Resource::new(config.cores),
            start_delay: PositiveGaussian::from_params(config.start_delay)?,
            processed_size: PositiveGaussian::from_params(PROCESSED_DATA_SIZE)?,
            results,
            counters: RefCell::new(UnitCounters::default()),
            ctx,
        })
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn config(&self) -> &ProcessingUnitConfig {
        &self.config
    }

    pub fn stage(&self) -> LinkStage {
        self.stage
    }

    /// Link over which the unit receives messages. Clients and lower-level units send to it.
    pub fn incoming_transmission(&self) -> Rc<Transmission> {
        self.incoming.clone()
    }

    pub fn counters(&self) -> UnitCounters {
        *self.counters.borrow()
    }

    /// Starts listening for incoming messages.
    pub fn start(self: &Rc<Self>) {
        log_debug!(
            self.ctx,
            "started with {} cores, bandwidth {} MB/ms",
            self.config.cores,
            self.config.bandwidth_mb_per_ms
        );
        let unit = self.clone();
        self.ctx.spawn(async move { unit.listen().await });
    }

    async fn listen(self: Rc<Self>) {
        loop {
            let message = self.incoming.receive().await;
            let arrived_at = self.ctx.time();
            self.on_message_received(&message);
            let unit = self.clone();
            self.ctx.spawn(async move { unit.process(message, arrived_at).await });
        }
    }

    fn on_message_received(&self, message: &DataMessage) {
        self.counters.borrow_mut().received += 1;
        let latency = message.latency_acquired().unwrap_or_default();
        let distance = message.distance_traveled().unwrap_or_default();
        let mut results = self.results.borrow_mut();
        match self.stage {
            LinkStage::FirstLink => results.report_first_link(latency, message.megabytes(), distance),
            LinkStage::SecondLink => results.report_second_link(latency, message.megabytes(), distance),
        }
    }

    async fn process(self: Rc<Self>, message: DataMessage, arrived_at: f64) {
        self.counters.borrow_mut().awaiting_core += 1;
        let core = self.cores.acquire().await;
        {
            let mut counters = self.counters.borrow_mut();
            counters.awaiting_core -= 1;
            counters.processing += 1;
        }
        if self.ctx.time() > arrived_at {
            log_trace!(self.ctx, "waited {:.3} ms for a free core", self.ctx.time() - arrived_at);
        }

        let processing_time = self.processing_time(&message);
        self.ctx.sleep(processing_time).await;
        drop(core);
        {
            let mut counters = self.counters.borrow_mut();
            counters.processing -= 1;
            counters.completed += 1;
        }

        self.on_processing_ended(message, self.ctx.time() - arrived_at);
    }

    fn processing_time(&self, message: &DataMessage) -> f64 {
        self.ctx.sample_from_distribution(&self.start_delay) + message.megabytes() / self.config.bandwidth_mb_per_ms
    }

    // Processing latency includes the time spent waiting for a core.
    fn on_processing_ended(&self, message: DataMessage, processing_latency: f64) {
        match self.stage {
            LinkStage::FirstLink => self.results.borrow_mut().report_first_processing(processing_latency),
            LinkStage::SecondLink => self.results.borrow_mut().report_second_processing(processing_latency),
        }

        match &self.on_processing_ended {
            OnProcessingEnded::SendToAggregators(targets) => {
                let megabytes = self.ctx.sample_from_distribution(&self.processed_size);
                for target in targets {
                    target.send(message.forward(megabytes, self.ctx.time()));
                }
            }
            OnProcessingEnded::SaveTotalLatency => {
                let total_latency = self.ctx.time() - message.created_at();
                self.results.borrow_mut().report_terminal(total_latency);
            }
            OnProcessingEnded::DoNothing => {}
        }
    }
}
