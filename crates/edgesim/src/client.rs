//! Clients generating data messages.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use edgesim_core::{log_trace, SimulationContext};

use crate::error::SimError;
use crate::message::DataMessage;
use crate::random::{GaussianParams, PositiveGaussian};
use crate::result_container::ResultContainer;
use crate::transmission::Transmission;

/// Allowed deviation of the sum of read probabilities from one.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Request generation parameters of a client.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Time in ms between consecutive messages.
    pub interval: GaussianParams,
    /// Message size in MB.
    pub payload: GaussianParams,
    /// Number of messages to send, unbounded if not set.
    pub limit: Option<u64>,
}

impl ClientConfig {
    /// Producer of full HD photos (about 423 KB) every 10 seconds on average.
    pub fn producer() -> Self {
        Self {
            interval: GaussianParams::new(10000., 3000.),
            payload: GaussianParams::new(0.423, 0.150),
            limit: None,
        }
    }

    /// Reader sending small read requests every 5 seconds on average.
    pub fn reader() -> Self {
        Self {
            interval: GaussianParams::new(5000., 2000.),
            payload: GaussianParams::new(0.010, 0.001),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

// Shared request loop of producers and readers.
struct RequestGenerator {
    interval: PositiveGaussian,
    payload: PositiveGaussian,
    limit: Option<u64>,
    results: Rc<RefCell<ResultContainer>>,
    ctx: SimulationContext,
}

impl RequestGenerator {
    fn new(
        config: ClientConfig,
        results: Rc<RefCell<ResultContainer>>,
        ctx: SimulationContext,
    ) -> Result<Self, SimError> {
        Ok(Self {
            interval: PositiveGaussian::from_params(config.interval)?,
            payload: PositiveGaussian::from_params(config.payload)?,
            limit: config.limit,
            results,
            ctx,
        })
    }

    async fn run<F>(&self, choose_target: F)
    where
        F: Fn() -> Rc<Transmission>,
    {
        let mut sent = 0;
        while self.limit.map_or(true, |limit| sent < limit) {
            let wait = self.ctx.sample_from_distribution(&self.interval);
            self.ctx.sleep(wait).await;

            let megabytes = self.ctx.sample_from_distribution(&self.payload);
            let now = self.ctx.time();
            log_trace!(self.ctx, "waited {:.3} ms, sending {:.3} MB", wait, megabytes);
            choose_target().send(DataMessage::new(megabytes, now, now));
            self.results.borrow_mut().report_produced();
            sent += 1;
        }
    }
}

/// Client sending produced data to a single processing unit.
pub struct DataProducer {
    target: Rc<Transmission>,
    generator: RequestGenerator,
}

impl DataProducer {
    pub fn new(
        config: ClientConfig,
        target: Rc<Transmission>,
        results: Rc<RefCell<ResultContainer>>,
        ctx: SimulationContext,
    ) -> Result<Self, SimError> {
        Ok(Self {
            target,
            generator: RequestGenerator::new(config, results, ctx)?,
        })
    }

    pub fn start(self: &Rc<Self>) {
        let producer = self.clone();
        self.generator.ctx.spawn(async move {
            producer.generator.run(|| producer.target.clone()).await;
        });
    }
}

/// Destination of read requests.
pub enum ReadTarget {
    Single(Rc<Transmission>),
    /// The target is drawn for every request, `probabilities[i]` being the chance of `targets[i]`.
    ByProbability {
        probabilities: Vec<f64>,
        targets: Vec<Rc<Transmission>>,
    },
}

impl ReadTarget {
    fn validate(&self) -> Result<(), SimError> {
        if let ReadTarget::ByProbability { probabilities, targets } = self {
            if probabilities.is_empty() || probabilities.len() != targets.len() {
                return Err(SimError::config(format!(
                    "expected one probability per read target, got {} probabilities for {} targets",
                    probabilities.len(),
                    targets.len()
                )));
            }
            if probabilities.iter().any(|p| !(*p >= 0.)) {
                return Err(SimError::config(format!(
                    "read probabilities must be non-negative: {:?}",
                    probabilities
                )));
            }
            let sum: f64 = probabilities.iter().sum();
            if (sum - 1.).abs() > PROBABILITY_SUM_TOLERANCE {
                return Err(SimError::config(format!(
                    "read probabilities must sum to one, got {}",
                    sum
                )));
            }
        }
        Ok(())
    }

    fn choose(&self, ctx: &SimulationContext) -> Rc<Transmission> {
        match self {
            ReadTarget::Single(target) => target.clone(),
            ReadTarget::ByProbability { probabilities, targets } => {
                let extraction = ctx.rand();
                let mut cumulative = 0.;
                for (probability, target) in probabilities.iter().zip(targets) {
                    cumulative += probability;
                    if extraction < cumulative {
                        return target.clone();
                    }
                }
                // rounding may leave the sum slightly below one
                let last = probabilities.iter().rposition(|p| *p > 0.).unwrap_or(targets.len() - 1);
                targets[last].clone()
            }
        }
    }
}

/// Client sending read requests to one of several processing units.
pub struct DataReader {
    target: ReadTarget,
    generator: RequestGenerator,
}

impl DataReader {
    pub fn new(
        config: ClientConfig,
        target: ReadTarget,
        results: Rc<RefCell<ResultContainer>>,
        ctx: SimulationContext,
    ) -> Result<Self, SimError> {
        target.validate()?;
        Ok(Self {
            target,
            generator: RequestGenerator::new(config, results, ctx)?,
        })
    }

    pub fn start(self: &Rc<Self>) {
        let reader = self.clone();
        self.generator.ctx.spawn(async move {
            let ctx = reader.generator.ctx.clone();
            reader.generator.run(|| reader.target.choose(&ctx)).await;
        });
    }
}
