//! Simulated network link.

use std::cell::Cell;
use std::f64::consts::FRAC_1_SQRT_2;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use edgesim_core::{log_trace, SimulationContext, UnboundedQueue};

use crate::error::SimError;
use crate::message::DataMessage;
use crate::random::{GaussianParams, PositiveGaussian};

/// Speed of light in vacuum, km/ms.
pub const SPEED_OF_LIGHT_KM_PER_MS: f64 = 299_792_458. / 1000. / 1000.;
/// Share of the speed of light reached in optical fiber.
pub const OPTICAL_FIBER_FACTOR: f64 = 0.67;
/// Signal travels back and forth.
pub const ROUND_TRIP_FACTOR: f64 = 0.5;
/// Cables never follow the straight line between endpoints.
pub const NO_LINE_OF_SIGHT_FACTOR: f64 = FRAC_1_SQRT_2;
/// Effective signal speed used to convert link distance into propagation delay, km/ms.
pub const SIGNAL_SPEED_KM_PER_MS: f64 =
    SPEED_OF_LIGHT_KM_PER_MS * NO_LINE_OF_SIGHT_FACTOR * ROUND_TRIP_FACTOR * OPTICAL_FIBER_FACTOR;

/// Extra delay of the access network near clients (wireless hops, packet loss).
pub const WEAK_NETWORK_DELAY: GaussianParams = GaussianParams::new(12., 8.);
/// Extra delay of the backbone network.
pub const ROBUST_NETWORK_DELAY: GaussianParams = GaussianParams::new(3., 1.);

/// Latency profile of a link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Distance between endpoints, km.
    pub distance: GaussianParams,
    /// Whether the link starts in the weak access network.
    pub weak_network: bool,
    pub weak_delay: GaussianParams,
    pub robust_delay: GaussianParams,
}

impl LinkConfig {
    pub fn new(distance: GaussianParams, weak_network: bool) -> Self {
        Self {
            distance,
            weak_network,
            weak_delay: WEAK_NETWORK_DELAY,
            robust_delay: ROBUST_NETWORK_DELAY,
        }
    }

    /// Network delay profile selected by [`weak_network`](Self::weak_network).
    pub fn network_delay(&self) -> GaussianParams {
        if self.weak_network {
            self.weak_delay
        } else {
            self.robust_delay
        }
    }

    /// Analytic mean of the delay acquired on this link, ignoring the truncation at zero.
    pub fn expected_latency(&self) -> f64 {
        self.distance.mean / SIGNAL_SPEED_KM_PER_MS + self.network_delay().mean
    }
}

/// One directional link delivering messages with a randomized delay.
///
/// Every [`send`](Self::send) samples its own distance and delay and schedules an independent delivery,
/// so messages may arrive in a different order than they were sent.
/// Delivered messages are buffered until they are taken with [`receive`](Self::receive).
pub struct Transmission {
    config: LinkConfig,
    distance: PositiveGaussian,
    network_delay: PositiveGaussian,
    delivered: Rc<UnboundedQueue<DataMessage>>,
    sent_count: Cell<u64>,
    ctx: SimulationContext,
}

impl Transmission {
    pub fn new(config: LinkConfig, ctx: SimulationContext) -> Result<Self, SimError> {
        if !(config.distance.mean > 0.) || !(config.distance.std > 0.) {
            return Err(SimError::config(format!(
                "link of {} must have positive distance mean and std, got {:?}",
                ctx.name(),
                config.distance
            )));
        }
        Ok(Self {
            config,
            distance: PositiveGaussian::from_params(config.distance)?,
            network_delay: PositiveGaussian::from_params(config.network_delay())?,
            delivered: Rc::new(UnboundedQueue::new()),
            sent_count: Cell::new(0),
            ctx,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Draws a link distance and the corresponding total delay (network delay plus propagation delay).
    pub fn sample_distance_and_delay(&self) -> (f64, f64) {
        let network_delay = self.ctx.sample_from_distribution(&self.network_delay);
        let distance = self.ctx.sample_from_distribution(&self.distance);
        (distance, network_delay + distance / SIGNAL_SPEED_KM_PER_MS)
    }

    /// Puts the message on the link without blocking the caller.
    pub fn send(&self, mut message: DataMessage) {
        let (distance, delay) = self.sample_distance_and_delay();
        message.set_link_metadata(distance, delay);
        self.sent_count.set(self.sent_count.get() + 1);
        log_trace!(
            self.ctx,
            "sending {:.3} MB over {:.1} km, arrives in {:.3} ms",
            message.megabytes(),
            distance,
            delay
        );

        let ctx = self.ctx.clone();
        let delivered = self.delivered.clone();
        self.ctx.spawn(async move {
            ctx.sleep(delay).await;
            delivered.put(message);
        });
    }

    /// Waits for the next delivered message.
    pub async fn receive(&self) -> DataMessage {
        self.delivered.take().await
    }

    /// Number of messages sent so far.
    pub fn sent_count(&self) -> u64 {
        self.sent_count.get()
    }

    /// Number of delivered messages not yet received.
    pub fn pending_len(&self) -> usize {
        self.delivered.len()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use edgesim_core::Simulation;

    use super::*;

    #[test]
    fn test_signal_speed() {
        // 299.79 km/ms * 0.7071 * 0.5 * 0.67
        assert_relative_eq!(SIGNAL_SPEED_KM_PER_MS, 71.0151, epsilon = 1e-3);
    }

    #[test]
    fn test_non_positive_distance_is_rejected() {
        let mut sim = Simulation::new(123);
        let ctx = sim.create_context("link");
        for distance in [GaussianParams::new(0., 1.), GaussianParams::new(10., 0.)] {
            let result = Transmission::new(LinkConfig::new(distance, true), ctx.clone());
            assert!(matches!(result, Err(SimError::Configuration(_))));
        }
    }

    #[test]
    fn test_message_is_delivered_after_its_delay() {
        let mut sim = Simulation::new(123);
        let ctx = sim.create_context("link");
        let link = Rc::new(Transmission::new(LinkConfig::new(GaussianParams::new(100., 10.), false), ctx.clone()).unwrap());

        link.send(DataMessage::new(0.5, 0., 0.));
        assert_eq!(link.sent_count(), 1);

        let receiver = link.clone();
        sim.spawn(async move {
            let message = receiver.receive().await;
            let latency = message.latency_acquired().unwrap();
            assert_relative_eq!(ctx.time(), latency, epsilon = 1e-9);
            assert!(message.distance_traveled().unwrap() >= 0.);
        });
        sim.step_until_no_events();
        assert_eq!(link.pending_len(), 0);
    }
}
