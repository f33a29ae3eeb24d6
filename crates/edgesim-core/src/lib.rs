#![warn(missing_docs)]
//! Discrete-event simulation engine with cooperative asynchronous tasks.
//!
//! A [`Simulation`] owns the virtual clock, a seeded random number generator and the queue of pending timers.
//! Simulated processes are plain futures spawned via [`Simulation::spawn`] or [`SimulationContext::spawn`]
//! and suspended on [`SimulationContext::sleep`], [`UnboundedQueue::take`] or [`Resource::acquire`].
//! All tasks of a simulation are multiplexed on a single thread, so exactly one task runs at any instant.

pub mod async_mode;
pub mod context;
pub mod log;
pub mod simulation;
mod state;

pub use colored;

pub use async_mode::queue::UnboundedQueue;
pub use async_mode::resource::{Resource, ResourceGuard};
pub use async_mode::timer_future::TimerFuture;
pub use context::{Id, SimulationContext};
pub use simulation::Simulation;
pub use state::EPSILON;
