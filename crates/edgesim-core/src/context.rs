//! Accessing simulation from components.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::async_mode::timer_future::TimerFuture;
use crate::state::SimulationState;

/// Identifier of simulation component.
pub type Id = u32;

/// A facade for accessing the simulation state from simulation components.
///
/// Contexts are cheap to clone: all clones refer to the same component and the same simulation.
#[derive(Clone)]
pub struct SimulationContext {
    id: Id,
    name: Rc<str>,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, sim_state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: Rc::from(name),
            sim_state,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Spawns a new asynchronous task.
    ///
    /// The task is first polled within the current simulation step, so it starts at the current time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edgesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// let inner = ctx.clone();
    /// ctx.spawn(async move {
    ///     inner.sleep(2.5).await;
    /// });
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 2.5);
    /// ```
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.sim_state.borrow_mut().spawn(future);
    }

    /// Returns a future that completes after the specified simulated duration.
    ///
    /// Panics if the duration is negative.
    pub fn sleep(&self, duration: f64) -> TimerFuture {
        self.sim_state
            .borrow_mut()
            .create_timer(self.id, duration, self.sim_state.clone())
    }
}
