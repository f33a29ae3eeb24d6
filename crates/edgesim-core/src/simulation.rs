//! Simulation configuration and execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use log::debug;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;
use serde_json::json;

use crate::async_mode::channel::channel;
use crate::async_mode::executor::Executor;
use crate::async_mode::queue::UnboundedQueue;
use crate::async_mode::resource::Resource;
use crate::context::{Id, SimulationContext};
use crate::state::SimulationState;

/// Represents a simulation, provides methods for its configuration and execution.
///
/// Each simulation owns its clock and random number generator, so independent runs
/// can be executed in separate threads or processes without sharing any state.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    executor: Executor,
    name_to_id: HashMap<String, Id>,
    names: Vec<String>,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        let (sender, receiver) = channel();
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed, sender))),
            executor: Executor::new(receiver),
            name_to_id: HashMap::new(),
            names: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.names.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        id
    }

    /// Returns the identifier of component by its name, if such component exists.
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the name of component by its identifier.
    ///
    /// Panics if component with such Id does not exist.
    pub fn lookup_name(&self, id: Id) -> &str {
        &self.names[id as usize]
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Creating a context with an already registered name reuses the component Id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edgesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let comp_ctx = sim.create_context("comp");
    /// assert_eq!(comp_ctx.id(), 0); // component ids are assigned sequentially starting from 0
    /// assert_eq!(comp_ctx.name(), "comp");
    /// assert_eq!(sim.create_context("comp").id(), 0);
    /// ```
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        let ctx = SimulationContext::new(id, name.as_ref(), self.sim_state.clone());
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created context: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": ctx.name(), "id": ctx.id()})
        );
        ctx
    }

    /// Creates a new unbounded queue.
    pub fn create_queue<T, S>(&mut self, name: S) -> UnboundedQueue<T>
    where
        S: AsRef<str>,
    {
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created queue: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref()})
        );
        UnboundedQueue::new()
    }

    /// Creates a new resource pool with the given number of units.
    pub fn create_resource<S>(&mut self, name: S, capacity: u32) -> Resource
    where
        S: AsRef<str>,
    {
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] Created resource: {}",
            self.time(),
            crate::log::get_colored("DEBUG", colored::Color::Blue),
            json!({"name": name.as_ref(), "capacity": capacity})
        );
        Resource::new(capacity)
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Spawns a new asynchronous task.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edgesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// sim.spawn(async move {
    ///     ctx.sleep(1.2).await;
    ///     ctx.sleep(0.3).await;
    /// });
    /// sim.step_until_no_events();
    /// assert_eq!(sim.time(), 1.5);
    /// ```
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.sim_state.borrow_mut().spawn(future);
    }

    /// Performs a single step through the simulation.
    ///
    /// If some tasks are ready to run, polls all of them (including the ones woken up meanwhile)
    /// without advancing the clock. Otherwise takes the earliest pending timer, advances the clock to its time,
    /// fires it and polls the woken tasks.
    ///
    /// Returns `true` if some progress was made and `false` if there are no runnable tasks and no pending timers.
    pub fn step(&mut self) -> bool {
        if self.executor.process_tasks() {
            return true;
        }
        let next_timer = self.sim_state.borrow_mut().next_timer();
        match next_timer {
            Some(timer) => {
                crate::log::log_timer_fired(timer.time, timer.id, self.lookup_name(timer.component_id));
                timer.complete();
                self.executor.process_tasks();
                true
            }
            None => false,
        }
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps through the simulation until there are no runnable tasks and no pending timers left.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps through the simulation with duration limit.
    ///
    /// See [`step_until_time()`](Self::step_until_time()).
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        self.step_until_time(end_time)
    }

    /// Steps through the simulation until the next timer is scheduled after the specified time.
    ///
    /// The clock is then set to `time`. Tasks still suspended at this point are left as is.
    /// Returns `true` if there could be more pending events and `false` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edgesim_core::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// sim.spawn(async move {
    ///     ctx.sleep(1.).await;
    ///     ctx.sleep(10.).await;
    /// });
    /// assert!(sim.step_until_time(5.));
    /// assert_eq!(sim.time(), 5.);
    /// assert!(!sim.step_until_time(20.));
    /// assert_eq!(sim.time(), 20.);
    /// ```
    pub fn step_until_time(&mut self, time: f64) -> bool {
        self.executor.process_tasks();
        let has_more = loop {
            let next_time = self.sim_state.borrow_mut().peek_timer_time();
            match next_time {
                Some(next_time) if next_time <= time => {
                    self.step();
                }
                Some(_) => break true,
                None => break false,
            }
        };
        let mut sim_state = self.sim_state.borrow_mut();
        if time > sim_state.time() {
            sim_state.set_time(time);
        }
        has_more
    }

    /// Returns `true` if there are runnable tasks or pending timers.
    pub fn has_pending_events(&self) -> bool {
        self.executor.has_scheduled_tasks() || self.sim_state.borrow().pending_timers() > 0
    }

    /// Returns a random float in the range _[0, 1)_
    /// using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range
    /// using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution
    /// using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Returns the total number of created timers, including cancelled ones.
    pub fn timer_count(&self) -> u64 {
        self.sim_state.borrow().timer_count()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Suspended tasks and their wakers form cycles with the components they capture
        // (e.g. a task waiting on a queue owned by the same component), so the futures are dropped explicitly.
        // Everything is detached first and dropped outside of the state borrow.
        let timers = self.sim_state.borrow_mut().take_timers();
        drop(timers);
        self.executor.clear();
        let tasks = self.sim_state.borrow_mut().take_tasks();
        for task in tasks.iter() {
            task.cancel();
        }
        // dropped futures may release resources and wake other tasks
        self.executor.clear();
    }
}
