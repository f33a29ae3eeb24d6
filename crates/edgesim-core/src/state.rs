use std::cell::RefCell;
use std::collections::{BinaryHeap, HashSet};
use std::future::Future;
use std::rc::{Rc, Weak};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::async_mode::channel::Sender;
use crate::async_mode::task::Task;
use crate::async_mode::timer_future::{TimerFuture, TimerId, TimerPromise};
use crate::context::Id;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

pub(crate) struct SimulationState {
    clock: f64,
    rand: Pcg64,
    timers: BinaryHeap<TimerPromise>,
    canceled_timers: HashSet<TimerId>,
    timer_count: u64,
    executor: Sender<Rc<Task>>,
    tasks: Vec<Weak<Task>>,
}

impl SimulationState {
    pub fn new(seed: u64, executor: Sender<Rc<Task>>) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            timers: BinaryHeap::new(),
            canceled_timers: HashSet::new(),
            timer_count: 0,
            executor,
            tasks: Vec::new(),
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        debug_assert!(time >= self.clock - EPSILON, "clock cannot go backwards");
        self.clock = time;
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    pub fn spawn(&mut self, future: impl Future<Output = ()> + 'static) {
        if self.tasks.len() == self.tasks.capacity() {
            self.tasks.retain(|task| task.strong_count() > 0);
        }
        let task = Task::spawn(future, self.executor.clone());
        self.tasks.push(Rc::downgrade(&task));
    }

    // Detaches the tasks that are still alive so that the caller can cancel them outside of the state borrow.
    pub fn take_tasks(&mut self) -> Vec<Rc<Task>> {
        std::mem::take(&mut self.tasks)
            .into_iter()
            .filter_map(|task| task.upgrade())
            .collect()
    }

    // Timers ----------------------------------------------------------------------------------------------------------

    pub fn create_timer(
        &mut self,
        component_id: Id,
        timeout: f64,
        sim_state: Rc<RefCell<SimulationState>>,
    ) -> TimerFuture {
        if timeout < -EPSILON {
            panic!("Timer delay is negative ({}). It is not allowed to schedule timers in the past.", timeout);
        }
        let promise = TimerPromise::new(self.timer_count, component_id, self.clock + timeout.max(0.));
        let future = promise.future(sim_state);
        self.timers.push(promise);
        self.timer_count += 1;
        future
    }

    pub fn peek_timer_time(&mut self) -> Option<f64> {
        loop {
            let (id, time) = match self.timers.peek() {
                Some(timer) => (timer.id, timer.time),
                None => return None,
            };
            if self.canceled_timers.remove(&id) {
                self.timers.pop();
            } else {
                return Some(time);
            }
        }
    }

    pub fn next_timer(&mut self) -> Option<TimerPromise> {
        while let Some(timer) = self.timers.pop() {
            if !self.canceled_timers.remove(&timer.id) {
                self.clock = timer.time;
                return Some(timer);
            }
        }
        None
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len().saturating_sub(self.canceled_timers.len())
    }

    pub fn timer_count(&self) -> u64 {
        self.timer_count
    }

    // Called by dropped TimerFuture that was not completed.
    pub fn on_incomplete_timer_future_drop(&mut self, timer_id: TimerId) {
        self.canceled_timers.insert(timer_id);
    }

    // Detaches all pending timers so that the caller can drop them outside of the state borrow.
    pub fn take_timers(&mut self) -> Vec<TimerPromise> {
        self.canceled_timers.clear();
        std::mem::take(&mut self.timers).into_vec()
    }
}
