//! Asynchronous waiting for timers.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::context::Id;
use crate::state::SimulationState;

/// Timer identifier.
pub(crate) type TimerId = u64;

// Timer future --------------------------------------------------------------------------------------------------------

/// Future that represents asynchronous waiting for timer completion.
///
/// Dropping an incomplete future cancels the timer.
pub struct TimerFuture {
    timer_id: TimerId,
    state: Rc<RefCell<TimerAwaitState>>,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if state.completed {
            Poll::Ready(())
        } else {
            state.waker = Some(async_ctx.waker().clone());
            Poll::Pending
        }
    }
}

impl Drop for TimerFuture {
    fn drop(&mut self) {
        if self.state.borrow().completed {
            return;
        }
        // the state may already be borrowed when the whole simulation is being torn down
        if let Ok(mut sim_state) = self.sim_state.try_borrow_mut() {
            sim_state.on_incomplete_timer_future_drop(self.timer_id);
        }
    }
}

// Timer promise -------------------------------------------------------------------------------------------------------

pub(crate) struct TimerPromise {
    pub id: TimerId,
    /// Id of simulation component that set the timer.
    pub component_id: Id,
    /// The time when the timer will be fired.
    pub time: f64,
    state: Rc<RefCell<TimerAwaitState>>,
}

impl TimerPromise {
    pub fn new(id: TimerId, component_id: Id, time: f64) -> Self {
        Self {
            id,
            component_id,
            time,
            state: Rc::new(RefCell::new(TimerAwaitState::default())),
        }
    }

    pub fn future(&self, sim_state: Rc<RefCell<SimulationState>>) -> TimerFuture {
        TimerFuture {
            timer_id: self.id,
            state: self.state.clone(),
            sim_state,
        }
    }

    pub fn complete(self) {
        // release the borrow before waking the task
        let waker = {
            let mut state = self.state.borrow_mut();
            state.completed = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Eq for TimerPromise {}

impl PartialEq for TimerPromise {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Reversed to turn BinaryHeap into a min-heap by (time, id).
impl Ord for TimerPromise {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for TimerPromise {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct TimerAwaitState {
    completed: bool,
    waker: Option<Waker>,
}
