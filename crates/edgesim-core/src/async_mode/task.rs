use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Context;

use super::channel::Sender;
use super::waker::waker_for;

type BoxedFuture = Pin<Box<dyn Future<Output = ()>>>;

// Represents an asynchronous task spawned via Simulation::spawn or SimulationContext::spawn.
// Holds the corresponding future and schedules itself for polling by Executor on wake-up notifications.
pub(crate) struct Task {
    future: RefCell<Option<BoxedFuture>>,
    executor: Sender<Rc<Task>>,
}

impl Task {
    fn new(future: impl Future<Output = ()> + 'static, executor: Sender<Rc<Task>>) -> Self {
        Self {
            future: RefCell::new(Some(Box::pin(future))),
            executor,
        }
    }

    // Converts a future into a task and sends it to executor.
    pub fn spawn(future: impl Future<Output = ()> + 'static, executor: Sender<Rc<Task>>) -> Rc<Task> {
        let task = Rc::new(Task::new(future, executor));
        task.schedule();
        task
    }

    // Drops the future of an unfinished task, releasing everything it captured.
    // The task itself may stay referenced by wakers stored in queues or resources.
    pub fn cancel(&self) {
        let future = self.future.borrow_mut().take();
        drop(future);
    }

    // Polls the internal future with a waker pointing back to this task.
    // A task woken several times within one instant may be polled after it has completed,
    // such late polls are ignored.
    pub fn poll(self: Rc<Self>) {
        let mut future_slot = self.future.borrow_mut();
        if let Some(mut future) = future_slot.take() {
            let waker = waker_for(&self);
            let async_ctx = &mut Context::from_waker(&waker);
            if future.as_mut().poll(async_ctx).is_pending() {
                *future_slot = Some(future);
            }
        }
    }

    pub fn schedule(self: &Rc<Self>) {
        self.executor.send(self.clone());
    }
}
