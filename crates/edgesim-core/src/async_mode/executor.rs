use std::rc::Rc;

use super::{channel::Receiver, task::Task};

// Polls tasks to advance their state.
// Tasks schedule themselves for polling by writing to the channel which is read by the executor.
pub(crate) struct Executor {
    scheduled_tasks: Receiver<Rc<Task>>,
}

impl Executor {
    pub fn new(scheduled_tasks: Receiver<Rc<Task>>) -> Self {
        Self { scheduled_tasks }
    }

    // Polls scheduled tasks until none is left, including the ones scheduled while polling.
    // Returns true if at least one task was polled.
    pub fn process_tasks(&self) -> bool {
        let mut polled = false;
        while let Some(task) = self.scheduled_tasks.try_recv() {
            task.poll();
            polled = true;
        }
        polled
    }

    pub fn has_scheduled_tasks(&self) -> bool {
        self.scheduled_tasks.len() > 0
    }

    pub fn clear(&self) {
        drop(self.scheduled_tasks.drain());
    }
}
