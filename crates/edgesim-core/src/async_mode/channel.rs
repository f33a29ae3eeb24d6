use std::{cell::RefCell, collections::VecDeque, rc::Rc};

// Single-threaded FIFO used by tasks to schedule themselves for polling.

#[derive(Clone)]
pub(crate) struct Receiver<T> {
    data: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Receiver<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.data.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    // Removes everything without running destructors under the borrow.
    pub fn drain(&self) -> Vec<T> {
        self.data.borrow_mut().drain(..).collect()
    }
}

#[derive(Clone)]
pub(crate) struct Sender<T> {
    data: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Sender<T> {
    pub fn send(&self, value: T) {
        self.data.borrow_mut().push_back(value);
    }
}

pub(crate) fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let data = Rc::new(RefCell::new(VecDeque::new()));
    (Sender { data: data.clone() }, Receiver { data })
}
