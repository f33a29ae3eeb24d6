//! Queue for producer-consumer communication between asynchronous tasks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Unbounded multi-producer multi-consumer queue with blocking receives.
///
/// [`put`](Self::put) never suspends. [`take`](Self::take) returns a future that completes with the first
/// available item. Consumers that are waiting on an empty queue are served in the order they started waiting.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use edgesim_core::{Simulation, UnboundedQueue};
///
/// let mut sim = Simulation::new(123);
/// let ctx = sim.create_context("comp");
/// let queue = Rc::new(UnboundedQueue::new());
///
/// let producer = queue.clone();
/// let producer_ctx = ctx.clone();
/// sim.spawn(async move {
///     producer_ctx.sleep(5.).await;
///     producer.put("hello");
/// });
/// sim.spawn(async move {
///     assert_eq!(queue.take().await, "hello");
///     assert_eq!(ctx.time(), 5.);
/// });
/// sim.step_until_no_events();
/// ```
pub struct UnboundedQueue<T> {
    state: Rc<RefCell<QueueState<T>>>,
}

struct QueueState<T> {
    items: VecDeque<T>,
    consumers: VecDeque<Rc<RefCell<ConsumerSlot<T>>>>,
}

struct ConsumerSlot<T> {
    item: Option<T>,
    waker: Option<Waker>,
}

impl<T> QueueState<T> {
    // Hands the item to the longest waiting consumer, if any.
    // Returns the waker to call once the state borrow is released.
    fn hand_over(&mut self, item: T, front: bool) -> Option<Waker> {
        if let Some(consumer) = self.consumers.pop_front() {
            let mut slot = consumer.borrow_mut();
            slot.item = Some(item);
            slot.waker.take()
        } else {
            if front {
                self.items.push_front(item);
            } else {
                self.items.push_back(item);
            }
            None
        }
    }
}

impl<T> Default for UnboundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UnboundedQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(QueueState {
                items: VecDeque::new(),
                consumers: VecDeque::new(),
            })),
        }
    }

    /// Puts an item to the queue without blocking.
    pub fn put(&self, item: T) {
        let waker = self.state.borrow_mut().hand_over(item, false);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Asynchronously takes an item from the queue.
    pub fn take(&self) -> TakeFuture<T> {
        TakeFuture {
            queue: self.state.clone(),
            slot: None,
            done: false,
        }
    }

    /// Returns the number of buffered items, i.e. delivered but not yet taken.
    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// Returns `true` if no item is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of consumers waiting for an item.
    pub fn waiting_consumers(&self) -> usize {
        self.state.borrow().consumers.len()
    }
}

/// Future returned by [`UnboundedQueue::take`].
pub struct TakeFuture<T> {
    queue: Rc<RefCell<QueueState<T>>>,
    slot: Option<Rc<RefCell<ConsumerSlot<T>>>>,
    done: bool,
}

impl<T> Future for TakeFuture<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<T> {
        if let Some(slot) = self.slot.clone() {
            let mut slot = slot.borrow_mut();
            return match slot.item.take() {
                Some(item) => {
                    self.done = true;
                    Poll::Ready(item)
                }
                None => {
                    slot.waker = Some(async_ctx.waker().clone());
                    Poll::Pending
                }
            };
        }

        let mut queue = self.queue.borrow_mut();
        if let Some(item) = queue.items.pop_front() {
            drop(queue);
            self.done = true;
            return Poll::Ready(item);
        }
        let slot = Rc::new(RefCell::new(ConsumerSlot {
            item: None,
            waker: Some(async_ctx.waker().clone()),
        }));
        queue.consumers.push_back(slot.clone());
        drop(queue);
        self.slot = Some(slot);
        Poll::Pending
    }
}

impl<T> Drop for TakeFuture<T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let Some(slot) = self.slot.take() else {
            return;
        };
        let undelivered = slot.borrow_mut().item.take();
        let waker = {
            let mut queue = self.queue.borrow_mut();
            match undelivered {
                // the item was handed over but never consumed: give it back in its original position
                Some(item) => queue.hand_over(item, true),
                None => {
                    queue.consumers.retain(|other| !Rc::ptr_eq(other, &slot));
                    None
                }
            }
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}
