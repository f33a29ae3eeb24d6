//! Bounded pool of identical resource units (e.g. processor cores).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Counting semaphore with strictly FIFO acquisition.
///
/// A unit is granted immediately only if one is free and nobody is queued before the caller,
/// otherwise the request waits until earlier requests are served and a unit is released.
/// Units are released by dropping the [`ResourceGuard`] returned from [`acquire`](Self::acquire).
pub struct Resource {
    state: Rc<RefCell<ResourceState>>,
}

struct ResourceState {
    capacity: u32,
    in_use: u32,
    waiters: VecDeque<Rc<RefCell<Waiter>>>,
}

struct Waiter {
    granted: bool,
    waker: Option<Waker>,
}

impl ResourceState {
    // Passes the unit to the first waiter or returns it to the pool.
    fn release(&mut self) -> Option<Waker> {
        if let Some(waiter) = self.waiters.pop_front() {
            let mut waiter = waiter.borrow_mut();
            waiter.granted = true;
            waiter.waker.take()
        } else {
            debug_assert!(self.in_use > 0, "released more units than acquired");
            self.in_use -= 1;
            None
        }
    }
}

fn release(state: &Rc<RefCell<ResourceState>>) {
    let waker = state.borrow_mut().release();
    if let Some(waker) = waker {
        waker.wake();
    }
}

impl Resource {
    /// Creates a resource with the given number of units.
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: u32) -> Self {
        assert!(capacity > 0, "Resource capacity must be positive");
        Self {
            state: Rc::new(RefCell::new(ResourceState {
                capacity,
                in_use: 0,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Requests one unit. The returned future completes when the unit is granted.
    pub fn acquire(&self) -> AcquireFuture {
        AcquireFuture {
            state: self.state.clone(),
            waiter: None,
            done: false,
        }
    }

    /// Total number of units.
    pub fn capacity(&self) -> u32 {
        self.state.borrow().capacity
    }

    /// Number of units currently held.
    pub fn in_use(&self) -> u32 {
        self.state.borrow().in_use
    }

    /// Number of free units.
    pub fn available(&self) -> u32 {
        let state = self.state.borrow();
        state.capacity - state.in_use
    }

    /// Number of requests waiting for a unit.
    pub fn queue_len(&self) -> usize {
        self.state.borrow().waiters.len()
    }
}

/// Future returned by [`Resource::acquire`].
pub struct AcquireFuture {
    state: Rc<RefCell<ResourceState>>,
    waiter: Option<Rc<RefCell<Waiter>>>,
    done: bool,
}

impl Future for AcquireFuture {
    type Output = ResourceGuard;

    fn poll(mut self: Pin<&mut Self>, async_ctx: &mut Context) -> Poll<ResourceGuard> {
        if let Some(waiter) = self.waiter.clone() {
            let mut waiter = waiter.borrow_mut();
            if !waiter.granted {
                waiter.waker = Some(async_ctx.waker().clone());
                return Poll::Pending;
            }
        } else {
            let mut state = self.state.borrow_mut();
            if !state.waiters.is_empty() || state.in_use == state.capacity {
                let waiter = Rc::new(RefCell::new(Waiter {
                    granted: false,
                    waker: Some(async_ctx.waker().clone()),
                }));
                state.waiters.push_back(waiter.clone());
                drop(state);
                self.waiter = Some(waiter);
                return Poll::Pending;
            }
            state.in_use += 1;
        }
        self.done = true;
        Poll::Ready(ResourceGuard {
            state: self.state.clone(),
        })
    }
}

impl Drop for AcquireFuture {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let Some(waiter) = self.waiter.take() else {
            return;
        };
        let granted = waiter.borrow().granted;
        if granted {
            release(&self.state);
        } else {
            self.state
                .borrow_mut()
                .waiters
                .retain(|other| !Rc::ptr_eq(other, &waiter));
        }
    }
}

/// Unit of a [`Resource`] held by the owner. Dropping the guard releases the unit.
pub struct ResourceGuard {
    state: Rc<RefCell<ResourceState>>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        release(&self.state);
    }
}
