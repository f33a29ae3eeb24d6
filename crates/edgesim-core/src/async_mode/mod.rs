//! Asynchronous programming support.

pub mod queue;
pub mod resource;
pub mod timer_future;

pub(crate) mod channel;
pub(crate) mod executor;
pub(crate) mod task;
pub(crate) mod waker;
