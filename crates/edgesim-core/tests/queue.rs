use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker;

use edgesim_core::{Simulation, UnboundedQueue};

#[test]
fn test_items_are_taken_in_put_order() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("consumer");
    let queue = Rc::new(sim.create_queue::<u32, _>("queue"));
    let received = Rc::new(RefCell::new(Vec::new()));

    for i in 0..5 {
        queue.put(i);
    }
    assert_eq!(queue.len(), 5);

    let consumer_queue = queue.clone();
    let result = received.clone();
    sim.spawn(async move {
        for _ in 0..5 {
            let item = consumer_queue.take().await;
            result.borrow_mut().push((item, ctx.time()));
        }
    });
    sim.step_until_no_events();

    assert_eq!(*received.borrow(), vec![(0, 0.), (1, 0.), (2, 0.), (3, 0.), (4, 0.)]);
    assert!(queue.is_empty());
}

#[test]
fn test_consumer_wakes_up_at_put_time() {
    let mut sim = Simulation::new(123);
    let producer_ctx = sim.create_context("producer");
    let consumer_ctx = sim.create_context("consumer");
    let queue = Rc::new(UnboundedQueue::new());
    let received = Rc::new(RefCell::new(Vec::new()));

    let producer_queue = queue.clone();
    sim.spawn(async move {
        for i in 1..=3 {
            producer_ctx.sleep(10.).await;
            producer_queue.put(i);
        }
    });
    let result = received.clone();
    sim.spawn(async move {
        loop {
            let item = queue.take().await;
            result.borrow_mut().push((item, consumer_ctx.time()));
        }
    });
    sim.step_until_no_events();

    assert_eq!(*received.borrow(), vec![(1, 10.), (2, 20.), (3, 30.)]);
}

#[test]
fn test_waiting_consumers_are_served_in_arrival_order() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("comp");
    let queue = Rc::new(UnboundedQueue::new());
    let served = Rc::new(RefCell::new(Vec::new()));

    for consumer in 0..3 {
        let queue = queue.clone();
        let served = served.clone();
        sim.spawn(async move {
            let item: u32 = queue.take().await;
            served.borrow_mut().push((consumer, item));
        });
    }
    sim.step();
    assert_eq!(queue.waiting_consumers(), 3);

    let producer_queue = queue.clone();
    sim.spawn(async move {
        ctx.sleep(1.).await;
        for item in 10..13 {
            producer_queue.put(item);
        }
    });
    sim.step_until_no_events();

    assert_eq!(*served.borrow(), vec![(0, 10), (1, 11), (2, 12)]);
    assert_eq!(queue.waiting_consumers(), 0);
}

#[test]
fn test_abandoned_take_returns_item_to_queue() {
    let queue = UnboundedQueue::new();
    let waker = noop_waker();
    let mut async_ctx = Context::from_waker(&waker);

    let mut take = Box::pin(queue.take());
    assert!(take.as_mut().poll(&mut async_ctx).is_pending());
    assert_eq!(queue.waiting_consumers(), 1);

    // the item is handed over to the waiting consumer which is then dropped without polling
    queue.put(7);
    queue.put(8);
    assert_eq!(queue.len(), 1);
    drop(take);

    assert_eq!(queue.len(), 2);
    let mut take = Box::pin(queue.take());
    assert_eq!(take.as_mut().poll(&mut async_ctx), Poll::Ready(7));
}

#[test]
fn test_waiting_consumer_is_released_with_simulation() {
    let mut sim = Simulation::new(123);
    let queue = Rc::new(sim.create_queue::<u32, _>("mailbox"));

    // the consumer owns the queue it waits on
    let consumer = queue.clone();
    sim.spawn(async move {
        loop {
            let _ = consumer.take().await;
        }
    });
    sim.step_until_no_events();
    assert_eq!(queue.waiting_consumers(), 1);

    let weak_queue = Rc::downgrade(&queue);
    drop(queue);
    assert!(weak_queue.upgrade().is_some());

    drop(sim);
    assert!(weak_queue.upgrade().is_none());
}
