use std::cell::RefCell;
use std::rc::Rc;

use edgesim_core::Simulation;

#[test]
fn test_step_until_time_stops_at_cutoff() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("ticker");
    let ticks = Rc::new(RefCell::new(Vec::new()));

    let result = ticks.clone();
    sim.spawn(async move {
        loop {
            ctx.sleep(3.).await;
            result.borrow_mut().push(ctx.time());
        }
    });

    assert!(sim.step_until_time(10.));
    assert_eq!(sim.time(), 10.);
    assert_eq!(*ticks.borrow(), vec![3., 6., 9.]);

    // a timer exactly at the cutoff is fired
    assert!(sim.step_until_time(12.));
    assert_eq!(*ticks.borrow(), vec![3., 6., 9., 12.]);

    assert!(sim.step_for_duration(5.));
    assert_eq!(sim.time(), 17.);
    assert_eq!(ticks.borrow().len(), 5);
}

#[test]
fn test_step_until_time_without_events_advances_clock() {
    let mut sim = Simulation::new(123);
    assert!(!sim.step_until_time(100.));
    assert_eq!(sim.time(), 100.);
    assert!(!sim.step());
}

#[test]
fn test_steps() {
    let mut sim = Simulation::new(123);
    let ctx = sim.create_context("comp");
    sim.spawn(async move {
        for _ in 0..3 {
            ctx.sleep(1.).await;
        }
    });

    // initial poll and two timers
    assert!(sim.steps(3));
    assert_eq!(sim.time(), 2.);
    assert!(!sim.steps(10));
    assert_eq!(sim.time(), 3.);
}

#[test]
fn test_nested_spawn_starts_at_current_time() {
    let mut sim = Simulation::new(123);
    let parent = sim.create_context("parent");
    let started = Rc::new(RefCell::new(Vec::new()));

    let result = started.clone();
    sim.spawn(async move {
        for i in 0..3 {
            parent.sleep(2.).await;
            let child = parent.clone();
            let result = result.clone();
            parent.spawn(async move {
                result.borrow_mut().push((i, child.time()));
                child.sleep(100.).await;
            });
        }
    });
    sim.step_until_time(50.);

    assert_eq!(*started.borrow(), vec![(0, 2.), (1, 4.), (2, 6.)]);
    assert_eq!(sim.lookup_id("parent"), Some(0));
    assert_eq!(sim.lookup_name(0), "parent");
}
