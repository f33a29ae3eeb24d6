use std::cell::RefCell;
use std::rc::Rc;

use edgesim::{DataMessage, GaussianParams, LinkConfig, Transmission, SIGNAL_SPEED_KM_PER_MS};
use edgesim_core::Simulation;

fn make_link(sim: &mut Simulation, distance: GaussianParams, weak_network: bool) -> Rc<Transmission> {
    let ctx = sim.create_context("link");
    Rc::new(Transmission::new(LinkConfig::new(distance, weak_network), ctx).unwrap())
}

#[test]
fn test_robust_link_latency_mean_converges() {
    let mut sim = Simulation::new(42);
    let distance = GaussianParams::new(500., 50.);
    let link = make_link(&mut sim, distance, false);
    let n = 20_000;

    for i in 0..n {
        link.send(DataMessage::new(0.01, i as f64, i as f64));
    }
    let latencies = Rc::new(RefCell::new(Vec::with_capacity(n)));
    let receiver = link.clone();
    let result = latencies.clone();
    sim.spawn(async move {
        for _ in 0..n {
            let message = receiver.receive().await;
            assert!(message.distance_traveled().unwrap() >= 0.);
            assert!(message.latency_acquired().unwrap() >= 0.);
            result.borrow_mut().push(message.latency_acquired().unwrap());
        }
    });
    sim.step_until_no_events();

    let latencies = latencies.borrow();
    assert_eq!(latencies.len(), n);
    let mean = latencies.iter().sum::<f64>() / n as f64;
    // truncation at zero is negligible for both distributions here
    let expected = distance.mean / SIGNAL_SPEED_KM_PER_MS + 3.;
    // std of a single latency is about 1.2 ms
    assert!((mean - expected).abs() < 0.05, "mean {} expected {}", mean, expected);
    assert!((link.config().expected_latency() - expected).abs() < 1e-12);
}

#[test]
fn test_weak_link_reorders_messages() {
    let mut sim = Simulation::new(42);
    let link = make_link(&mut sim, GaussianParams::new(20., 8.), true);

    // payload size is used as the sequence number
    for seq in 0..100 {
        link.send(DataMessage::new(seq as f64, 0., 0.));
    }
    let arrivals = Rc::new(RefCell::new(Vec::new()));
    let receiver = link.clone();
    let result = arrivals.clone();
    sim.spawn(async move {
        loop {
            let message = receiver.receive().await;
            result.borrow_mut().push(message.megabytes() as u32);
        }
    });
    sim.step_until_no_events();

    let arrivals = arrivals.borrow();
    assert_eq!(arrivals.len(), 100);
    assert!(arrivals.windows(2).any(|w| w[0] > w[1]), "no reordering observed");

    let mut sorted = arrivals.clone();
    sorted.sort();
    assert_eq!(sorted, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_delivered_messages_wait_for_receiver() {
    let mut sim = Simulation::new(42);
    let link = make_link(&mut sim, GaussianParams::new(20., 8.), false);
    for _ in 0..3 {
        link.send(DataMessage::new(0.1, 0., 0.));
    }
    sim.step_until_no_events();

    assert_eq!(link.sent_count(), 3);
    assert_eq!(link.pending_len(), 3);
}

#[test]
fn test_same_seed_same_delays() {
    let sample = |seed| {
        let mut sim = Simulation::new(seed);
        let link = make_link(&mut sim, GaussianParams::new(300., 100.), true);
        (0..10).map(|_| link.sample_distance_and_delay()).collect::<Vec<_>>()
    };
    assert_eq!(sample(1), sample(1));
    assert_ne!(sample(1), sample(2));
}
