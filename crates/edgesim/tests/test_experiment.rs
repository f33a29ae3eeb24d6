use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

use edgesim::{Experiment, ExperimentConfig, RunConfig, RunSetup, SimError, Tier, TopologyConfig};

fn small_run(name: &str, topology: TopologyConfig) -> RunConfig {
    let mut config = RunConfig::new(name, topology);
    config.clients = 30;
    config.unit_counts = BTreeMap::from([
        (Tier::District, 10),
        (Tier::City, 4),
        (Tier::Territory, 3),
        (Tier::Country, 2),
        (Tier::Continent, 2),
    ]);
    config
}

#[test]
fn test_two_tier_chain_finishes_every_message() {
    let mut config = small_run("central", TopologyConfig::EdgeAggregation { level: Tier::Central });
    config.packages_per_client = Some(2);
    let setup = RunSetup::build(&config).unwrap();
    assert_eq!(setup.units[&Tier::District].len(), 10);
    assert_eq!(setup.units[&Tier::Central].len(), 1);
    assert!(!setup.units.contains_key(&Tier::City));

    let results = setup.results.clone();
    let summary = setup.run().unwrap();
    assert_eq!(summary.name, "central");
    assert_eq!(summary.simulation_type, "edge");
    assert_eq!(summary.produced, 60);
    assert_eq!(summary.first_link_count, 60);
    assert_eq!(summary.second_processing_count, 60);
    assert_eq!(summary.total_finished_count, 60);
    assert!(summary.average_second_link_distance > 0.);
    assert!(results.borrow().check_additivity().is_ok());
}

#[test]
fn test_all_levels_fan_out_breaks_additivity() {
    let mut config = small_run("all levels", TopologyConfig::AllLevels);
    config.clients = 20;
    config.packages_per_client = Some(2);
    assert!(!config.check_additivity);

    let setup = RunSetup::build(&config).unwrap();
    let results = setup.results.clone();
    let summary = setup.run().unwrap();

    // only the central unit records total latency
    assert_eq!(summary.produced, 40);
    assert_eq!(summary.total_finished_count, 40);
    assert_eq!(summary.second_link_count, 5 * 40);
    assert_eq!(summary.second_processing_count, 5 * 40);
    assert!(matches!(
        results.borrow().check_additivity(),
        Err(SimError::InvariantViolation { .. })
    ));
}

#[test]
fn test_read_run_stops_at_duration() {
    let mut config = small_run(
        "read",
        TopologyConfig::ReadByProbabilities {
            probabilities: vec![0.5, 0.2, 0.1, 0.1, 0.05, 0.05],
        },
    );
    config.duration = Some(20000.);
    assert_eq!(config.packages_per_client, None);

    let setup = RunSetup::build(&config).unwrap();
    assert_eq!(setup.units.len(), Tier::ALL.len());
    let units = setup.units.clone();
    let summary = setup.run().unwrap();

    assert_eq!(summary.simulation_type, "read");
    assert!(summary.produced > 0);
    assert!(summary.total_finished_count as u64 <= summary.produced);
    assert_eq!(summary.second_link_count, 0);
    assert_eq!(summary.first_link_count, summary.first_processing_count + in_progress(&units));
}

// Requests received by units but not yet processed when the run was cut off.
fn in_progress(units: &BTreeMap<Tier, Vec<Rc<edgesim::ProcessingUnit>>>) -> usize {
    units
        .values()
        .flatten()
        .map(|unit| {
            let counters = unit.counters();
            (counters.received - counters.completed) as usize
        })
        .sum()
}

#[test]
fn test_same_seed_same_summary() {
    let mut config = small_run("cloud", TopologyConfig::Cloud);
    config.packages_per_client = Some(3);
    let first = RunSetup::build(&config).unwrap().run().unwrap();
    let second = RunSetup::build(&config).unwrap().run().unwrap();
    assert_eq!(first, second);

    config.seed = 321;
    let other = RunSetup::build(&config).unwrap().run().unwrap();
    assert_eq!(other.produced, first.produced);
    assert_ne!(other.average_total_latency, first.average_total_latency);
}

#[test]
fn test_experiment_runs_configured_runs_in_order() {
    let config = ExperimentConfig::from_str(
        r#"
runs:
  - name: city
    clients: 10
    packages_per_client: 1
    unit_counts:
      district: 4
      city: 2
    topology:
      type: edge_aggregation
      level: city
  - name: cloud
    clients: 10
    packages_per_client: 2
    topology:
      type: cloud
"#,
    )
    .unwrap();
    let summaries = Experiment::new(config).run().unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "city");
    assert_eq!(summaries[0].total_finished_count, 10);
    assert_eq!(summaries[1].name, "cloud");
    assert_eq!(summaries[1].simulation_type, "cloud");
    assert_eq!(summaries[1].total_finished_count, 20);
    assert_eq!(summaries[1].second_link_count, 0);
}

#[test]
fn test_invalid_run_is_rejected_before_start() {
    let mut config = small_run("district", TopologyConfig::EdgeAggregation { level: Tier::District });
    assert!(matches!(RunSetup::build(&config), Err(SimError::Configuration(_))));

    config.topology = TopologyConfig::Cloud;
    config.packages_per_client = None;
    config.duration = None;
    assert!(matches!(RunSetup::build(&config), Err(SimError::Configuration(_))));

    config.duration = Some(-1.);
    assert!(matches!(RunSetup::build(&config), Err(SimError::Configuration(_))));
}

#[test]
fn test_run_state_is_released_after_run() {
    let mut config = small_run("central", TopologyConfig::EdgeAggregation { level: Tier::Central });
    config.clients = 5;
    config.packages_per_client = Some(1);
    let setup = RunSetup::build(&config).unwrap();
    let results = Rc::downgrade(&setup.results);
    let district = Rc::downgrade(&setup.units[&Tier::District][0]);
    let central = Rc::downgrade(&setup.units[&Tier::Central][0]);

    let summary = setup.run().unwrap();
    assert_eq!(summary.total_finished_count, 5);
    assert!(results.upgrade().is_none());
    assert!(district.upgrade().is_none());
    assert!(central.upgrade().is_none());
}

#[test]
fn test_read_by_level_uses_only_target_tier() {
    let mut config = small_run("read city", TopologyConfig::ReadByLevel { level: Tier::City });
    config.duration = None;
    config.packages_per_client = Some(3);
    let setup = RunSetup::build(&config).unwrap();
    assert_eq!(setup.units.len(), 1);
    assert_eq!(setup.units[&Tier::City].len(), 4);
    let links: Vec<_> = setup.units[&Tier::City]
        .iter()
        .map(|unit| unit.incoming_transmission())
        .collect();

    let summary = setup.run().unwrap();
    assert_eq!(summary.simulation_type, "read");
    assert_eq!(summary.produced, 90);
    assert_eq!(summary.total_finished_count, 90);
    assert_eq!(summary.second_link_count, 0);
    // every reader is pinned to one unit, so each unit gets a multiple of the per-reader count
    let sent: Vec<u64> = links.iter().map(|link| link.sent_count()).collect();
    assert_eq!(sent.iter().sum::<u64>(), 90);
    assert!(sent.iter().all(|count| count % 3 == 0), "{:?}", sent);
}

#[test]
fn test_lower_bandwidth_raises_processing_latency() {
    let run = |bandwidth: Option<f64>| {
        let mut config = small_run("read district", TopologyConfig::ReadByLevel { level: Tier::District });
        config.duration = None;
        config.packages_per_client = Some(5);
        if let Some(bandwidth) = bandwidth {
            config.bandwidth.insert(Tier::District, bandwidth);
        }
        RunSetup::build(&config).unwrap().run().unwrap()
    };
    let default = run(None);
    let slow = run(Some(0.001));

    assert_eq!(default.total_finished_count, slow.total_finished_count);
    // read requests of about 0.01 MB take about 1 ms by default and 10 ms on the slow units
    assert!(
        slow.average_first_processing_latency > default.average_first_processing_latency + 5.,
        "slow {} default {}",
        slow.average_first_processing_latency,
        default.average_first_processing_latency
    );
    assert!(slow.average_total_latency > default.average_total_latency);

    let mut config = small_run("broken", TopologyConfig::Cloud);
    config.bandwidth.insert(Tier::Central, -1.);
    assert!(matches!(RunSetup::build(&config), Err(SimError::Configuration(_))));
}
