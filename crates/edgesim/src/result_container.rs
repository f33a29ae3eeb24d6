//! Latency and traffic statistics of a simulation run.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::SimError;
use crate::stats::SampleMetric;

/// Maximum allowed difference in ms between the average total latency
/// and the sum of average per-stage latencies.
pub const ADDITIVITY_TOLERANCE_MS: f64 = 0.5;

/// Accumulates samples reported by clients and processing units during one run.
///
/// One instance is created per run and shared by all components of that run.
#[derive(Debug, Default)]
pub struct ResultContainer {
    simulation_name: String,
    simulation_type: String,
    produced: u64,
    first_link_latency: SampleMetric,
    first_processing_latency: SampleMetric,
    second_link_latency: SampleMetric,
    second_processing_latency: SampleMetric,
    total_latency: SampleMetric,
    first_link_traffic_distance: SampleMetric,
    second_link_traffic_distance: SampleMetric,
    first_link_distance: SampleMetric,
    second_link_distance: SampleMetric,
}

impl ResultContainer {
    pub fn new<S: Into<String>, T: Into<String>>(simulation_name: S, simulation_type: T) -> Self {
        Self {
            simulation_name: simulation_name.into(),
            simulation_type: simulation_type.into(),
            ..Default::default()
        }
    }

    pub fn simulation_name(&self) -> &str {
        &self.simulation_name
    }

    pub fn simulation_type(&self) -> &str {
        &self.simulation_type
    }

    // Reporting -------------------------------------------------------------------------------------------------------

    pub fn report_produced(&mut self) {
        self.produced += 1;
    }

    /// Records a message arrival over a first link (client to first processing unit).
    pub fn report_first_link(&mut self, latency: f64, traffic_mb: f64, distance_km: f64) {
        self.first_link_latency.add(latency);
        self.first_link_traffic_distance.add(traffic_mb * distance_km);
        self.first_link_distance.add(distance_km);
    }

    pub fn report_first_processing(&mut self, latency: f64) {
        self.first_processing_latency.add(latency);
    }

    /// Records a message arrival over a second link (first processing unit to aggregator).
    pub fn report_second_link(&mut self, latency: f64, traffic_mb: f64, distance_km: f64) {
        self.second_link_latency.add(latency);
        self.second_link_traffic_distance.add(traffic_mb * distance_km);
        self.second_link_distance.add(distance_km);
    }

    pub fn report_second_processing(&mut self, latency: f64) {
        self.second_processing_latency.add(latency);
    }

    /// Records the end-to-end latency of a message that reached its final unit.
    pub fn report_terminal(&mut self, latency: f64) {
        self.total_latency.add(latency);
    }

    // Accessors -------------------------------------------------------------------------------------------------------

    pub fn produced(&self) -> u64 {
        self.produced
    }

    pub fn first_link_latency(&self) -> &SampleMetric {
        &self.first_link_latency
    }

    pub fn first_processing_latency(&self) -> &SampleMetric {
        &self.first_processing_latency
    }

    pub fn second_link_latency(&self) -> &SampleMetric {
        &self.second_link_latency
    }

    pub fn second_processing_latency(&self) -> &SampleMetric {
        &self.second_processing_latency
    }

    pub fn total_latency(&self) -> &SampleMetric {
        &self.total_latency
    }

    pub fn average_total_latency(&self) -> f64 {
        self.total_latency.mean()
    }

    pub fn average_total_latency_confidence(&self) -> f64 {
        self.total_latency.confidence_half_width()
    }

    /// Sum of average per-stage latencies.
    pub fn average_stage_latency_sum(&self) -> f64 {
        self.first_link_latency.mean()
            + self.first_processing_latency.mean()
            + self.second_link_latency.mean()
            + self.second_processing_latency.mean()
    }

    /// Total of (traffic in MB) * (distance in km) over first links.
    pub fn total_first_link_traffic_distance(&self) -> f64 {
        self.first_link_traffic_distance.sum()
    }

    pub fn total_second_link_traffic_distance(&self) -> f64 {
        self.second_link_traffic_distance.sum()
    }

    pub fn average_first_link_distance(&self) -> f64 {
        self.first_link_distance.mean()
    }

    pub fn average_second_link_distance(&self) -> f64 {
        self.second_link_distance.mean()
    }

    // Summary ---------------------------------------------------------------------------------------------------------

    /// Checks that the average total latency matches the sum of average per-stage latencies.
    ///
    /// Holds only for linear topologies: when a unit fans out to several aggregators,
    /// one produced message yields several terminal samples and the check must be skipped.
    pub fn check_additivity(&self) -> Result<(), SimError> {
        let expected = self.average_total_latency();
        let actual = self.average_stage_latency_sum();
        if (expected - actual).abs() < ADDITIVITY_TOLERANCE_MS {
            Ok(())
        } else {
            Err(SimError::InvariantViolation {
                expected,
                actual,
                tolerance: ADDITIVITY_TOLERANCE_MS,
            })
        }
    }

    pub fn summary(&self, check_additivity: bool) -> Result<Summary, SimError> {
        if check_additivity {
            self.check_additivity()?;
        }
        Ok(Summary {
            name: self.simulation_name.clone(),
            simulation_type: self.simulation_type.clone(),
            produced: self.produced,
            first_link_count: self.first_link_latency.len(),
            first_processing_count: self.first_processing_latency.len(),
            second_link_count: self.second_link_latency.len(),
            second_processing_count: self.second_processing_latency.len(),
            total_finished_count: self.total_latency.len(),
            average_total_latency: self.average_total_latency(),
            total_latency_confidence: self.average_total_latency_confidence(),
            average_first_link_latency: self.first_link_latency.mean(),
            average_first_processing_latency: self.first_processing_latency.mean(),
            average_second_link_latency: self.second_link_latency.mean(),
            average_second_processing_latency: self.second_processing_latency.mean(),
            total_first_link_traffic_distance: self.total_first_link_traffic_distance(),
            total_second_link_traffic_distance: self.total_second_link_traffic_distance(),
            average_first_link_distance: self.average_first_link_distance(),
            average_second_link_distance: self.average_second_link_distance(),
        })
    }

    pub fn print_summary(&self, check_additivity: bool) -> Result<(), SimError> {
        println!("{}", self.summary(check_additivity)?);
        Ok(())
    }
}

/// Final statistics of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub name: String,
    pub simulation_type: String,
    pub produced: u64,
    pub first_link_count: usize,
    pub first_processing_count: usize,
    pub second_link_count: usize,
    pub second_processing_count: usize,
    pub total_finished_count: usize,
    pub average_total_latency: f64,
    /// Half-width of the 99.9% confidence interval of the average total latency.
    pub total_latency_confidence: f64,
    pub average_first_link_latency: f64,
    pub average_first_processing_latency: f64,
    pub average_second_link_latency: f64,
    pub average_second_processing_latency: f64,
    pub total_first_link_traffic_distance: f64,
    pub total_second_link_traffic_distance: f64,
    pub average_first_link_distance: f64,
    pub average_second_link_distance: f64,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Finished simulation {} ({}).", self.name, self.simulation_type)?;
        writeln!(
            f,
            "Created packages: {}, first link packages {}, first processed packages {}, \
             second link packages {}, second processed packages {}, total finished packages {}",
            self.produced,
            self.first_link_count,
            self.first_processing_count,
            self.second_link_count,
            self.second_processing_count,
            self.total_finished_count
        )?;
        writeln!(
            f,
            "Average total latency: {:.3} ± {:.3}",
            self.average_total_latency, self.total_latency_confidence
        )?;
        writeln!(f, "Average first link latency: {:.3}", self.average_first_link_latency)?;
        writeln!(f, "Average first processing latency: {:.3}", self.average_first_processing_latency)?;
        writeln!(f, "Average second link latency: {:.3}", self.average_second_link_latency)?;
        writeln!(f, "Average second processing latency: {:.3}", self.average_second_processing_latency)?;
        writeln!(f)?;
        writeln!(
            f,
            "Total first link traffic per distance: {:.3}",
            self.total_first_link_traffic_distance
        )?;
        writeln!(
            f,
            "Total second link traffic per distance: {:.3}",
            self.total_second_link_traffic_distance
        )?;
        writeln!(f, "Average first link distance: {:.3}", self.average_first_link_distance)?;
        write!(f, "Average second link distance: {:.3}", self.average_second_link_distance)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_empty_container_reports_zeros() {
        let results = ResultContainer::new("empty", "edge");
        assert_eq!(results.average_total_latency(), 0.);
        assert_eq!(results.average_total_latency_confidence(), 0.);
        assert_eq!(results.average_first_link_distance(), 0.);
        assert_eq!(results.total_second_link_traffic_distance(), 0.);

        let summary = results.summary(true).unwrap();
        assert_eq!(summary.total_finished_count, 0);
        assert_eq!(summary.average_second_processing_latency, 0.);
    }

    #[test]
    fn test_traffic_distance_is_accumulated_per_link() {
        let mut results = ResultContainer::new("chain", "edge");
        results.report_first_link(20., 0.5, 10.);
        results.report_first_link(30., 0.25, 40.);
        results.report_second_link(5., 0.01, 100.);

        assert_abs_diff_eq!(results.total_first_link_traffic_distance(), 15., epsilon = 1e-12);
        assert_abs_diff_eq!(results.total_second_link_traffic_distance(), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(results.average_first_link_distance(), 25., epsilon = 1e-12);
        assert_abs_diff_eq!(results.average_second_link_distance(), 100., epsilon = 1e-12);
    }

    #[test]
    fn test_additivity_check() {
        let mut results = ResultContainer::new("chain", "edge");
        results.report_first_link(10., 0.4, 20.);
        results.report_first_processing(7.);
        results.report_second_link(5., 0.01, 50.);
        results.report_second_processing(3.);
        results.report_terminal(25.2);
        assert!(results.summary(true).is_ok());

        // a second terminal sample for the same message breaks the sum
        results.report_terminal(40.);
        match results.summary(true) {
            Err(SimError::InvariantViolation {
                expected,
                actual,
                tolerance,
            }) => {
                assert_abs_diff_eq!(expected, 32.6, epsilon = 1e-9);
                assert_abs_diff_eq!(actual, 25., epsilon = 1e-9);
                assert_eq!(tolerance, ADDITIVITY_TOLERANCE_MS);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(results.summary(false).is_ok());

        assert!(matches!(
            results.print_summary(true),
            Err(SimError::InvariantViolation { .. })
        ));
        assert!(results.print_summary(false).is_ok());
    }

    #[test]
    fn test_summary_display() {
        let mut results = ResultContainer::new("Cloud solution", "cloud");
        results.report_produced();
        results.report_first_link(80., 0.4, 5000.);
        results.report_first_processing(25.);
        results.report_terminal(105.);

        let text = results.summary(true).unwrap().to_string();
        assert!(text.starts_with("Finished simulation Cloud solution (cloud)."));
        assert!(text.contains("Created packages: 1, first link packages 1"));
        assert!(text.contains("Average total latency: 105.000"));
        assert!(text.contains("Total first link traffic per distance: 2000.000"));
    }
}
