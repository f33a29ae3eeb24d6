#![doc = include_str!("../readme.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod experiment;
pub mod message;
pub mod processing_unit;
pub mod random;
pub mod result_container;
pub mod stats;
pub mod tier;
pub mod transmission;

pub use client::{ClientConfig, DataProducer, DataReader, ReadTarget};
pub use config::{ExperimentConfig, RunConfig, TopologyConfig};
pub use error::SimError;
pub use experiment::{Experiment, RunSetup};
pub use message::DataMessage;
pub use processing_unit::{LinkStage, OnProcessingEnded, ProcessingUnit, ProcessingUnitConfig, UnitCounters};
pub use random::{GaussianParams, PositiveGaussian};
pub use result_container::{ResultContainer, Summary};
pub use stats::SampleMetric;
pub use tier::Tier;
pub use transmission::{LinkConfig, Transmission, SIGNAL_SPEED_KM_PER_MS};
