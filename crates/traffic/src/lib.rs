//! Synthetic conversion traffic for exercising the relay end to end.

pub mod catalog;
pub mod generator;

pub use generator::{
    EventProgress, TrafficGenerator, TrafficOptions, TrafficSummary, TRAFFIC_SOURCE,
};
