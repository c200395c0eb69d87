//! Drone Scaler - turns a CI server's pending-jobs gauge into scale recommendations
//!
//! The service polls a Prometheus text exposition endpoint, extracts the
//! `drone_pending_jobs` gauge, folds each reading into a hysteretic pending-work
//! estimate and classifies that estimate as scale up, scale down or nothing to do.
//! Recommendations are only logged; no scale action is executed.

pub mod accumulator;
pub mod client;
pub mod config;
pub mod decision;
pub mod exposition;
pub mod metrics;
pub mod poller;

pub use accumulator::{Accumulator, IncrementPolicy};
pub use client::{FetchError, HttpMetricsClient, MetricsSource};
pub use config::Config;
pub use decision::{Decision, Thresholds};
pub use exposition::{ExpositionError, MetricFamily};
pub use metrics::{Metrics, MetricsSnapshot};
pub use poller::{CycleError, CycleOutcome, Poller};
