//! Poll loop: fetch, extract, accumulate, classify, report

use crate::accumulator::Accumulator;
use crate::client::{FetchError, MetricsSource};
use crate::config::Config;
use crate::decision::{self, Decision, Thresholds};
use crate::exposition::{self, ExpositionError};
use crate::metrics::Metrics;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest wait between cycles; a zero interval is raised to this
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Why a cycle produced no decision
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Exposition(#[from] ExpositionError),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Fetch(e) => e.kind(),
            CycleError::Exposition(e) => e.kind(),
        }
    }
}

/// Result of one poll cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Decided {
        reading: u64,
        pending: u64,
        decision: Decision,
    },
    /// Accumulator left unchanged
    Skipped { error: CycleError },
}

impl CycleOutcome {
    pub fn decision(&self) -> Option<Decision> {
        match self {
            CycleOutcome::Decided { decision, .. } => Some(*decision),
            CycleOutcome::Skipped { .. } => None,
        }
    }
}

/// Drives the fetch-and-decide cycle and owns the accumulator
pub struct Poller<S: MetricsSource> {
    source: S,
    metric_name: String,
    interval: Duration,
    thresholds: Thresholds,
    accumulator: Accumulator,
    metrics: Metrics,
}

impl<S: MetricsSource> Poller<S> {
    /// Create a new poller from configuration
    pub fn new(config: &Config, source: S, metrics: Metrics) -> Self {
        Self {
            source,
            metric_name: config.metric_name.clone(),
            interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            thresholds: config.thresholds(),
            accumulator: Accumulator::new(config.increment_policy),
            metrics,
        }
    }

    /// Replace the starting accumulator
    pub fn with_accumulator(mut self, accumulator: Accumulator) -> Self {
        self.accumulator = accumulator;
        self
    }

    pub fn pending(&self) -> u64 {
        self.accumulator.pending()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one cycle to completion and report it
    pub async fn step(&mut self) -> CycleOutcome {
        let outcome = match self.sample().await {
            Ok(reading) => {
                let pending = self.accumulator.update(reading);
                let decision = decision::classify(pending, &self.thresholds);
                CycleOutcome::Decided {
                    reading,
                    pending,
                    decision,
                }
            }
            Err(error) => CycleOutcome::Skipped { error },
        };

        self.report(&outcome);
        outcome
    }

    async fn sample(&self) -> Result<u64, CycleError> {
        let body = self.source.fetch().await?;
        let reading = exposition::queue_depth(&body, &self.metric_name)?;
        Ok(reading)
    }

    fn report(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Decided {
                reading,
                pending,
                decision,
            } => {
                info!(
                    reading = reading,
                    pending = pending,
                    decision = %decision,
                    "Cumulative pending jobs: {}, {}",
                    pending,
                    decision
                );
                self.metrics.record_decision(*decision, *reading, *pending);
            }
            CycleOutcome::Skipped {
                error: error @ CycleError::Exposition(ExpositionError::MetricNotFound { .. }),
            } => {
                warn!(
                    metric = %self.metric_name,
                    pending = self.accumulator.pending(),
                    "Metric missing from exposition, skipping cycle"
                );
                self.metrics.record_skipped(error.kind());
            }
            CycleOutcome::Skipped { error } => {
                warn!(
                    error_kind = error.kind(),
                    error = %error,
                    pending = self.accumulator.pending(),
                    "Poll cycle failed, skipping"
                );
                self.metrics.record_skipped(error.kind());
            }
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(pending = self.accumulator.pending(), "Shutdown requested, stopping poll loop");
                    return;
                }
                _ = ticker.tick() => {
                    let outcome = self.step().await;
                    debug!(decision = ?outcome.decision(), "Poll cycle complete");
                }
            }
        }
    }

    /// Poll forever
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await
    }
}
