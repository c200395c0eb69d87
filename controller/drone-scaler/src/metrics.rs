//! Cycle statistics for drone scaler
//!
//! NOTE: there is no Prometheus exporter; every record call emits a structured
//! log event and bumps an in-process counter. The binary logs a final
//! [`MetricsSnapshot`] on shutdown.

use crate::decision::Decision;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Default)]
struct Counters {
    cycles: AtomicU64,
    scale_up: AtomicU64,
    scale_down: AtomicU64,
    no_op: AtomicU64,
    last_reading: AtomicU64,
    last_pending: AtomicU64,
    skipped: Mutex<BTreeMap<&'static str, u64>>,
    last_decision_at: Mutex<Option<DateTime<Utc>>>,
}

/// Metrics collector for drone scaler
#[derive(Clone, Default)]
pub struct Metrics {
    counters: Arc<Counters>,
}

/// Point-in-time copy of the collected statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub scale_up: u64,
    pub scale_down: u64,
    pub no_op: u64,
    pub skipped: BTreeMap<String, u64>,
    pub last_reading: u64,
    pub last_pending: u64,
    pub last_decision_at: Option<DateTime<Utc>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cycle that produced a decision
    pub fn record_decision(&self, decision: Decision, reading: u64, pending: u64) {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        let counter = match decision {
            Decision::ScaleUp => &self.counters.scale_up,
            Decision::ScaleDown => &self.counters.scale_down,
            Decision::NoOp => &self.counters.no_op,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.counters.last_reading.store(reading, Ordering::Relaxed);
        self.counters.last_pending.store(pending, Ordering::Relaxed);
        if let Ok(mut at) = self.counters.last_decision_at.lock() {
            *at = Some(Utc::now());
        }

        debug!(
            decision = %decision,
            reading = reading,
            pending = pending,
            "Recorded scale decision"
        );
    }

    /// Record a cycle skipped because of a fetch or parse error
    pub fn record_skipped(&self, error_kind: &'static str) {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut skipped) = self.counters.skipped.lock() {
            *skipped.entry(error_kind).or_insert(0) += 1;
        }
        debug!(error_kind = error_kind, "Recorded skipped cycle");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        let skipped = c
            .skipped
            .lock()
            .map(|m| m.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();
        let last_decision_at = c.last_decision_at.lock().map(|at| *at).unwrap_or(None);

        MetricsSnapshot {
            cycles: c.cycles.load(Ordering::Relaxed),
            scale_up: c.scale_up.load(Ordering::Relaxed),
            scale_down: c.scale_down.load(Ordering::Relaxed),
            no_op: c.no_op.load(Ordering::Relaxed),
            skipped,
            last_reading: c.last_reading.load(Ordering::Relaxed),
            last_pending: c.last_pending.load(Ordering::Relaxed),
            last_decision_at,
        }
    }

    /// Log the current snapshot as a single JSON field
    pub fn log_summary(&self) {
        match serde_json::to_string(&self.snapshot()) {
            Ok(summary) => info!(summary = %summary, "Cycle statistics"),
            Err(e) => debug!(error = %e, "Failed to serialize cycle statistics"),
        }
    }
}
