//! Scale decision derived from the pending estimate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale recommendation for one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    ScaleUp,
    ScaleDown,
    NoOp,
}

impl Decision {
    /// Human readable text used in cycle logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::ScaleUp => "scale up",
            Decision::ScaleDown => "scale down",
            Decision::NoOp => "nothing to do",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Estimates strictly above this recommend scaling up
    pub scale_up_above: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { scale_up_above: 10 }
    }
}

/// Classify a pending estimate
pub fn classify(pending: u64, thresholds: &Thresholds) -> Decision {
    if pending > thresholds.scale_up_above {
        Decision::ScaleUp
    } else if pending == 0 {
        Decision::ScaleDown
    } else {
        Decision::NoOp
    }
}
