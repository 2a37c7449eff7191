use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::geodesy::haversine_distance;
use crate::types::FilteredEstimate;

/// Why the gate let an estimate through.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AcceptReason {
    /// Nothing accepted yet in this session
    FirstFix,
    /// Last accepted estimate is older than the max interval
    Stale { elapsed_secs: f64 },
    /// Moved at least the min distance from the last accepted estimate
    Moved { distance_m: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GateDecision {
    Accepted(AcceptReason),
    Rejected { distance_m: f64, elapsed_secs: f64 },
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub accepted: u64,
    pub rejected: u64,
    pub efficiency_ratio: f64,
}

/// Decides whether a filtered estimate is worth pushing to consumers.
///
/// Rules, first match wins:
///   1. nothing accepted yet            -> accept
///   2. elapsed > max_interval_secs     -> accept
///   3. distance >= min_distance_m      -> accept
///   4. otherwise                       -> reject
pub struct UpdateGate {
    config: GateConfig,
    last_accepted: Option<FilteredEstimate>,
    last_accepted_ts: f64,
    accepted: u64,
    rejected: u64,
}

impl UpdateGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_accepted: None,
            last_accepted_ts: f64::NEG_INFINITY,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn should_update(&mut self, estimate: &FilteredEstimate) -> bool {
        self.evaluate(estimate).is_accepted()
    }

    pub fn evaluate(&mut self, estimate: &FilteredEstimate) -> GateDecision {
        let Some(last) = self.last_accepted else {
            self.accept(estimate);
            return GateDecision::Accepted(AcceptReason::FirstFix);
        };

        let elapsed_secs = estimate.timestamp - self.last_accepted_ts;
        if elapsed_secs > self.config.max_interval_secs {
            self.accept(estimate);
            return GateDecision::Accepted(AcceptReason::Stale { elapsed_secs });
        }

        let distance_m = haversine_distance(
            last.latitude,
            last.longitude,
            estimate.latitude,
            estimate.longitude,
        );
        if distance_m >= self.config.min_distance_m {
            self.accept(estimate);
            return GateDecision::Accepted(AcceptReason::Moved { distance_m });
        }

        self.rejected += 1;
        log::trace!(
            "Gate rejected: moved {:.2}m in {:.2}s (min {:.2}m, max {:.2}s)",
            distance_m,
            elapsed_secs,
            self.config.min_distance_m,
            self.config.max_interval_secs
        );
        GateDecision::Rejected {
            distance_m,
            elapsed_secs,
        }
    }

    fn accept(&mut self, estimate: &FilteredEstimate) {
        self.last_accepted = Some(*estimate);
        // Out-of-order fixes may still be accepted on distance; keep time monotonic
        self.last_accepted_ts = self.last_accepted_ts.max(estimate.timestamp);
        self.accepted += 1;
    }

    /// Fraction of evaluated estimates that were rejected, 0 before any evaluation.
    pub fn efficiency_ratio(&self) -> f64 {
        let total = self.accepted + self.rejected;
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    pub fn last_accepted(&self) -> Option<FilteredEstimate> {
        self.last_accepted
    }

    /// Timestamp of the last accepted estimate, `None` before the first one
    pub fn last_accepted_timestamp(&self) -> Option<f64> {
        self.last_accepted.map(|_| self.last_accepted_ts)
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            accepted: self.accepted,
            rejected: self.rejected,
            efficiency_ratio: self.efficiency_ratio(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.last_accepted_ts = f64::NEG_INFINITY;
        self.accepted = 0;
        self.rejected = 0;
        log::debug!("Update gate reset");
    }
}

impl Default for UpdateGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
