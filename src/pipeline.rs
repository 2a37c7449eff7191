// pipeline.rs - raw fix -> position filter -> update gate
//
// This is the only surface the rendering side needs. Nothing here knows about
// threads, files or the location source; it takes fixes in and hands back
// either an estimate to render or an explicit "no update".

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::filters::{FilterState, PositionFilter};
use crate::gate::{GateDecision, UpdateGate};
use crate::geodesy::haversine_distance;
use crate::types::{FilteredEstimate, RawFix};

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackerOutput {
    /// Consumers should re-render at this estimate
    Update(FilteredEstimate),
    /// Nothing worth re-rendering
    NoUpdate,
}

impl TrackerOutput {
    pub fn is_update(&self) -> bool {
        matches!(self, TrackerOutput::Update(_))
    }

    pub fn into_estimate(self) -> Option<FilteredEstimate> {
        match self {
            TrackerOutput::Update(estimate) => Some(estimate),
            TrackerOutput::NoUpdate => None,
        }
    }
}

// ─── Diagnostics snapshot ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub fixes_processed: u64,
    #[serde(default)]
    pub skipped: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub efficiency_ratio: f64,
    pub recalibrations: u64,
    pub current_estimate: Option<FilteredEstimate>,
    pub last_accepted: Option<FilteredEstimate>,
    pub filter_state: Option<FilterState>,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// One tracking session: a position filter and an update gate used together.
///
/// Not internally synchronized. Keep it on one thread, or see
/// [`crate::worker::TrackerWorker`].
pub struct AnchorTracker {
    config: TrackerConfig,
    filter: PositionFilter,
    gate: UpdateGate,
    last_decision: Option<GateDecision>,
    fixes_processed: u64,
    skipped: u64,
    recalibrations: u64,
}

impl AnchorTracker {
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self::with_validated(config))
    }

    fn with_validated(config: TrackerConfig) -> Self {
        Self {
            filter: PositionFilter::new(config.filter.clone()),
            gate: UpdateGate::new(config.gate.clone()),
            last_decision: None,
            fixes_processed: 0,
            skipped: 0,
            recalibrations: 0,
            config,
        }
    }

    /// Feed one raw fix through the filter and the gate.
    ///
    /// A fix with a non-finite position or timestamp is dropped before either
    /// stage sees it and yields `NoUpdate`.
    pub fn process(&mut self, fix: RawFix) -> TrackerOutput {
        self.fixes_processed += 1;

        if !fix.is_usable() {
            self.skipped += 1;
            log::warn!(
                "Skipping unusable fix ({}, {}) at t={}",
                fix.latitude,
                fix.longitude,
                fix.timestamp
            );
            return TrackerOutput::NoUpdate;
        }

        if self.is_jump(&fix) {
            self.recalibrations += 1;
            log::info!(
                "Fix at ({:.6}, {:.6}) jumped past {:?}m, recalibrating",
                fix.latitude,
                fix.longitude,
                self.config.recalibrate_jump_m
            );
            self.filter.reset();
            self.gate.reset();
        }

        let estimate = self.filter.filter(&fix);
        let decision = self.gate.evaluate(&estimate);
        self.last_decision = Some(decision);

        match decision {
            GateDecision::Accepted(reason) => {
                log::debug!(
                    "Update accepted ({:?}) at ({:.7}, {:.7})",
                    reason,
                    estimate.latitude,
                    estimate.longitude
                );
                TrackerOutput::Update(estimate)
            }
            GateDecision::Rejected { .. } => TrackerOutput::NoUpdate,
        }
    }

    fn is_jump(&self, fix: &RawFix) -> bool {
        let (Some(threshold), Some(current)) =
            (self.config.recalibrate_jump_m, self.filter.current_estimate())
        else {
            return false;
        };
        haversine_distance(current.latitude, current.longitude, fix.latitude, fix.longitude)
            >= threshold
    }

    /// Filter output for the latest fix, whether or not the gate accepted it.
    pub fn current_estimate(&self) -> Option<FilteredEstimate> {
        self.filter.current_estimate()
    }

    pub fn efficiency_ratio(&self) -> f64 {
        self.gate.efficiency_ratio()
    }

    pub fn accepted_count(&self) -> u64 {
        self.gate.accepted_count()
    }

    pub fn rejected_count(&self) -> u64 {
        self.gate.rejected_count()
    }

    /// Fixes dropped for a non-finite position or timestamp
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn recalibrations(&self) -> u64 {
        self.recalibrations
    }

    pub fn last_decision(&self) -> Option<GateDecision> {
        self.last_decision
    }

    pub fn filter_state(&self) -> Option<FilterState> {
        self.filter.state()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let stats = self.gate.stats();
        TrackerSnapshot {
            fixes_processed: self.fixes_processed,
            skipped: self.skipped,
            accepted: stats.accepted,
            rejected: stats.rejected,
            efficiency_ratio: stats.efficiency_ratio,
            recalibrations: self.recalibrations,
            current_estimate: self.filter.current_estimate(),
            last_accepted: self.gate.last_accepted(),
            filter_state: self.filter.state(),
        }
    }

    /// Start over as a new session: filter and gate are reset together.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.gate.reset();
        self.last_decision = None;
        self.fixes_processed = 0;
        self.skipped = 0;
        self.recalibrations = 0;
        log::info!("Anchor tracker reset");
    }
}

impl Default for AnchorTracker {
    fn default() -> Self {
        Self::with_validated(TrackerConfig::default())
    }
}
