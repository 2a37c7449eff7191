//! Position smoothing and update gating for geographically anchored content.
//!
//! Raw location fixes go through a per-axis [`PositionFilter`]; the resulting
//! estimate goes through an [`UpdateGate`] that suppresses re-renders while the
//! anchor is effectively stationary. [`AnchorTracker`] wires the two together.

pub mod config;
pub mod error;
pub mod filters;
pub mod gate;
pub mod geodesy;
pub mod pipeline;
pub mod types;
pub mod worker;

pub use config::{FilterConfig, GateConfig, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
pub use filters::{AxisState, FilterState, PositionFilter};
pub use gate::{AcceptReason, GateDecision, GateStats, UpdateGate};
pub use geodesy::{haversine_distance, wrap_longitude};
pub use pipeline::{AnchorTracker, TrackerOutput, TrackerSnapshot};
pub use types::{FilteredEstimate, RawFix};
pub use worker::{AnchorId, AnchorUpdate, TrackerWorker, DEFAULT_UPDATE_CAPACITY};
