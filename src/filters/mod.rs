pub mod position;
pub mod scalar;

pub use position::{FilterState, PositionFilter};
pub use scalar::{AxisState, ScalarKalman};
