//! Display smoothing for raw sensor readings
//!
//! [`RingAccumulator`] is the moving-average primitive; [`MeasurementSmoother`]
//! wraps five of them into the climate and air channels shown on screen.

pub mod ring;
pub mod smoother;

pub use ring::{RingAccumulator, Sample};
pub use smoother::*;
