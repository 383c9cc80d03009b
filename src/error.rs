//! Error type for kernel configuration.
//!
//! Field evaluation itself is total (singular locations are defined, see
//! [`crate::charge`]), so errors only arise where caller-supplied
//! configuration crosses into the kernel: grid shapes, trace budgets, and
//! charge parameters parsed from untrusted input.

use core::fmt::{Display, Formatter, Result};

/// Error type for kernel configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldError {
    /// A parameter that must be finite was NaN or infinite.
    NonFinite {
        /// Name of the offending parameter.
        what: &'static str,
    },

    /// A grid was requested with a zero pixel dimension.
    DegenerateGrid {
        /// Pixels along x.
        width: u32,
        /// Pixels along y.
        height: u32,
    },

    /// Grid or trace bounds have zero or negative extent.
    EmptyBounds,

    /// Integration step length must be positive and finite.
    InvalidStep(f32),

    /// Arrival distance must be positive and finite.
    InvalidArrival(f32),

    /// A tracer needs at least one charge to define a field.
    EmptyChargeSet,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::NonFinite { what } => write!(f, "{what} must be finite"),
            Self::DegenerateGrid { width, height } => {
                write!(f, "grid must have nonzero dimensions, got {width}x{height}")
            }
            Self::EmptyBounds => write!(f, "bounds must have positive extent"),
            Self::InvalidStep(step) => {
                write!(f, "invalid step length: {step} (must be > 0 and finite)")
            }
            Self::InvalidArrival(arrival) => {
                write!(f, "invalid arrival distance: {arrival} (must be > 0 and finite)")
            }
            Self::EmptyChargeSet => write!(f, "charge set is empty"),
        }
    }
}

impl core::error::Error for FieldError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_is_informative() {
        let msg = FieldError::DegenerateGrid {
            width: 0,
            height: 128,
        }
        .to_string();
        assert!(msg.contains("0x128"));
        assert!(FieldError::NonFinite { what: "charge" }
            .to_string()
            .contains("charge"));
    }
}
