//! Configuration types shared across the tracing layer.

/// Traversal direction for a field line.
///
/// Lines seeded at positive charges follow the field; lines seeded at
/// negative charges run against it, so both render outward from their source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Orientation {
    WithField,
    AgainstField,
}

impl Orientation {
    /// Multiplier applied to the normalized field direction.
    #[inline]
    pub const fn sign(self) -> f32 {
        match self {
            Orientation::WithField => 1.0,
            Orientation::AgainstField => -1.0,
        }
    }
}

/// Budget for a single field-line trace.
#[derive(Copy, Clone, Debug)]
pub struct TraceBudget {
    /// Integration step length in plane units.
    pub step: f32,
    /// Hard cap on the number of steps.
    pub max_steps: u32,
    /// Distance to a charge below which the line has arrived.
    pub arrival: f32,
}

impl TraceBudget {
    pub const fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            arrival: step * 2.0,
        }
    }

    pub const fn with_arrival(self, arrival: f32) -> Self {
        Self { arrival, ..self }
    }

    /// A budget proportioned to a view rectangle: steps resolve the longer
    /// axis into ~400 segments and the cap allows a line to wander several
    /// times across the view.
    pub fn for_bounds(bounds: crate::math::Rect) -> Self {
        let extent = bounds.width().max(bounds.height());
        Self::new(extent / 400.0, 4_000)
    }
}

/// How field lines are seeded around the charges of a set.
#[derive(Copy, Clone, Debug)]
pub struct SeedParams {
    /// Number of lines started per polarized charge.
    pub lines_per_charge: u32,
    /// Stand-off distance of seed points from the charge geometry.
    ///
    /// Must exceed the trace budget's `arrival` distance, or lines terminate
    /// on their neighbours' rings immediately.
    pub ring_radius: f32,
}

impl SeedParams {
    pub const fn new(lines_per_charge: u32, ring_radius: f32) -> Self {
        Self {
            lines_per_charge,
            ring_radius,
        }
    }
}
