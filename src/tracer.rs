//! High-level tracing façade built on top of the low-level integrator.
//!
//! [`Tracer`] bundles a charge set, trace bounds, a budget, and optional
//! observers into a reusable handle. It exposes ergonomic entry points for
//! tracing single lines, fanning out a charge's seed ring, and covering a
//! whole set.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::charge::Polarity;
use crate::error::FieldError;
use crate::field::ChargeSet;
use crate::math::{Rect, Vec2};
use crate::observer::{ObserverList, TraceObserver, TraceOutcome};
use crate::params::{Orientation, SeedParams, TraceBudget};
use crate::rng::Rng;
use crate::trace::trace_field_line;

/// Builder for [`Tracer`], capturing shared configuration before freezing the tracer.
pub struct TracerBuilder<'a> {
    set: &'a ChargeSet,
    bounds: Rect,
    budget: Option<TraceBudget>,
    observers: Vec<Box<dyn TraceObserver + 'a>>,
}

impl<'a> TracerBuilder<'a> {
    /// Begin constructing a tracer over `set` within `bounds`.
    pub fn new(set: &'a ChargeSet, bounds: Rect) -> Self {
        Self {
            set,
            bounds,
            budget: None,
            observers: Vec::new(),
        }
    }

    /// Override the default bounds-proportioned budget.
    pub fn with_budget(mut self, budget: TraceBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Register an observer that will receive trace events.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: TraceObserver + 'a,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Finalise the builder and produce a tracer handle.
    pub fn build(self) -> Result<Tracer<'a>, FieldError> {
        if self.set.is_empty() {
            return Err(FieldError::EmptyChargeSet);
        }
        let budget = self
            .budget
            .unwrap_or_else(|| TraceBudget::for_bounds(self.bounds));
        if !budget.step.is_finite() || budget.step <= 0.0 {
            return Err(FieldError::InvalidStep(budget.step));
        }
        if !budget.arrival.is_finite() || budget.arrival <= 0.0 {
            return Err(FieldError::InvalidArrival(budget.arrival));
        }
        Ok(Tracer {
            set: self.set,
            bounds: self.bounds,
            budget,
            observers: self.observers,
        })
    }
}

/// High-level entry point that bundles a charge set, bounds, budget, and shared observers.
pub struct Tracer<'a> {
    set: &'a ChargeSet,
    bounds: Rect,
    budget: TraceBudget,
    observers: Vec<Box<dyn TraceObserver + 'a>>,
}

impl<'a> Tracer<'a> {
    /// Start constructing a tracer for the given charge set and bounds.
    pub fn builder(set: &'a ChargeSet, bounds: Rect) -> TracerBuilder<'a> {
        TracerBuilder::new(set, bounds)
    }

    /// The budget the tracer was built with.
    pub fn budget(&self) -> TraceBudget {
        self.budget
    }

    #[inline]
    fn observer_list(&self) -> ObserverList<'_> {
        ObserverList::new(
            self.observers
                .iter()
                .map(|obs| obs.as_ref() as &dyn TraceObserver),
        )
    }

    /// Attach an additional observer at runtime.
    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: TraceObserver + 'a,
    {
        self.observers.push(Box::new(observer));
    }

    /// Trace a single line from `seed`.
    pub fn trace(&self, seed: Vec2, orientation: Orientation) -> TraceOutcome {
        let observers = self.observer_list();
        trace_field_line(
            self.set,
            self.bounds,
            seed,
            orientation,
            None,
            self.budget,
            &observers,
        )
    }

    /// Fan out the seed ring of the charge at `index`.
    ///
    /// Positive charges are traced with the field, negative against it;
    /// neutral charges produce no lines. `phase` rotates the seed pattern
    /// (pass `rng.angle()` for jitter, 0.0 for determinism).
    pub fn trace_from(&self, index: usize, seeds: SeedParams, phase: f32) -> Vec<TraceOutcome> {
        let Some(charge) = self.set.get(index) else {
            return Vec::new();
        };
        let orientation = match charge.polarity() {
            Polarity::Positive => Orientation::WithField,
            Polarity::Negative => Orientation::AgainstField,
            Polarity::Neutral => return Vec::new(),
        };
        let observers = self.observer_list();
        charge
            .seed_points(seeds.lines_per_charge, seeds.ring_radius, phase)
            .into_iter()
            .map(|seed| {
                trace_field_line(
                    self.set,
                    self.bounds,
                    seed,
                    orientation,
                    Some(index),
                    self.budget,
                    &observers,
                )
            })
            .collect()
    }

    /// Trace every polarized charge's seed ring, jittering each ring's phase
    /// from `rng`.
    pub fn trace_all(&self, seeds: SeedParams, rng: &mut Rng) -> Vec<TraceOutcome> {
        let mut outcomes = Vec::new();
        for index in 0..self.set.len() {
            let phase = rng.angle();
            outcomes.extend(self.trace_from(index, seeds, phase));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::PointCharge;
    use crate::observer::{TerminationReason, TraceStatsObserver};

    #[test]
    fn build_rejects_an_empty_set() {
        let set = ChargeSet::new();
        let err = Tracer::builder(&set, Rect::centered(1.0)).build().err();
        assert_eq!(err, Some(FieldError::EmptyChargeSet));
    }

    #[test]
    fn build_rejects_a_bad_budget() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::ZERO, 1e-6)));
        let err = Tracer::builder(&set, Rect::centered(1.0))
            .with_budget(TraceBudget::new(0.0, 100))
            .build()
            .err();
        assert_eq!(err, Some(FieldError::InvalidStep(0.0)));
    }

    #[test]
    fn trace_all_skips_neutral_charges() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::ZERO, 1e-6)));
        set.push(Box::new(PointCharge::new(Vec2::new(1.0, 0.0), 0.0)));
        let stats = TraceStatsObserver::new();
        let tracer = Tracer::builder(&set, Rect::centered(4.0))
            .with_observer(stats.clone())
            .build()
            .unwrap();
        let seeds = SeedParams::new(6, 0.1);
        let mut rng = Rng::seed_from(3);
        let outcomes = tracer.trace_all(seeds, &mut rng);
        assert_eq!(outcomes.len(), 6);
        assert_eq!(stats.snapshot().lines, 6);
    }

    #[test]
    fn dipole_lines_arrive_at_the_opposite_charge() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-0.5, 0.0), 1e-6)));
        set.push(Box::new(PointCharge::new(Vec2::new(0.5, 0.0), -1e-6)));
        let tracer = Tracer::builder(&set, Rect::centered(8.0))
            .with_budget(TraceBudget::new(0.01, 10_000))
            .build()
            .unwrap();
        // Seeds on the axis toward the negative charge and perpendicular to
        // it; the back-axis separatrix (which escapes to infinity) is
        // deliberately avoided.
        for seed in [Vec2::new(-0.4, 0.0), Vec2::new(-0.5, 0.1)] {
            let out = tracer.trace(seed, Orientation::WithField);
            assert_eq!(out.reason, TerminationReason::HitCharge, "seed {seed:?}");
            assert!(out.end.distance(Vec2::new(0.5, 0.0)) < 0.05);
        }
    }
}
