//! Field-line integration.
//!
//! A field line is the streamline of the electric field through a seed
//! point. The tracer advances with a midpoint (RK2) scheme on the normalized
//! field direction, so the step length is uniform along the line and the
//! line count around a charge stays proportional to its flux. Each trace
//! reports a [`TraceOutcome`](crate::observer::TraceOutcome) that surfaces
//! the termination reason so that higher-level orchestration (e.g. seeding
//! policies) can react safely.

use crate::field::ChargeSet;
use crate::math::{Rect, Vec2};
use crate::observer::{
    TerminationReason, TraceObserver, TraceOutcome, TraceStart, TraceStep, TraceTerminate,
};
use crate::params::{Orientation, TraceBudget};

/// Field magnitudes below this terminate a trace as stalled.
///
/// Exact nulls occur between like charges; near-nulls would otherwise pin
/// the integrator in place for the rest of its step budget.
pub const STALL_EPS: f32 = 1e-12;

/// Trace one field line from `seed` until it arrives at a charge, leaves
/// `bounds`, stalls at a field null, or exhausts the budget.
///
/// `source` names the charge the line was seeded from; that charge is
/// excluded from arrival checks so a line never terminates on its own seed
/// ring.
pub fn trace_field_line<O>(
    set: &ChargeSet,
    bounds: Rect,
    seed: Vec2,
    orientation: Orientation,
    source: Option<usize>,
    budget: TraceBudget,
    observer: &O,
) -> TraceOutcome
where
    O: TraceObserver,
{
    debug_assert!(budget.step > 0.0, "trace_field_line: step must be > 0");
    let sign = orientation.sign();
    let mut x = seed;
    let mut steps = 0u32;

    observer.on_start(TraceStart {
        position: x,
        orientation,
    });

    loop {
        if let Some((_, c)) = set.nearest_excluding(x, source) {
            if c.distance <= budget.arrival {
                observer.on_terminate(TraceTerminate {
                    position: c.point,
                    reason: TerminationReason::HitCharge,
                    depth: steps,
                });
                return TraceOutcome::new(c.point, TerminationReason::HitCharge, steps);
            }
        }

        if !bounds.contains(x) {
            observer.on_terminate(TraceTerminate {
                position: x,
                reason: TerminationReason::LeftBounds,
                depth: steps,
            });
            return TraceOutcome::new(x, TerminationReason::LeftBounds, steps);
        }

        let e = set.field(x);
        let magnitude = e.length();
        if !(magnitude > STALL_EPS) || !e.is_finite() {
            observer.on_terminate(TraceTerminate {
                position: x,
                reason: TerminationReason::Stalled,
                depth: steps,
            });
            return TraceOutcome::new(x, TerminationReason::Stalled, steps);
        }

        observer.on_step(TraceStep {
            position: x,
            magnitude,
            depth: steps,
        });

        // Midpoint step on the normalized direction field.
        let dir = e * (sign / magnitude);
        let mid = x + dir * (0.5 * budget.step);
        let e_mid = set.field(mid);
        let m_mid = e_mid.length();
        let dir = if m_mid > STALL_EPS && e_mid.is_finite() {
            e_mid * (sign / m_mid)
        } else {
            dir
        };
        x += dir * budget.step;

        steps += 1;
        if steps >= budget.max_steps {
            observer.on_terminate(TraceTerminate {
                position: x,
                reason: TerminationReason::MaxSteps,
                depth: steps,
            });
            return TraceOutcome::new(x, TerminationReason::MaxSteps, steps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::PointCharge;
    use crate::observer::NoopObserver;
    use alloc::boxed::Box;

    fn lone_positive() -> ChargeSet {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::ZERO, 1e-6)));
        set
    }

    #[test]
    fn line_from_lone_charge_leaves_bounds_radially() {
        let set = lone_positive();
        let bounds = Rect::centered(1.0);
        let budget = TraceBudget::new(0.01, 1_000);
        let seed = Vec2::new(0.05, 0.0);
        let out = trace_field_line(
            &set,
            bounds,
            seed,
            Orientation::WithField,
            Some(0),
            budget,
            &NoopObserver,
        );
        assert_eq!(out.reason, TerminationReason::LeftBounds);
        // Radial symmetry: the line must stay on the +x axis.
        assert!(out.end.x > 1.0);
        assert!(out.end.y.abs() < 1e-3, "drifted to y = {}", out.end.y);
    }

    #[test]
    fn step_budget_caps_the_trace() {
        let set = lone_positive();
        let out = trace_field_line(
            &set,
            Rect::centered(1_000.0),
            Vec2::new(0.05, 0.0),
            Orientation::WithField,
            Some(0),
            TraceBudget::new(0.01, 16),
            &NoopObserver,
        );
        assert_eq!(out.reason, TerminationReason::MaxSteps);
        assert_eq!(out.steps, 16);
    }

    #[test]
    fn seed_inside_arrival_ring_of_another_charge_hits_it() {
        let mut set = lone_positive();
        set.push(Box::new(PointCharge::new(Vec2::new(0.5, 0.0), -1e-6)));
        let budget = TraceBudget::new(0.01, 1_000);
        let out = trace_field_line(
            &set,
            Rect::centered(2.0),
            Vec2::new(0.5 - budget.arrival * 0.5, 0.0),
            Orientation::WithField,
            Some(0),
            budget,
            &NoopObserver,
        );
        assert_eq!(out.reason, TerminationReason::HitCharge);
        assert_eq!(out.steps, 0);
    }

    #[test]
    fn midpoint_between_equal_charges_stalls() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-1.0, 0.0), 1e-6)));
        set.push(Box::new(PointCharge::new(Vec2::new(1.0, 0.0), 1e-6)));
        // The origin is an exact null of the dipole-free two-positive system.
        let out = trace_field_line(
            &set,
            Rect::centered(2.0),
            Vec2::ZERO,
            Orientation::WithField,
            None,
            TraceBudget::new(0.01, 100),
            &NoopObserver,
        );
        assert_eq!(out.reason, TerminationReason::Stalled);
    }
}
