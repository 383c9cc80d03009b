#![no_std]

//! Grid-free 2D electrostatics kernel.
//!
//! This crate provides safe, `no_std` building blocks for an interactive
//! electrostatics tool: polymorphic charge sources that report their field
//! numerically and as position-independent symbolic equations, superposition
//! across charge sets, field-line tracing with observer instrumentation, and
//! pixel-grid sampling for progressive heat-map rendering.

extern crate alloc;

pub mod charge;
pub mod error;
pub mod field;
pub mod math;
pub mod observer;
pub mod params;
pub mod rng;
pub mod sampling;
pub mod stats;
pub mod symbolic;
pub mod trace;
pub mod tracer;

pub use charge::{Charge, Closest, LineCharge, PointCharge, Polarity, COULOMB_K, MIN_R};
pub use error::FieldError;
pub use field::ChargeSet;
pub use math::{Rect, Vec2};
pub use observer::{
    NoopObserver, Polyline, PolylineRecorder, TerminationReason, TraceObserver, TraceOutcome,
    TraceStart, TraceStatsObserver, TraceStatsSnapshot, TraceStep, TraceTerminate,
};
pub use params::{Orientation, SeedParams, TraceBudget};
pub use rng::Rng;
pub use sampling::{accumulate_magnitudes, log_compress, GridSpec};
pub use stats::Stats;
pub use symbolic::{Expr, Sym};
pub use trace::trace_field_line;
pub use tracer::{Tracer, TracerBuilder};

#[cfg(test)]
mod tests {
    use crate::*;
    use alloc::boxed::Box;
    use alloc::string::ToString;

    const Q: f32 = 1e-6;

    fn assert_close(got: f32, want: f32, rel: f32, what: &str) {
        let tol = rel * want.abs().max(1e-20);
        assert!(
            (got - want).abs() <= tol,
            "{what}: got {got}, want {want}"
        );
    }

    /// `|E| = k·q/r²` for an isolated point charge.
    #[test]
    fn point_charge_magnitude_is_coulombs_law() {
        let c = PointCharge::new(Vec2::ZERO, Q);
        for r in [0.1f32, 0.5, 1.0, 3.0] {
            let p = Vec2::new(r, 0.0);
            let want = COULOMB_K * Q / (r * r);
            assert_close(c.field_magnitude(p), want, 1e-4, "point magnitude");
        }
    }

    /// Positive charges point the field outward, negative inward.
    #[test]
    fn point_charge_field_is_radial() {
        let pos = PointCharge::new(Vec2::new(1.0, 1.0), Q);
        let neg = PointCharge::new(Vec2::new(1.0, 1.0), -Q);
        let p = Vec2::new(2.0, 3.0);
        let radial = (p - Vec2::new(1.0, 1.0)).normalized();

        let e_pos = pos.field(p).normalized();
        let e_neg = neg.field(p).normalized();
        assert!((e_pos - radial).length() < 1e-5);
        assert!((e_neg + radial).length() < 1e-5);
    }

    /// Consistency: the magnitude equals the hypotenuse of the components,
    /// for every variant and for a composed set.
    #[test]
    fn magnitude_is_hypot_of_components() {
        let charges: [Box<dyn Charge>; 3] = [
            Box::new(PointCharge::new(Vec2::new(-0.3, 0.2), Q)),
            Box::new(PointCharge::new(Vec2::new(0.4, -0.1), -2.0 * Q)),
            Box::new(LineCharge::new(Vec2::new(0.0, -1.0), 0.6, 0.5 * Q)),
        ];
        let mut set = ChargeSet::new();
        for c in &charges {
            set.push(c.boxed_clone());
        }

        let points = [
            Vec2::new(0.7, 0.7),
            Vec2::new(-1.2, 0.3),
            Vec2::new(0.1, -0.4),
        ];
        for p in points {
            for c in &charges {
                let hyp = libm::hypotf(c.field_x(p), c.field_y(p));
                assert_close(c.field_magnitude(p), hyp, 1e-5, "variant hypot");
            }
            let hyp = libm::hypotf(set.field_x(p), set.field_y(p));
            assert_close(set.field_magnitude(p), hyp, 1e-5, "set hypot");
        }
    }

    /// Edge case: the field at a charge's own singular location is zero.
    #[test]
    fn field_at_the_singularity_is_zero() {
        let c = PointCharge::new(Vec2::new(0.5, -0.5), Q);
        assert_eq!(c.field(Vec2::new(0.5, -0.5)), Vec2::ZERO);
        assert_eq!(c.field_magnitude(Vec2::new(0.5, -0.5)), 0.0);

        let line = LineCharge::new(Vec2::ZERO, 0.3, Q);
        let on_line = Vec2::new(libm::cosf(0.3), libm::sinf(0.3)) * 2.0;
        assert_eq!(line.field(on_line), Vec2::ZERO);
    }

    /// Superposition: the midpoint of two equal charges is a null.
    #[test]
    fn equal_charges_cancel_at_the_midpoint() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-1.0, 0.0), Q)));
        set.push(Box::new(PointCharge::new(Vec2::new(1.0, 0.0), Q)));
        let e = set.field(Vec2::ZERO);
        assert!(e.length() < 1e-3 * COULOMB_K * Q, "null point leak: {e:?}");
    }

    /// `|E| = 2kλ/d` for an infinite line, perpendicular to it.
    #[test]
    fn line_charge_falls_off_as_inverse_distance() {
        // Vertical line through x = 1.
        let line = LineCharge::new(Vec2::new(1.0, 0.0), core::f32::consts::FRAC_PI_2, Q);
        for d in [0.25f32, 1.0, 2.0] {
            let p = Vec2::new(1.0 + d, 5.0);
            let want = 2.0 * COULOMB_K * Q / d;
            assert_close(line.field_magnitude(p), want, 1e-4, "line magnitude");
            // Perpendicular to the line means parallel to x here.
            let e = line.field(p);
            assert!(e.y.abs() < 1e-3 * e.x.abs());
        }
    }

    /// The symbolic layer mirrors the numeric layer for every variant and
    /// for the composed set.
    #[test]
    fn equations_evaluate_to_the_numeric_field() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-0.5, 0.1), Q)));
        set.push(Box::new(PointCharge::new(Vec2::new(0.6, -0.2), -0.5 * Q)));
        set.push(Box::new(LineCharge::new(Vec2::new(0.0, 1.0), -0.4, 0.25 * Q)));

        let points = [
            Vec2::new(0.3, 0.8),
            Vec2::new(-1.1, -0.6),
            Vec2::new(1.4, 0.2),
        ];
        for p in points {
            for c in set.iter() {
                assert_close(
                    c.x_equation().eval(p.x, p.y),
                    c.field_x(p),
                    1e-3,
                    "variant x equation",
                );
                assert_close(
                    c.y_equation().eval(p.x, p.y),
                    c.field_y(p),
                    1e-3,
                    "variant y equation",
                );
                assert_close(
                    c.magnitude_equation().eval(p.x, p.y),
                    c.field_magnitude(p),
                    1e-3,
                    "variant magnitude equation",
                );
            }
            assert_close(
                set.x_equation().eval(p.x, p.y),
                set.field_x(p),
                1e-3,
                "net x equation",
            );
            assert_close(
                set.magnitude_equation().eval(p.x, p.y),
                set.field_magnitude(p),
                1e-3,
                "net magnitude equation",
            );
        }
    }

    /// Equations are position-independent: rendering mentions the symbols,
    /// not any sampled point.
    #[test]
    fn equations_render_with_generic_symbols() {
        let c = PointCharge::new(Vec2::new(2.0, -3.0), Q);
        let s = c.magnitude_equation().to_string();
        assert!(s.contains('x') && s.contains('y'), "unexpected render: {s}");
    }

    /// Observers capture consistent per-line data across a whole-set trace.
    #[test]
    fn observers_capture_trace_data() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-0.5, 0.0), Q)));
        set.push(Box::new(PointCharge::new(Vec2::new(0.5, 0.0), -Q)));

        let stats = TraceStatsObserver::new();
        let recorder = PolylineRecorder::new();
        let tracer = Tracer::builder(&set, Rect::centered(4.0))
            .with_budget(TraceBudget::new(0.01, 5_000))
            .with_observer(stats.clone())
            .with_observer(recorder.clone())
            .build()
            .unwrap();

        let mut rng = Rng::seed_from(11);
        let outcomes = tracer.trace_all(SeedParams::new(4, 0.05), &mut rng);
        assert_eq!(outcomes.len(), 8);

        let snap = stats.snapshot();
        assert_eq!(snap.lines, 8);
        assert_eq!(
            snap.arrivals + snap.escapes + snap.stalls + snap.capped,
            8
        );
        assert!(snap.total_steps > 0);

        let lines = recorder.polylines();
        assert_eq!(lines.len(), 8);
        for line in &lines {
            assert!(line.points.len() >= 2);
        }

        let spec = GridSpec::new(Rect::centered(4.0), 256, 256).unwrap();
        let svg = recorder.to_svg(&spec);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<polyline"));
        assert!(svg.ends_with("</svg>\n"));
    }

    /// Determinism: equal seeds give identical traces and jitter sequences.
    #[test]
    fn tracing_is_deterministic_for_equal_seeds() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-0.5, 0.0), Q)));
        set.push(Box::new(PointCharge::new(Vec2::new(0.5, 0.0), -Q)));
        let tracer = Tracer::builder(&set, Rect::centered(4.0))
            .with_budget(TraceBudget::new(0.01, 5_000))
            .build()
            .unwrap();

        let seeds = SeedParams::new(6, 0.05);
        let mut rng_a = Rng::seed_from(99);
        let mut rng_b = Rng::seed_from(99);
        let a = tracer.trace_all(seeds, &mut rng_a);
        let b = tracer.trace_all(seeds, &mut rng_b);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.reason, y.reason);
            assert_eq!(x.steps, y.steps);
            assert_eq!(x.end, y.end);
        }

        // Summarise trace lengths; every line took at least one step.
        let mut lengths = Stats::default();
        for out in &a {
            lengths.push(out.steps as f32);
        }
        assert_eq!(lengths.count() as usize, a.len());
        assert!(lengths.min().unwrap() >= 1.0);
    }

    /// Progressive sampling: counts track passes and the running mean of an
    /// unjittered accumulation equals direct evaluation.
    #[test]
    fn accumulation_passes_converge_on_direct_evaluation() {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(0.2, -0.3), Q)));

        let spec = GridSpec::new(Rect::centered(1.0), 8, 8).unwrap();
        let mut accum = alloc::vec![0.0f32; spec.len()];
        let mut counts = alloc::vec![0u32; spec.len()];
        let mut rng = Rng::seed_from(5);

        for _ in 0..3 {
            accumulate_magnitudes(&set, &spec, 0.0, &mut rng, &mut accum, &mut counts);
        }
        for iy in 0..spec.height {
            for ix in 0..spec.width {
                let idx = spec.index(ix, iy);
                assert_eq!(counts[idx], 3);
                let mean = accum[idx] / counts[idx] as f32;
                let direct = set.field_magnitude(spec.pixel_center(ix, iy));
                assert_close(mean, direct, 1e-5, "accumulated mean");
            }
        }
    }
}
