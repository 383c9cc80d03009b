//! Charge sources and the polymorphic charge contract.
//!
//! Every charge variant reports the electric field it induces at any point
//! of the plane, both numerically ([`Charge::field`] and the derived
//! magnitude/component accessors) and symbolically (the `*_equation`
//! methods, parameterized by the generic point symbols `x`, `y`). Geometry
//! queries ([`Charge::closest`]) support picking, trace termination, and
//! singularity guarding.

use alloc::boxed::Box;
use alloc::vec::Vec;
use libm::{cosf, fabsf, sinf, sqrtf};

use crate::error::FieldError;
use crate::math::Vec2;
use crate::symbolic::Expr;

/// Coulomb constant `1/(4πε₀)` in N·m²/C².
pub const COULOMB_K: f32 = 8.987_552e9;

/// Distances below this are clamped before inversion.
///
/// Field values at a charge's own singular location are defined as zero;
/// within this radius the geometry is treated as "at the charge".
pub const MIN_R: f32 = 1e-6;

/// Result of a closest-point query against a charge's geometry.
#[derive(Copy, Clone, Debug)]
pub struct Closest {
    /// Nearest point on the charge (the charge itself for a point charge,
    /// the perpendicular foot for a line charge).
    pub point: Vec2,
    /// Non-negative distance to that point.
    pub distance: f32,
}

/// Sign of a charge, used to orient field-line seeding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Polarity {
    /// Field lines leave the charge.
    Positive,
    /// Field lines arrive at the charge.
    Negative,
    /// Zero-magnitude charge; contributes nothing and seeds nothing.
    Neutral,
}

impl Polarity {
    #[inline]
    pub fn of(value: f32) -> Self {
        if value > 0.0 {
            Polarity::Positive
        } else if value < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

/// A **charge source** in the simulation plane.
///
/// The contract every variant fulfils:
/// - the three numeric operations are mutually consistent by construction
///   (`field_magnitude(p) == hypot(field_x(p), field_y(p))`, since all three
///   derive from the one vector primitive);
/// - the three equation operations mirror the numeric formulas exactly, so
///   `x_equation().eval(p.x, p.y) == field_x(p)` away from the singularity;
/// - at the charge's own singular location the field is the zero vector.
pub trait Charge: Send + Sync {
    /// Electric field vector induced at `point`.
    fn field(&self, point: Vec2) -> Vec2;

    /// Scalar magnitude of the field at `point`.
    #[inline]
    fn field_magnitude(&self, point: Vec2) -> f32 {
        self.field(point).length()
    }

    /// x component of the field at `point`.
    #[inline]
    fn field_x(&self, point: Vec2) -> f32 {
        self.field(point).x
    }

    /// y component of the field at `point`.
    #[inline]
    fn field_y(&self, point: Vec2) -> f32 {
        self.field(point).y
    }

    /// Position-independent equation for the field magnitude.
    fn magnitude_equation(&self) -> Expr;

    /// Position-independent equation for the field's x component.
    fn x_equation(&self) -> Expr;

    /// Position-independent equation for the field's y component.
    fn y_equation(&self) -> Expr;

    /// Closest point on the charge's geometry to `point`.
    fn closest(&self, point: Vec2) -> Closest;

    /// Sign of the charge.
    fn polarity(&self) -> Polarity;

    /// Seed points for field lines leaving (or arriving at) this charge.
    ///
    /// `radius` is the stand-off distance from the charge geometry and
    /// `phase` rotates/shifts the pattern; callers jitter it for visual
    /// variety. Point charges produce an evenly spaced ring; line charges a
    /// row of alternating-side stand-offs along the line (heuristic spread).
    fn seed_points(&self, n: u32, radius: f32, phase: f32) -> Vec<Vec2>;

    /// Clone into an owned trait object; charge sets must cross thread
    /// boundaries by value.
    fn boxed_clone(&self) -> Box<dyn Charge>;
}

/// An isolated point charge `q` at a fixed position.
///
/// `E(p) = k·q·(p − p₀)/r³`, `|E| = k·|q|/r²`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointCharge {
    /// Location of the charge in the simulation plane.
    pub position: Vec2,
    /// Signed charge in coulombs.
    pub charge: f32,
}

impl PointCharge {
    #[inline]
    pub const fn new(position: Vec2, charge: f32) -> Self {
        Self { position, charge }
    }

    /// Validating constructor for parameters from untrusted input.
    pub fn try_new(position: Vec2, charge: f32) -> Result<Self, FieldError> {
        if !position.is_finite() {
            return Err(FieldError::NonFinite { what: "position" });
        }
        if !charge.is_finite() {
            return Err(FieldError::NonFinite { what: "charge" });
        }
        Ok(Self::new(position, charge))
    }
}

impl Charge for PointCharge {
    fn field(&self, point: Vec2) -> Vec2 {
        let d = point - self.position;
        let r2 = d.length_sq();
        if r2 < MIN_R * MIN_R {
            return Vec2::ZERO;
        }
        let r = sqrtf(r2);
        d * (COULOMB_K * self.charge / (r2 * r))
    }

    fn magnitude_equation(&self) -> Expr {
        // k·|q| / ((x − x₀)² + (y − y₀)²)
        Expr::div(Expr::num(COULOMB_K * fabsf(self.charge)), self.r2_equation())
    }

    fn x_equation(&self) -> Expr {
        self.component_equation(Expr::sub(Expr::x(), Expr::num(self.position.x)))
    }

    fn y_equation(&self) -> Expr {
        self.component_equation(Expr::sub(Expr::y(), Expr::num(self.position.y)))
    }

    fn closest(&self, point: Vec2) -> Closest {
        Closest {
            point: self.position,
            distance: point.distance(self.position),
        }
    }

    fn polarity(&self) -> Polarity {
        Polarity::of(self.charge)
    }

    fn seed_points(&self, n: u32, radius: f32, phase: f32) -> Vec<Vec2> {
        let mut seeds = Vec::with_capacity(n as usize);
        for i in 0..n {
            let theta = phase + core::f32::consts::TAU * (i as f32) / (n.max(1) as f32);
            seeds.push(self.position + Vec2::new(cosf(theta), sinf(theta)) * radius);
        }
        seeds
    }

    fn boxed_clone(&self) -> Box<dyn Charge> {
        Box::new(*self)
    }
}

impl PointCharge {
    /// `(x − x₀)² + (y − y₀)²` — the squared distance to the charge.
    fn r2_equation(&self) -> Expr {
        Expr::add(alloc::vec![
            Expr::powi(Expr::sub(Expr::x(), Expr::num(self.position.x)), 2),
            Expr::powi(Expr::sub(Expr::y(), Expr::num(self.position.y)), 2),
        ])
    }

    /// `k·q·Δ / r³` with `r³` written as `sqrt(r²)³`.
    fn component_equation(&self, delta: Expr) -> Expr {
        Expr::div(
            Expr::mul(alloc::vec![Expr::num(COULOMB_K * self.charge), delta]),
            Expr::powi(Expr::sqrt(self.r2_equation()), 3),
        )
    }
}

/// An infinite straight line of uniform linear charge density λ.
///
/// The line passes through `point` at `angle` radians from the x axis.
/// `|E| = 2k·|λ|/d` at perpendicular distance `d`, directed along the signed
/// perpendicular: `E(p) = 2k·λ·n̂ / s` where `s = n̂·(p − p₀)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LineCharge {
    /// A point the line passes through.
    pub point: Vec2,
    /// Orientation of the line, radians counter-clockwise from the x axis.
    pub angle: f32,
    /// Signed linear charge density in C/m.
    pub density: f32,
}

impl LineCharge {
    #[inline]
    pub const fn new(point: Vec2, angle: f32, density: f32) -> Self {
        Self {
            point,
            angle,
            density,
        }
    }

    /// Validating constructor for parameters from untrusted input.
    pub fn try_new(point: Vec2, angle: f32, density: f32) -> Result<Self, FieldError> {
        if !point.is_finite() {
            return Err(FieldError::NonFinite { what: "point" });
        }
        if !angle.is_finite() {
            return Err(FieldError::NonFinite { what: "angle" });
        }
        if !density.is_finite() {
            return Err(FieldError::NonFinite { what: "density" });
        }
        Ok(Self::new(point, angle, density))
    }

    /// Unit direction along the line.
    #[inline]
    pub fn direction(&self) -> Vec2 {
        Vec2::new(cosf(self.angle), sinf(self.angle))
    }

    /// Unit normal (counter-clockwise perpendicular of the direction).
    #[inline]
    pub fn normal(&self) -> Vec2 {
        self.direction().perp()
    }

    /// Signed perpendicular distance from the line to `p`.
    #[inline]
    fn signed_distance(&self, p: Vec2) -> f32 {
        self.normal().dot(p - self.point)
    }

    /// `n̂ₓ·(x − x₀) + n̂_y·(y − y₀)` — the signed distance as an expression.
    fn signed_distance_equation(&self) -> Expr {
        let n = self.normal();
        Expr::add(alloc::vec![
            Expr::mul(alloc::vec![
                Expr::num(n.x),
                Expr::sub(Expr::x(), Expr::num(self.point.x)),
            ]),
            Expr::mul(alloc::vec![
                Expr::num(n.y),
                Expr::sub(Expr::y(), Expr::num(self.point.y)),
            ]),
        ])
    }
}

impl Charge for LineCharge {
    fn field(&self, point: Vec2) -> Vec2 {
        let s = self.signed_distance(point);
        if fabsf(s) < MIN_R {
            return Vec2::ZERO;
        }
        self.normal() * (2.0 * COULOMB_K * self.density / s)
    }

    fn magnitude_equation(&self) -> Expr {
        Expr::div(
            Expr::num(2.0 * COULOMB_K * fabsf(self.density)),
            Expr::abs(self.signed_distance_equation()),
        )
    }

    fn x_equation(&self) -> Expr {
        Expr::div(
            Expr::num(2.0 * COULOMB_K * self.density * self.normal().x),
            self.signed_distance_equation(),
        )
    }

    fn y_equation(&self) -> Expr {
        Expr::div(
            Expr::num(2.0 * COULOMB_K * self.density * self.normal().y),
            self.signed_distance_equation(),
        )
    }

    fn closest(&self, point: Vec2) -> Closest {
        let along = self.direction().dot(point - self.point);
        let foot = self.point + self.direction() * along;
        Closest {
            point: foot,
            distance: fabsf(self.signed_distance(point)),
        }
    }

    fn polarity(&self) -> Polarity {
        Polarity::of(self.density)
    }

    fn seed_points(&self, n: u32, radius: f32, phase: f32) -> Vec<Vec2> {
        // Alternating-side stand-offs spread along the line around `point`.
        // The spread is heuristic; infinite lines have no natural span.
        let dir = self.direction();
        let normal = self.normal();
        let spacing = radius * 8.0;
        let mut seeds = Vec::with_capacity(n as usize);
        for i in 0..n {
            let pair = (i / 2) as f32;
            let along = phase + if i % 4 < 2 { pair * spacing } else { -(pair + 1.0) * spacing };
            let side = if i % 2 == 0 { 1.0 } else { -1.0 };
            seeds.push(self.point + dir * along + normal * (radius * side));
        }
        seeds
    }

    fn boxed_clone(&self) -> Box<dyn Charge> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_charge_closest_is_the_charge() {
        let c = PointCharge::new(Vec2::new(1.0, 2.0), 1e-6);
        let q = c.closest(Vec2::new(4.0, 6.0));
        assert_eq!(q.point, Vec2::new(1.0, 2.0));
        assert!((q.distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn line_charge_closest_is_perpendicular_foot() {
        // Horizontal line through the origin.
        let line = LineCharge::new(Vec2::ZERO, 0.0, 1e-6);
        let q = line.closest(Vec2::new(3.0, 2.0));
        assert!((q.distance - 2.0).abs() < 1e-5);
        assert!((q.point.x - 3.0).abs() < 1e-5);
        assert!(q.point.y.abs() < 1e-5);
    }

    #[test]
    fn try_new_rejects_non_finite_parameters() {
        assert_eq!(
            PointCharge::try_new(Vec2::new(f32::NAN, 0.0), 1.0),
            Err(FieldError::NonFinite { what: "position" })
        );
        assert_eq!(
            LineCharge::try_new(Vec2::ZERO, 0.0, f32::INFINITY),
            Err(FieldError::NonFinite { what: "density" })
        );
    }

    #[test]
    fn seed_ring_is_centred_on_the_charge() {
        let c = PointCharge::new(Vec2::new(-1.0, 0.5), 1e-6);
        let seeds = c.seed_points(8, 0.1, 0.0);
        assert_eq!(seeds.len(), 8);
        for s in seeds {
            assert!((s.distance(c.position) - 0.1).abs() < 1e-5);
        }
    }

    #[test]
    fn polarity_follows_sign() {
        assert_eq!(Polarity::of(2.0), Polarity::Positive);
        assert_eq!(Polarity::of(-0.5), Polarity::Negative);
        assert_eq!(Polarity::of(0.0), Polarity::Neutral);
    }
}
