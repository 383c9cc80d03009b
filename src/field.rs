//! Superposition across a collection of charges.
//!
//! [`ChargeSet`] owns a list of boxed charge trait objects and exposes the
//! net field (vector sum of every member's field) plus the composed
//! position-independent equations. It is the value a UI hands to a worker:
//! cloning goes through [`Charge::boxed_clone`].

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::charge::{Charge, Closest};
use crate::math::Vec2;
use crate::symbolic::Expr;

/// An owning, growable collection of charges with net-field queries.
#[derive(Default)]
pub struct ChargeSet {
    charges: Vec<Box<dyn Charge>>,
}

impl ChargeSet {
    pub fn new() -> Self {
        Self {
            charges: Vec::new(),
        }
    }

    pub fn push(&mut self, charge: Box<dyn Charge>) {
        self.charges.push(charge);
    }

    /// Remove and return the charge at `index`.
    ///
    /// Panics if `index` is out of bounds, like `Vec::remove`.
    pub fn remove(&mut self, index: usize) -> Box<dyn Charge> {
        self.charges.remove(index)
    }

    pub fn clear(&mut self) {
        self.charges.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.charges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.charges.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Charge> {
        self.charges.get(index).map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Charge> {
        self.charges.iter().map(|c| c.as_ref())
    }

    /// Net field vector at `point`: the sum of every member's field.
    pub fn field(&self, point: Vec2) -> Vec2 {
        let mut e = Vec2::ZERO;
        for charge in &self.charges {
            e += charge.field(point);
        }
        e
    }

    /// Net field magnitude at `point`.
    #[inline]
    pub fn field_magnitude(&self, point: Vec2) -> f32 {
        self.field(point).length()
    }

    /// x component of the net field at `point`.
    #[inline]
    pub fn field_x(&self, point: Vec2) -> f32 {
        self.field(point).x
    }

    /// y component of the net field at `point`.
    #[inline]
    pub fn field_y(&self, point: Vec2) -> f32 {
        self.field(point).y
    }

    /// Net x-component equation: the sum of every member's x equation.
    pub fn x_equation(&self) -> Expr {
        Expr::add(self.charges.iter().map(|c| c.x_equation()).collect())
    }

    /// Net y-component equation: the sum of every member's y equation.
    pub fn y_equation(&self) -> Expr {
        Expr::add(self.charges.iter().map(|c| c.y_equation()).collect())
    }

    /// Net magnitude equation.
    ///
    /// Magnitudes do not superpose, so this is `sqrt(Eₓ² + E_y²)` over the
    /// composed component equations, not a sum of member magnitudes.
    pub fn magnitude_equation(&self) -> Expr {
        Expr::hypot(self.x_equation(), self.y_equation())
    }

    /// Closest member charge to `point`, with its geometry query result.
    pub fn nearest(&self, point: Vec2) -> Option<(usize, Closest)> {
        self.nearest_excluding(point, None)
    }

    /// Like [`nearest`](Self::nearest), skipping the member at `skip`.
    ///
    /// Tracing uses this so a field line never "arrives" at the charge it
    /// was seeded from.
    pub fn nearest_excluding(&self, point: Vec2, skip: Option<usize>) -> Option<(usize, Closest)> {
        let mut best: Option<(usize, Closest)> = None;
        for (i, charge) in self.charges.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            let c = charge.closest(point);
            match &best {
                Some((_, b)) if b.distance <= c.distance => {}
                _ => best = Some((i, c)),
            }
        }
        best
    }
}

impl Clone for ChargeSet {
    fn clone(&self) -> Self {
        Self {
            charges: self.charges.iter().map(|c| c.boxed_clone()).collect(),
        }
    }
}

impl FromIterator<Box<dyn Charge>> for ChargeSet {
    fn from_iter<I: IntoIterator<Item = Box<dyn Charge>>>(iter: I) -> Self {
        Self {
            charges: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::PointCharge;

    fn dipole() -> ChargeSet {
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(-1.0, 0.0), 1e-6)));
        set.push(Box::new(PointCharge::new(Vec2::new(1.0, 0.0), -1e-6)));
        set
    }

    #[test]
    fn nearest_picks_the_closer_member() {
        let set = dipole();
        let (i, c) = set.nearest(Vec2::new(0.9, 0.0)).unwrap();
        assert_eq!(i, 1);
        assert!((c.distance - 0.1).abs() < 1e-5);
    }

    #[test]
    fn nearest_excluding_skips_the_source() {
        let set = dipole();
        let (i, _) = set
            .nearest_excluding(Vec2::new(0.9, 0.0), Some(1))
            .unwrap();
        assert_eq!(i, 0);
    }

    #[test]
    fn clone_is_deep() {
        let set = dipole();
        let copy = set.clone();
        assert_eq!(copy.len(), 2);
        let p = Vec2::new(0.0, 1.0);
        assert_eq!(set.field(p), copy.field(p));
    }

    #[test]
    fn empty_set_has_zero_field_and_equations() {
        let set = ChargeSet::new();
        assert_eq!(set.field(Vec2::ZERO), Vec2::ZERO);
        assert_eq!(set.x_equation(), Expr::num(0.0));
        assert!(set.nearest(Vec2::ZERO).is_none());
    }
}
