//! Position-independent field equations.
//!
//! [`Expr`] is a small owned expression tree over the generic point symbols
//! `x` and `y`. It covers exactly the algebra the closed-form charge
//! equations need (sums, products, quotients, integer powers, square roots,
//! absolute values) and stays deliberately far from a general CAS: callers
//! treat expressions as opaque values to display or evaluate.
//!
//! Construction helpers fold constants and drop additive/multiplicative
//! identities so that superposed equations stay readable.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use libm::{fabsf, sqrtf};

/// The generic point symbols an equation is parameterized by.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sym {
    X,
    Y,
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::X => write!(f, "x"),
            Sym::Y => write!(f, "y"),
        }
    }
}

/// A position-independent equation over the symbols `x`, `y`.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f32),
    Sym(Sym),
    /// n-ary sum; kept flat so superposition reads as one term per charge.
    Add(Vec<Expr>),
    /// n-ary product with any numeric coefficient folded into the front.
    Mul(Vec<Expr>),
    Neg(Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// Integer power of a subexpression.
    Pow(Box<Expr>, i32),
    Sqrt(Box<Expr>),
    Abs(Box<Expr>),
}

// Precedence levels for parenthesization, loosest binding first.
const P_ADD: u8 = 1;
const P_MUL: u8 = 2;
const P_DIV: u8 = 3;
const P_POW: u8 = 4;

impl Expr {
    #[inline]
    pub const fn num(v: f32) -> Self {
        Expr::Num(v)
    }

    #[inline]
    pub const fn x() -> Self {
        Expr::Sym(Sym::X)
    }

    #[inline]
    pub const fn y() -> Self {
        Expr::Sym(Sym::Y)
    }

    /// Sum of `terms`, flattened; numeric terms are folded and zeros dropped.
    pub fn add(terms: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(terms.len());
        let mut constant = 0.0f32;
        for term in terms {
            match term {
                Expr::Num(v) => constant += v,
                Expr::Add(inner) => {
                    for t in inner {
                        match t {
                            Expr::Num(v) => constant += v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if constant != 0.0 || flat.is_empty() {
            flat.push(Expr::Num(constant));
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Expr::Num(0.0))
        } else {
            Expr::Add(flat)
        }
    }

    /// Product of `factors`, flattened; the numeric coefficient is folded to
    /// the front, a unit coefficient is dropped, and a zero annihilates.
    pub fn mul(factors: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(factors.len());
        let mut coeff = 1.0f32;
        for factor in factors {
            match factor {
                Expr::Num(v) => coeff *= v,
                Expr::Mul(inner) => {
                    for t in inner {
                        match t {
                            Expr::Num(v) => coeff *= v,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if coeff == 0.0 {
            return Expr::Num(0.0);
        }
        if flat.is_empty() {
            return Expr::Num(coeff);
        }
        if coeff != 1.0 {
            flat.insert(0, Expr::Num(coeff));
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or(Expr::Num(coeff))
        } else {
            Expr::Mul(flat)
        }
    }

    #[inline]
    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::add(alloc::vec![lhs, Expr::neg(rhs)])
    }

    pub fn neg(expr: Expr) -> Self {
        match expr {
            Expr::Num(v) => Expr::Num(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn div(numerator: Expr, denominator: Expr) -> Self {
        match (numerator, denominator) {
            (Expr::Num(a), Expr::Num(b)) => Expr::Num(a / b),
            (n, Expr::Num(v)) if v == 1.0 => n,
            (Expr::Num(v), _) if v == 0.0 => Expr::Num(0.0),
            (n, d) => Expr::Div(Box::new(n), Box::new(d)),
        }
    }

    pub fn powi(base: Expr, exponent: i32) -> Self {
        match (base, exponent) {
            (_, 0) => Expr::Num(1.0),
            (b, 1) => b,
            (Expr::Num(v), n) => Expr::Num(powi(v, n)),
            (b, n) => Expr::Pow(Box::new(b), n),
        }
    }

    pub fn sqrt(expr: Expr) -> Self {
        match expr {
            Expr::Num(v) if v >= 0.0 => Expr::Num(sqrtf(v)),
            other => Expr::Sqrt(Box::new(other)),
        }
    }

    pub fn abs(expr: Expr) -> Self {
        match expr {
            Expr::Num(v) => Expr::Num(fabsf(v)),
            Expr::Abs(inner) => Expr::Abs(inner),
            other => Expr::Abs(Box::new(other)),
        }
    }

    /// `sqrt(a² + b²)`: the magnitude of a vector with symbolic components.
    pub fn hypot(a: Expr, b: Expr) -> Self {
        Expr::sqrt(Expr::add(alloc::vec![
            Expr::powi(a, 2),
            Expr::powi(b, 2),
        ]))
    }

    /// Substitute a concrete point for the symbols and evaluate.
    ///
    /// This is the bridge that keeps the symbolic layer honest: tests assert
    /// that every charge's equations evaluate to its numeric field.
    pub fn eval(&self, x: f32, y: f32) -> f32 {
        match self {
            Expr::Num(v) => *v,
            Expr::Sym(Sym::X) => x,
            Expr::Sym(Sym::Y) => y,
            Expr::Add(terms) => terms.iter().map(|t| t.eval(x, y)).sum(),
            Expr::Mul(factors) => factors.iter().map(|t| t.eval(x, y)).product(),
            Expr::Neg(inner) => -inner.eval(x, y),
            Expr::Div(n, d) => n.eval(x, y) / d.eval(x, y),
            Expr::Pow(base, exp) => powi(base.eval(x, y), *exp),
            Expr::Sqrt(inner) => sqrtf(inner.eval(x, y)),
            Expr::Abs(inner) => fabsf(inner.eval(x, y)),
        }
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Expr::Num(v) => {
                if *v < 0.0 && parent > P_ADD {
                    write!(f, "(")?;
                    write_num(f, *v)?;
                    write!(f, ")")
                } else {
                    write_num(f, *v)
                }
            }
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Add(terms) => {
                let parens = parent > P_ADD;
                if parens {
                    write!(f, "(")?;
                }
                for (i, term) in terms.iter().enumerate() {
                    match term {
                        Expr::Neg(inner) if i > 0 => {
                            write!(f, " - ")?;
                            inner.fmt_with(f, P_MUL)?;
                        }
                        Expr::Num(v) if i > 0 && *v < 0.0 => {
                            write!(f, " - ")?;
                            write_num(f, -v)?;
                        }
                        _ => {
                            if i > 0 {
                                write!(f, " + ")?;
                            }
                            term.fmt_with(f, P_ADD)?;
                        }
                    }
                }
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                let parens = parent > P_MUL;
                if parens {
                    write!(f, "(")?;
                }
                for (i, factor) in factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    factor.fmt_with(f, P_MUL)?;
                }
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Neg(inner) => {
                let parens = parent > P_ADD;
                if parens {
                    write!(f, "(")?;
                }
                write!(f, "-")?;
                inner.fmt_with(f, P_MUL)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Div(n, d) => {
                let parens = parent > P_DIV;
                if parens {
                    write!(f, "(")?;
                }
                n.fmt_with(f, P_DIV)?;
                write!(f, "/")?;
                d.fmt_with(f, P_POW)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Pow(base, exp) => {
                base.fmt_with(f, P_POW)?;
                write!(f, "^{exp}")
            }
            Expr::Sqrt(inner) => {
                write!(f, "sqrt(")?;
                inner.fmt_with(f, P_ADD)?;
                write!(f, ")")
            }
            Expr::Abs(inner) => {
                write!(f, "|")?;
                inner.fmt_with(f, P_ADD)?;
                write!(f, "|")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, P_ADD)
    }
}

/// Integer power by repeated squaring; exact semantics for negative bases.
fn powi(base: f32, exponent: i32) -> f32 {
    let mut n = exponent.unsigned_abs();
    let mut b = base;
    let mut acc = 1.0f32;
    while n > 0 {
        if n & 1 == 1 {
            acc *= b;
        }
        b *= b;
        n >>= 1;
    }
    if exponent < 0 { 1.0 / acc } else { acc }
}

fn write_num(f: &mut fmt::Formatter<'_>, v: f32) -> fmt::Result {
    if v == 0.0 {
        write!(f, "0")
    } else if !v.is_finite() {
        write!(f, "{v}")
    } else if fabsf(v) >= 1e4 || fabsf(v) < 1e-3 {
        write!(f, "{v:e}")
    } else {
        write!(f, "{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn constructors_fold_identities() {
        assert_eq!(
            Expr::add(vec![Expr::num(0.0), Expr::x(), Expr::num(0.0)]),
            Expr::x()
        );
        assert_eq!(
            Expr::mul(vec![Expr::num(1.0), Expr::y()]),
            Expr::y()
        );
        assert_eq!(
            Expr::mul(vec![Expr::num(0.0), Expr::x(), Expr::y()]),
            Expr::num(0.0)
        );
        assert_eq!(Expr::powi(Expr::x(), 1), Expr::x());
        assert_eq!(Expr::neg(Expr::neg(Expr::x())), Expr::x());
    }

    #[test]
    fn eval_matches_hand_computation() {
        // 3*x / sqrt((x - 1)^2 + y^2)
        let e = Expr::div(
            Expr::mul(vec![Expr::num(3.0), Expr::x()]),
            Expr::hypot(Expr::sub(Expr::x(), Expr::num(1.0)), Expr::y()),
        );
        let v = e.eval(4.0, 4.0);
        let expected = 12.0 / 5.0;
        assert!((v - expected).abs() < 1e-5, "got {v}, want {expected}");
    }

    #[test]
    fn powi_handles_negative_exponents() {
        assert_eq!(super::powi(2.0, -2), 0.25);
        assert_eq!(super::powi(-2.0, 3), -8.0);
        assert_eq!(super::powi(5.0, 0), 1.0);
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let sum = Expr::Add(vec![Expr::x(), Expr::num(1.0)]);
        let e = Expr::mul(vec![Expr::num(2.0), sum.clone()]);
        assert_eq!(e.to_string(), "2*(x + 1)");

        let q = Expr::div(Expr::x(), Expr::Mul(vec![Expr::num(2.0), Expr::y()]));
        assert_eq!(q.to_string(), "x/(2*y)");

        let p = Expr::powi(sum, 2);
        assert_eq!(p.to_string(), "(x + 1)^2");
    }

    #[test]
    fn display_renders_subtraction() {
        let e = Expr::sub(Expr::x(), Expr::mul(vec![Expr::num(2.0), Expr::y()]));
        assert_eq!(e.to_string(), "x - 2*y");
    }

    #[test]
    fn large_constants_use_scientific_notation() {
        let e = Expr::num(8.9875517e9);
        let s = e.to_string();
        assert!(s.contains('e'), "expected scientific notation, got {s}");
    }
}
