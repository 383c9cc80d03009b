//! Pixel-grid sampling of field magnitudes.
//!
//! [`GridSpec`] maps between a pixel grid and a rectangle of the simulation
//! plane. Repeated jittered passes through [`accumulate_magnitudes`]
//! converge to an antialiased magnitude image; a single unjittered pass is
//! exact direct evaluation at pixel centres.

use libm::log1pf;

use crate::error::FieldError;
use crate::field::ChargeSet;
use crate::math::{Rect, Vec2};
use crate::rng::Rng;

/// A pixel grid laid over a rectangle of the simulation plane.
///
/// Rows follow image convention: row 0 is the top of `bounds`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridSpec {
    pub bounds: Rect,
    pub width: u32,
    pub height: u32,
}

impl GridSpec {
    pub fn new(bounds: Rect, width: u32, height: u32) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::DegenerateGrid { width, height });
        }
        if !bounds.is_finite() {
            return Err(FieldError::NonFinite { what: "bounds" });
        }
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(FieldError::EmptyBounds);
        }
        Ok(Self {
            bounds,
            width,
            height,
        })
    }

    /// Total number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        // Constructor rejects zero dimensions; kept for the usual len/is_empty pairing.
        self.len() == 0
    }

    /// Plane extent of one pixel.
    #[inline]
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.bounds.width() / self.width as f32,
            self.bounds.height() / self.height as f32,
        )
    }

    /// Flat buffer index of pixel `(ix, iy)`.
    #[inline]
    pub fn index(&self, ix: u32, iy: u32) -> usize {
        iy as usize * self.width as usize + ix as usize
    }

    /// Plane position of the centre of pixel `(ix, iy)`.
    #[inline]
    pub fn pixel_center(&self, ix: u32, iy: u32) -> Vec2 {
        let d = self.pixel_size();
        Vec2::new(
            self.bounds.min.x + (ix as f32 + 0.5) * d.x,
            self.bounds.max.y - (iy as f32 + 0.5) * d.y,
        )
    }

    /// Plane position inside pixel `(ix, iy)`, offset by up to `jitter`
    /// pixel-widths from the centre. `jitter = 0` reproduces the centre.
    #[inline]
    pub fn jittered_point(&self, ix: u32, iy: u32, jitter: f32, rng: &mut Rng) -> Vec2 {
        let d = self.pixel_size();
        let c = self.pixel_center(ix, iy);
        let jx = rng.uniform_range(-0.5, 0.5) * jitter * d.x;
        let jy = rng.uniform_range(-0.5, 0.5) * jitter * d.y;
        c + Vec2::new(jx, jy)
    }

    /// Map a plane position to (fractional) pixel coordinates.
    #[inline]
    pub fn to_pixel(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            (p.x - self.bounds.min.x) / self.bounds.width() * self.width as f32,
            (self.bounds.max.y - p.y) / self.bounds.height() * self.height as f32,
        )
    }
}

/// Add one magnitude sample per pixel into `accum`/`counts`.
///
/// Buffers must be `spec.len()` long. Each call is one supersampling pass;
/// the running mean `accum[i] / counts[i]` converges to the pixel's average
/// magnitude as passes accumulate.
pub fn accumulate_magnitudes(
    set: &ChargeSet,
    spec: &GridSpec,
    jitter: f32,
    rng: &mut Rng,
    accum: &mut [f32],
    counts: &mut [u32],
) {
    debug_assert_eq!(accum.len(), spec.len(), "accumulation buffer size mismatch");
    debug_assert_eq!(counts.len(), spec.len(), "count buffer size mismatch");
    for iy in 0..spec.height {
        for ix in 0..spec.width {
            let p = if jitter > 0.0 {
                spec.jittered_point(ix, iy, jitter, rng)
            } else {
                spec.pixel_center(ix, iy)
            };
            let idx = spec.index(ix, iy);
            accum[idx] += set.field_magnitude(p);
            counts[idx] += 1;
        }
    }
}

/// `ln(1 + v)` tone-mapping helper.
///
/// Field magnitudes span many decades, so linear color scales render as a
/// bright dot on black; log compression keeps structure visible.
#[inline]
pub fn log_compress(v: f32) -> f32 {
    log1pf(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charge::PointCharge;
    use alloc::boxed::Box;
    use alloc::vec;

    fn spec_2x2() -> GridSpec {
        GridSpec::new(Rect::centered(1.0), 2, 2).unwrap()
    }

    #[test]
    fn constructor_rejects_bad_shapes() {
        assert_eq!(
            GridSpec::new(Rect::centered(1.0), 0, 4),
            Err(FieldError::DegenerateGrid { width: 0, height: 4 })
        );
        let inverted = Rect::new(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
        assert_eq!(GridSpec::new(inverted, 4, 4), Err(FieldError::EmptyBounds));
    }

    #[test]
    fn pixel_centers_follow_image_convention() {
        let spec = spec_2x2();
        // Row 0 is the top half; column 0 the left half.
        assert_eq!(spec.pixel_center(0, 0), Vec2::new(-0.5, 0.5));
        assert_eq!(spec.pixel_center(1, 1), Vec2::new(0.5, -0.5));
    }

    #[test]
    fn to_pixel_inverts_pixel_center() {
        let spec = GridSpec::new(Rect::centered(2.0), 64, 32).unwrap();
        let p = spec.pixel_center(10, 20);
        let px = spec.to_pixel(p);
        assert!((px.x - 10.5).abs() < 1e-4);
        assert!((px.y - 20.5).abs() < 1e-4);
    }

    #[test]
    fn unjittered_pass_reproduces_direct_evaluation() {
        let spec = spec_2x2();
        let mut set = ChargeSet::new();
        set.push(Box::new(PointCharge::new(Vec2::new(0.0, 0.0), 1e-9)));

        let mut accum = vec![0.0f32; spec.len()];
        let mut counts = vec![0u32; spec.len()];
        let mut rng = Rng::seed_from(1);
        accumulate_magnitudes(&set, &spec, 0.0, &mut rng, &mut accum, &mut counts);

        for iy in 0..2 {
            for ix in 0..2 {
                let idx = spec.index(ix, iy);
                assert_eq!(counts[idx], 1);
                let direct = set.field_magnitude(spec.pixel_center(ix, iy));
                assert_eq!(accum[idx], direct);
            }
        }
    }

    #[test]
    fn jittered_samples_stay_inside_their_pixel() {
        let spec = spec_2x2();
        let mut rng = Rng::seed_from(9);
        for _ in 0..128 {
            let p = spec.jittered_point(0, 0, 1.0, &mut rng);
            assert!(p.x >= -1.0 && p.x <= 0.0);
            assert!(p.y >= 0.0 && p.y <= 1.0);
        }
    }
}
