//! Pan/zoom state and the affine mapping between local (canvas) and screen space.
//!
//! One transform applies to the whole canvas container (nodes and connector overlay alike), so
//! pan/zoom never invalidates connector geometry.

use crate::geom::{self, Point, Rect, Size, Transform, Vector};
use serde::Serialize;

pub const MIN_SCALE: f64 = 0.2;
pub const MAX_SCALE: f64 = 3.0;

pub fn clamp_scale(s: f64) -> f64 {
    if s.is_nan() {
        return MIN_SCALE;
    }
    s.clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pan: Vector,
    scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(geom::vector(0.0, 0.0), 1.0)
    }
}

impl Viewport {
    pub fn new(pan: Vector, scale: f64) -> Self {
        let pan = if pan.x.is_finite() && pan.y.is_finite() {
            pan
        } else {
            geom::vector(0.0, 0.0)
        };
        Self {
            pan,
            scale: clamp_scale(scale),
        }
    }

    pub fn pan(&self) -> Vector {
        self.pan
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_pan(&mut self, pan: Vector) {
        if pan.x.is_finite() && pan.y.is_finite() {
            self.pan = pan;
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = clamp_scale(scale);
        }
    }

    /// Wheel zoom anchored at the local origin: `s' = clamp(s - delta * k)`.
    pub fn zoom(&mut self, wheel_delta: f64, sensitivity: f64) {
        let next = self.scale - wheel_delta * sensitivity;
        if next.is_finite() {
            self.scale = clamp_scale(next);
        } else if wheel_delta.is_finite() {
            // Overflowed toward one side; saturate on that side.
            self.scale = if wheel_delta > 0.0 { MIN_SCALE } else { MAX_SCALE };
        }
    }

    pub fn screen_to_local(&self, p: Point) -> Point {
        ((p - self.pan).to_vector() / self.scale).to_point()
    }

    pub fn local_to_screen(&self, p: Point) -> Point {
        (p.to_vector() * self.scale + self.pan).to_point()
    }

    /// Converts a screen-space displacement into local units (no translation).
    pub fn screen_delta_to_local(&self, d: Vector) -> Vector {
        d / self.scale
    }

    pub fn local_rect_to_screen(&self, r: Rect) -> Rect {
        Rect::new(self.local_to_screen(r.origin), r.size * self.scale)
    }

    /// The shared canvas transform: scale first, then translate by pan.
    pub fn transform(&self) -> Transform {
        Transform::scale(self.scale, self.scale).then_translate(self.pan)
    }

    /// CSS-style transform string for a canvas container with origin at its top-left.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.pan.x, self.pan.y, self.scale
        )
    }

    /// Pans so that `local` lands at the center of a screen of the given size.
    pub fn center_on(&mut self, local: Point, screen: Size) {
        let target = geom::point(screen.width / 2.0, screen.height / 2.0);
        let pan = target - local.to_vector() * self.scale;
        self.set_pan(pan.to_vector());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    #[test]
    fn screen_local_mapping() {
        let vp = Viewport::new(geom::vector(-100.0, -50.0), 0.5);
        let local = vp.screen_to_local(geom::point(0.0, 0.0));
        assert_eq!(local, geom::point(200.0, 100.0));
        assert_eq!(vp.local_to_screen(local), geom::point(0.0, 0.0));
    }

    #[test]
    fn transform_matches_local_to_screen() {
        let vp = Viewport::new(geom::vector(12.0, -7.0), 1.75);
        let p = geom::point(33.0, 44.0);
        let a = vp.transform().transform_point(p);
        let b = vp.local_to_screen(p);
        assert!(approx(a.x, b.x) && approx(a.y, b.y));
    }

    #[test]
    fn zoom_clamps_to_range() {
        let mut vp = Viewport::default();
        vp.zoom(-1e9, 0.001);
        assert_eq!(vp.scale(), MAX_SCALE);
        vp.zoom(1e9, 0.001);
        assert_eq!(vp.scale(), MIN_SCALE);
        vp.zoom(-100.0, 0.001);
        assert!(approx(vp.scale(), 0.3));
    }

    #[test]
    fn zoom_saturates_on_overflow() {
        let mut vp = Viewport::default();
        vp.zoom(f64::MAX, 10.0);
        assert_eq!(vp.scale(), MIN_SCALE);
        vp.zoom(f64::NAN, 1.0);
        assert_eq!(vp.scale(), MIN_SCALE);
    }

    #[test]
    fn new_clamps_initial_scale() {
        assert_eq!(Viewport::new(geom::vector(0.0, 0.0), 10.0).scale(), MAX_SCALE);
        assert_eq!(Viewport::new(geom::vector(0.0, 0.0), 0.0).scale(), MIN_SCALE);
    }

    #[test]
    fn center_on_places_point_mid_screen() {
        let mut vp = Viewport::new(geom::vector(0.0, 0.0), 2.0);
        vp.center_on(geom::point(100.0, 50.0), geom::size(800.0, 600.0));
        assert_eq!(vp.local_to_screen(geom::point(100.0, 50.0)), geom::point(400.0, 300.0));
    }

    #[test]
    fn css_transform_string() {
        let vp = Viewport::new(geom::vector(-100.0, -50.0), 0.55);
        assert_eq!(vp.css_transform(), "translate(-100px, -50px) scale(0.55)");
    }
}
