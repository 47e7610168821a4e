//! Field samplers: the physics collaborator consumed by tracing and contouring.
//!
//! A [`FieldSampler`] returns the field vector `(u, v)` at any canvas point.
//! Within one tracing pass it must behave as a pure function of `(x, y)`;
//! hosts that evolve the field over time do so through [`FieldSampler::tick`]
//! between passes.
//!
//! Two direct-summation samplers are provided: [`ElectrostaticField`] (a
//! softened Coulomb sum) and [`MagnetostaticField`] (the in-plane field of
//! line currents, obtained by rotating the Coulomb field of the same sources).

use crate::charge::Charge;

/// Source of 2D field vectors.
pub trait FieldSampler {
    /// Field vector at `(x, y)`.
    fn evaluate(&self, x: f64, y: f64) -> (f64, f64);

    /// Advances time-dependent state by `dt`. Static fields ignore it.
    fn tick(&mut self, _dt: f64) {}
}

/// A sampler that also exposes a scalar potential whose level sets are drawn
/// as contours.
pub trait PotentialSampler: FieldSampler {
    /// Scalar potential at `(x, y)`.
    fn potential(&self, x: f64, y: f64) -> f64;

    /// Gradient of [`PotentialSampler::potential`] at `(x, y)`.
    fn potential_gradient(&self, x: f64, y: f64) -> (f64, f64);
}

/// Scale applied to every charge so that fields are O(1) at typical pixel
/// distances.
pub const FIELD_SCALING: f64 = 20000.0;

/// Squared-distance softening (px²) that keeps the field finite at a charge.
pub const SOFTENING: f64 = 5.0;

/// Softened Coulomb field of a set of point charges.
///
/// The potential uses the convention `φ = -k q / r`, so the field is `+∇φ`.
#[derive(Debug, Clone, Default)]
pub struct ElectrostaticField {
    charges: Vec<Charge>,
}

/// In-plane magnetic field of line currents perpendicular to the canvas.
///
/// Each charge's magnitude is read as a current. The field is `ẑ × ∇φ` where
/// `φ` is the electrostatic potential the currents would produce as charges,
/// so the contours of `φ` are the magnetic field lines.
#[derive(Debug, Clone, Default)]
pub struct MagnetostaticField {
    sources: ElectrostaticField,
}

impl ElectrostaticField {
    pub fn new(charges: Vec<Charge>) -> Self {
        Self { charges }
    }

    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    /// Replaces the source charges.
    pub fn set_charges(&mut self, charges: Vec<Charge>) {
        self.charges = charges;
    }
}

impl MagnetostaticField {
    pub fn new(currents: Vec<Charge>) -> Self {
        Self {
            sources: ElectrostaticField::new(currents),
        }
    }

    pub fn currents(&self) -> &[Charge] {
        self.sources.charges()
    }

    pub fn set_currents(&mut self, currents: Vec<Charge>) {
        self.sources.set_charges(currents);
    }
}

impl FieldSampler for ElectrostaticField {
    fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        self.charges.iter().fold((0.0, 0.0), |(u, v), c| {
            let dx = x - c.x;
            let dy = y - c.y;
            let r = (dx * dx + dy * dy + SOFTENING).sqrt();
            let k = FIELD_SCALING * c.charge / (r * r * r);
            (u + k * dx, v + k * dy)
        })
    }
}

impl PotentialSampler for ElectrostaticField {
    fn potential(&self, x: f64, y: f64) -> f64 {
        self.charges.iter().fold(0.0, |acc, c| {
            let dx = x - c.x;
            let dy = y - c.y;
            acc - FIELD_SCALING * c.charge / (dx * dx + dy * dy + SOFTENING).sqrt()
        })
    }

    fn potential_gradient(&self, x: f64, y: f64) -> (f64, f64) {
        self.evaluate(x, y)
    }
}

impl FieldSampler for MagnetostaticField {
    fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        let (u, v) = self.sources.evaluate(x, y);
        (v, -u)
    }
}

impl PotentialSampler for MagnetostaticField {
    fn potential(&self, x: f64, y: f64) -> f64 {
        self.sources.potential(x, y)
    }

    fn potential_gradient(&self, x: f64, y: f64) -> (f64, f64) {
        self.sources.evaluate(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(q: f64) -> ElectrostaticField {
        ElectrostaticField::new(vec![Charge::new(0.0, 0.0, q, 0)])
    }

    #[test]
    fn positive_charge_field_points_outward() {
        let (u, v) = single(1.0).evaluate(30.0, 40.0);
        assert!(u > 0.0 && v > 0.0, "expected outward field, got ({u}, {v})");
        assert!((v / u - 40.0 / 30.0).abs() < 1e-9, "field not radial");
    }

    #[test]
    fn negative_charge_field_points_inward() {
        let (u, _) = single(-1.0).evaluate(30.0, 0.0);
        assert!(u < 0.0, "expected inward field, got u={u}");
    }

    #[test]
    fn field_is_finite_at_the_charge() {
        let (u, v) = single(5.0).evaluate(0.0, 0.0);
        assert_eq!((u, v), (0.0, 0.0));
    }

    #[test]
    fn field_falls_off_as_inverse_square() {
        let f = single(1.0);
        let (u1, _) = f.evaluate(100.0, 0.0);
        let (u2, _) = f.evaluate(200.0, 0.0);
        let ratio = u1 / u2;
        assert!((ratio - 4.0).abs() < 0.01, "expected ~4x, got {ratio}");
    }

    #[test]
    fn equal_and_opposite_charges_cancel_perpendicular_component_on_bisector() {
        let f = ElectrostaticField::new(vec![
            Charge::new(-50.0, 0.0, 1.0, 0),
            Charge::new(50.0, 0.0, -1.0, 1),
        ]);
        let (u, v) = f.evaluate(0.0, 30.0);
        assert!(u > 0.0, "dipole field on bisector points from + to -");
        assert!(v.abs() < 1e-12, "vertical components should cancel, got {v}");
    }

    #[test]
    fn potential_gradient_matches_finite_difference() {
        let f = ElectrostaticField::new(vec![
            Charge::new(10.0, 20.0, 1.0, 0),
            Charge::new(80.0, -15.0, -2.0, 1),
        ]);
        let (x, y, h) = (40.0, 35.0, 1e-4);
        let (gx, gy) = f.potential_gradient(x, y);
        let fd_x = (f.potential(x + h, y) - f.potential(x - h, y)) / (2.0 * h);
        let fd_y = (f.potential(x, y + h) - f.potential(x, y - h)) / (2.0 * h);
        assert!((gx - fd_x).abs() < 1e-6 * gx.abs().max(1.0), "{gx} vs {fd_x}");
        assert!((gy - fd_y).abs() < 1e-6 * gy.abs().max(1.0), "{gy} vs {fd_y}");
    }

    #[test]
    fn magnetostatic_field_circulates_around_current() {
        let m = MagnetostaticField::new(vec![Charge::new(0.0, 0.0, 1.0, 0)]);
        let (u, v) = m.evaluate(20.0, 0.0);
        // Radial direction is +x; the field must be perpendicular to it.
        assert!(u.abs() < 1e-12, "expected tangential field, got u={u}");
        assert!(v < 0.0, "positive current circulates clockwise in canvas space");
    }

    #[test]
    fn magnetostatic_field_is_tangent_to_potential_contours() {
        let m = MagnetostaticField::new(vec![
            Charge::new(0.0, 0.0, 1.0, 0),
            Charge::new(60.0, 10.0, -1.0, 1),
        ]);
        let (u, v) = m.evaluate(25.0, 40.0);
        let (gx, gy) = m.potential_gradient(25.0, 40.0);
        assert!((u * gx + v * gy).abs() < 1e-9);
    }

    #[test]
    fn static_tick_is_a_no_op() {
        let mut f = single(1.0);
        let before = f.evaluate(10.0, 5.0);
        f.tick(0.016);
        assert_eq!(before, f.evaluate(10.0, 5.0));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fields_are_finite_everywhere(
                x in -1e4_f64..1e4,
                y in -1e4_f64..1e4,
                q in -10.0_f64..10.0,
            ) {
                let e = ElectrostaticField::new(vec![Charge::new(0.0, 0.0, q, 0)]);
                let m = MagnetostaticField::new(vec![Charge::new(0.0, 0.0, q, 0)]);
                let (u, v) = e.evaluate(x, y);
                prop_assert!(u.is_finite() && v.is_finite());
                let (u, v) = m.evaluate(x, y);
                prop_assert!(u.is_finite() && v.is_finite());
                prop_assert!(e.potential(x, y).is_finite());
            }
        }
    }
}
