//! Point charges (or line currents) and capture-disk membership.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Unique identifier of a charge within one scene.
pub type ChargeId = u32;

/// A point charge in canvas pixel coordinates.
///
/// The sign of `charge` decides the direction lines are traced from it
/// (positive charges are sources, negative charges are sinks). The magnitude
/// decides how many lines it carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub x: f64,
    pub y: f64,
    pub charge: f64,
    pub id: ChargeId,
}

impl Charge {
    pub fn new(x: f64, y: f64, charge: f64, id: ChargeId) -> Self {
        Self { x, y, charge, id }
    }

    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Whether this charge can emit or absorb field lines.
    pub fn is_neutral(&self) -> bool {
        self.charge == 0.0
    }

    /// Integration direction for lines leaving this charge: `+1` follows the
    /// field outward, `-1` walks against it.
    pub fn step_sign(&self) -> f64 {
        if self.charge >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Number of field lines this charge carries, `floor(|q| * lines_per_unit)`.
    pub fn num_departures(&self, lines_per_unit: f64) -> usize {
        (self.charge.abs() * lines_per_unit).floor() as usize
    }
}

/// Returns the index of the charge whose capture disk strictly contains
/// `point`, or `None`.
///
/// Charges are searched from last to first so the one drawn on top wins when
/// disks overlap. `exclude` skips one index (the charge a line departed
/// from); neutral charges never capture.
pub fn charge_at_point(
    charges: &[Charge],
    point: DVec2,
    radius: f64,
    exclude: Option<usize>,
) -> Option<usize> {
    charges
        .iter()
        .enumerate()
        .rev()
        .filter(|(i, c)| Some(*i) != exclude && !c.is_neutral())
        .find(|(_, c)| c.position().distance(point) < radius)
        .map(|(i, _)| i)
}

/// Checks that every charge is finite and that ids are unique.
pub fn validate_charges(charges: &[Charge]) -> Result<(), FieldError> {
    let mut ids: Vec<ChargeId> = Vec::with_capacity(charges.len());
    for c in charges {
        if !(c.x.is_finite() && c.y.is_finite() && c.charge.is_finite()) {
            return Err(FieldError::NonFiniteCharge { id: c.id });
        }
        if ids.contains(&c.id) {
            return Err(FieldError::DuplicateChargeId(c.id));
        }
        ids.push(c.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Vec<Charge> {
        vec![
            Charge::new(100.0, 100.0, 1.0, 0),
            Charge::new(105.0, 100.0, -1.0, 1),
        ]
    }

    #[test]
    fn num_departures_floors_scaled_magnitude() {
        assert_eq!(Charge::new(0.0, 0.0, 2.0, 0).num_departures(4.0), 8);
        assert_eq!(Charge::new(0.0, 0.0, -1.3, 0).num_departures(4.0), 5);
        assert_eq!(Charge::new(0.0, 0.0, 0.2, 0).num_departures(4.0), 0);
    }

    #[test]
    fn step_sign_follows_polarity() {
        assert_eq!(Charge::new(0.0, 0.0, 3.0, 0).step_sign(), 1.0);
        assert_eq!(Charge::new(0.0, 0.0, -3.0, 0).step_sign(), -1.0);
    }

    #[test]
    fn charge_at_point_prefers_topmost() {
        let charges = pair();
        // (103, 100) lies inside both disks; the later charge is on top.
        assert_eq!(charge_at_point(&charges, DVec2::new(103.0, 100.0), 10.0, None), Some(1));
    }

    #[test]
    fn charge_at_point_honours_exclusion() {
        let charges = pair();
        let p = DVec2::new(103.0, 100.0);
        assert_eq!(charge_at_point(&charges, p, 10.0, Some(1)), Some(0));
    }

    #[test]
    fn charge_at_point_is_strict_and_misses_far_points() {
        let charges = vec![Charge::new(0.0, 0.0, 1.0, 0)];
        assert_eq!(charge_at_point(&charges, DVec2::new(10.0, 0.0), 10.0, None), None);
        assert_eq!(charge_at_point(&charges, DVec2::new(50.0, 50.0), 10.0, None), None);
    }

    #[test]
    fn neutral_charges_never_capture() {
        let charges = vec![Charge::new(0.0, 0.0, 0.0, 0)];
        assert_eq!(charge_at_point(&charges, DVec2::ZERO, 10.0, None), None);
    }

    #[test]
    fn validate_rejects_duplicates_and_nan() {
        let dup = vec![Charge::new(0.0, 0.0, 1.0, 3), Charge::new(1.0, 0.0, 1.0, 3)];
        assert!(matches!(validate_charges(&dup), Err(FieldError::DuplicateChargeId(3))));

        let nan = vec![Charge::new(f64::NAN, 0.0, 1.0, 9)];
        assert!(matches!(
            validate_charges(&nan),
            Err(FieldError::NonFiniteCharge { id: 9 })
        ));

        assert!(validate_charges(&pair()).is_ok());
    }

    #[test]
    fn charge_json_uses_plain_field_names() {
        let c = Charge::new(1.5, 2.5, -1.0, 7);
        let v = serde_json::to_value(c).unwrap();
        assert_eq!(v["x"], 1.5);
        assert_eq!(v["y"], 2.5);
        assert_eq!(v["charge"], -1.0);
        assert_eq!(v["id"], 7);
    }
}
