//! Quiver plots: field vectors sampled on a regular lattice.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::charge::Charge;
use crate::sampler::FieldSampler;

/// Default lattice spacing in pixels.
pub const DEFAULT_SPACING: f64 = 20.0;

/// Field vector `(u, v)` sampled at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuiverArrow {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl QuiverArrow {
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn vector(&self) -> DVec2 {
        DVec2::new(self.u, self.v)
    }
}

/// Samples the field at every interior lattice point `(k * spacing,
/// l * spacing)` of the canvas, column by column.
///
/// Points closer than `spacing` to any charge are skipped so arrows do not
/// cover the charge markers. A non-positive spacing yields nothing.
pub fn quiver<S: FieldSampler + ?Sized>(
    sampler: &S,
    width: f64,
    height: f64,
    spacing: f64,
    charges: &[Charge],
) -> Vec<QuiverArrow> {
    if spacing.is_nan() || spacing <= 0.0 {
        return Vec::new();
    }
    let columns = lattice(width, spacing);
    let rows = lattice(height, spacing);

    let mut arrows = Vec::new();
    for x in &columns {
        for y in &rows {
            let p = DVec2::new(*x, *y);
            if charges.iter().any(|c| c.position().distance(p) < spacing) {
                continue;
            }
            let (u, v) = sampler.evaluate(*x, *y);
            arrows.push(QuiverArrow { x: *x, y: *y, u, v });
        }
    }
    arrows
}

/// Multiples of `spacing` strictly between 0 and `extent`.
fn lattice(extent: f64, spacing: f64) -> Vec<f64> {
    (1..)
        .map(|k| k as f64 * spacing)
        .take_while(|&v| v < extent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ElectrostaticField;

    #[test]
    fn lattice_excludes_edges() {
        assert_eq!(lattice(60.0, 20.0), vec![20.0, 40.0]);
        assert_eq!(lattice(61.0, 20.0), vec![20.0, 40.0, 60.0]);
        assert!(lattice(10.0, 20.0).is_empty());
    }

    #[test]
    fn empty_scene_samples_every_point() {
        let field = ElectrostaticField::default();
        let arrows = quiver(&field, 100.0, 60.0, 20.0, &[]);
        // 4 columns (20..80) by 2 rows (20, 40).
        assert_eq!(arrows.len(), 8);
        assert!(arrows.iter().all(|a| a.u == 0.0 && a.v == 0.0));
        assert_eq!((arrows[0].x, arrows[0].y), (20.0, 20.0));
        assert_eq!((arrows[1].x, arrows[1].y), (20.0, 40.0));
    }

    #[test]
    fn points_near_charges_are_skipped() {
        let charges = [Charge::new(40.0, 40.0, 1.0, 0)];
        let field = ElectrostaticField::new(charges.to_vec());
        let arrows = quiver(&field, 100.0, 100.0, 20.0, &charges);
        assert_eq!(arrows.len(), 16 - 1);
        assert!(arrows.iter().all(|a| a.position().distance(charges[0].position()) >= 20.0));
        // Every sampled vector points away from the positive charge.
        for a in &arrows {
            assert!(a.vector().dot(a.position() - charges[0].position()) > 0.0);
        }
    }

    #[test]
    fn non_positive_spacing_yields_nothing() {
        let field = ElectrostaticField::default();
        assert!(quiver(&field, 100.0, 100.0, 0.0, &[]).is_empty());
        assert!(quiver(&field, 100.0, 100.0, f64::NAN, &[]).is_empty());
    }
}
