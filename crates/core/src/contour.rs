//! Equipotential contours, and magnetostatic field lines drawn as contours.
//!
//! [`PotentialContourAdapter`] scans a coarse [`ContourGrid`] for cells whose
//! corner potentials straddle a requested level, seeds a contour in each such
//! cell, snaps the seed onto the level, and walks along the level set with a
//! predictor-corrector step perpendicular to the potential gradient. Contours
//! end when they return to their seed (closed) or leave the padded grid, in
//! which case the opposite direction is traced too and prepended.
//!
//! Magnetostatic field lines are the level sets of the electrostatic
//! potential of the currents, so the same adapter draws both. For those
//! plots [`PotentialContourAdapter::contours_with_arrows`] also marks where
//! each contour crosses a symmetry line of the configuration.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::charge::Charge;
use crate::error::FieldError;
use crate::sampler::PotentialSampler;

/// Contour step length in pixels.
const STEP_SIZE: f64 = 0.5;
/// Keep every n-th integration point.
const SAMPLE_EVERY: usize = 10;
/// Distance to the seed at which a contour counts as closed.
const FINISH_TOLERANCE: f64 = 0.5;
/// Steps before closure is checked.
const MIN_STEPS: usize = 20;
/// Hard cap on steps per direction.
const MAX_STEPS: usize = 10_000;
/// Potential drift that triggers re-snapping onto the level.
const DRIFT_TOLERANCE: f64 = 0.1;
/// Accuracy of the crossing-point search, in potential units.
const CROSSING_TOLERANCE: f64 = 1e-4;
/// Iteration cap for each phase of the crossing-point search.
const MAX_CROSSING_STEPS: usize = 200;
/// Gradient magnitude below which the crossing search gives up.
const MIN_GRADIENT: f64 = 1e-6;
/// Contours per plot.
const MAX_CONTOURS: usize = 50;
/// Seeds closer than this (squared px) to a charge are skipped.
const SEED_EXCLUSION_SQ: f64 = 100.0;
/// Contours that never get farther than this (squared px) from a charge are
/// dropped.
const MIN_EXTENT_SQ: f64 = 150.0;
/// Contour segments skipped after placing an arrow.
const ARROW_COOLDOWN: usize = 10;

/// Potential levels drawn behind other plots: the zero level, then positive
/// and negative levels.
pub const POTENTIAL_LEVELS: [f64; 9] = [
    0.0, 125.0, 250.0, 500.0, 1000.0, -125.0, -250.0, -500.0, -1000.0,
];

/// Levels at which magnetostatic field lines are drawn: `±10^e` for
/// `e = 1.4, 1.8, ..., 3.8`, then zero.
pub fn field_line_levels() -> Vec<f64> {
    let mut levels = Vec::new();
    for k in 0..7 {
        let magnitude = 10f64.powf(1.4 + 0.4 * k as f64);
        levels.push(magnitude);
        levels.push(-magnitude);
    }
    levels.push(0.0);
    levels
}

/// Coarse cell grid covering the canvas plus `boundary` cells of padding on
/// every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourGrid {
    width: f64,
    height: f64,
    nx: usize,
    ny: usize,
    boundary: usize,
}

impl ContourGrid {
    /// `nx` by `ny` cells in total, an eighth of `nx` of them padding on each
    /// side.
    ///
    /// Returns `FieldError::InvalidDimensions` if the canvas is not positive
    /// or the padding leaves no interior cells.
    pub fn new(width: f64, height: f64, nx: usize, ny: usize) -> Result<Self, FieldError> {
        let boundary = nx / 8;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
            || nx <= 2 * boundary
            || ny <= 2 * boundary
        {
            return Err(FieldError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            nx,
            ny,
            boundary,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn delta_x(&self) -> f64 {
        self.width / (self.nx - 2 * self.boundary) as f64
    }

    pub fn delta_y(&self) -> f64 {
        self.height / (self.ny - 2 * self.boundary) as f64
    }

    fn origin(&self, i: usize, j: usize) -> DVec2 {
        DVec2::new(
            (i as f64 - self.boundary as f64) * self.delta_x(),
            (j as f64 - self.boundary as f64) * self.delta_y(),
        )
    }

    pub fn cell_corners(&self, i: usize, j: usize) -> [DVec2; 4] {
        let o = self.origin(i, j);
        let (dx, dy) = (self.delta_x(), self.delta_y());
        [
            o,
            o + DVec2::new(dx, 0.0),
            o + DVec2::new(0.0, dy),
            o + DVec2::new(dx, dy),
        ]
    }

    pub fn cell_centroid(&self, i: usize, j: usize) -> DVec2 {
        self.origin(i, j) + 0.5 * DVec2::new(self.delta_x(), self.delta_y())
    }

    /// The cell containing `p` and its eight neighbours, clipped to the grid.
    pub fn surrounding_cells(&self, p: DVec2) -> Vec<(usize, usize)> {
        let ci = (p.x / self.delta_x()).floor() as isize + self.boundary as isize;
        let cj = (p.y / self.delta_y()).floor() as isize + self.boundary as isize;
        let mut cells = Vec::with_capacity(9);
        for i in ci - 1..=ci + 1 {
            for j in cj - 1..=cj + 1 {
                if i >= 0 && j >= 0 && (i as usize) < self.nx && (j as usize) < self.ny {
                    cells.push((i as usize, j as usize));
                }
            }
        }
        cells
    }

    /// Whether `p` lies on the padded grid (edges included).
    pub fn contains(&self, p: DVec2) -> bool {
        let min = self.origin(0, 0);
        let max = self.origin(self.nx, self.ny);
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }
}

/// One level-set polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub level: f64,
    pub points: Vec<DVec2>,
    /// Returned to its seed rather than leaving the grid.
    pub closed: bool,
}

/// Contours plus arrow positions for field-line style drawing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourPlot {
    pub contours: Vec<Contour>,
    pub arrows: Vec<DVec2>,
}

/// Draws level sets of a [`PotentialSampler`] over a [`ContourGrid`].
pub struct PotentialContourAdapter<'a, S: PotentialSampler + ?Sized> {
    sampler: &'a S,
    charges: &'a [Charge],
    grid: ContourGrid,
}

impl<'a, S: PotentialSampler + ?Sized> PotentialContourAdapter<'a, S> {
    pub fn new(sampler: &'a S, charges: &'a [Charge], grid: ContourGrid) -> Self {
        Self {
            sampler,
            charges,
            grid,
        }
    }

    /// Contours at the given levels, at most one per connected crossing
    /// region of the grid and at most 50 in total.
    pub fn contours_at_levels(&self, levels: &[f64]) -> Vec<Contour> {
        if self.charges.is_empty() || levels.is_empty() {
            return Vec::new();
        }

        let (nx, ny) = (self.grid.nx, self.grid.ny);
        let mut crossing: Vec<Option<f64>> = (0..nx * ny)
            .map(|idx| self.first_crossing_level(idx / ny, idx % ny, levels))
            .collect();

        let mut contours = Vec::new();
        while contours.len() < MAX_CONTOURS {
            let Some(idx) = crossing.iter().position(Option::is_some) else {
                break;
            };
            let Some(level) = crossing[idx].take() else {
                break;
            };

            let centroid = self.grid.cell_centroid(idx / ny, idx % ny);
            if self.distance_sq_to_closest_charge(centroid) < SEED_EXCLUSION_SQ {
                continue;
            }

            let seed = self.find_crossing_point(level, centroid);
            let contour = self.trace_contour(seed, level);

            let mut max_distance_sq: f64 = 0.0;
            for p in &contour.points {
                max_distance_sq = max_distance_sq.max(self.distance_sq_to_closest_charge(*p));
                for (i, j) in self.grid.surrounding_cells(*p) {
                    let cell = &mut crossing[i * ny + j];
                    if *cell == Some(level) {
                        *cell = None;
                    }
                }
            }

            if max_distance_sq > MIN_EXTENT_SQ {
                contours.push(contour);
            }
        }
        contours
    }

    /// Contours at `levels` plus arrow positions where they cross a symmetry
    /// line of the charges. After each arrow the next ten segments are
    /// skipped.
    pub fn contours_with_arrows(&self, levels: &[f64]) -> ContourPlot {
        let contours = self.contours_at_levels(levels);
        let mut arrows = Vec::new();
        let mut cooldown = 0;
        for contour in &contours {
            for pair in contour.points.windows(2) {
                if cooldown > 0 {
                    cooldown -= 1;
                    continue;
                }
                if let Some(p) = symmetry_crossing(self.charges, pair[0], pair[1]) {
                    arrows.push(p);
                    cooldown = ARROW_COOLDOWN;
                }
            }
        }
        ContourPlot { contours, arrows }
    }

    /// First level whose value lies strictly between some corner potentials.
    fn first_crossing_level(&self, i: usize, j: usize, levels: &[f64]) -> Option<f64> {
        let potentials = self
            .grid
            .cell_corners(i, j)
            .map(|c| self.sampler.potential(c.x, c.y));
        levels.iter().copied().find(|&level| {
            let any_above = potentials.iter().any(|&p| p > level);
            let all_above = potentials.iter().all(|&p| p > level);
            any_above != all_above
        })
    }

    fn distance_sq_to_closest_charge(&self, p: DVec2) -> f64 {
        self.charges
            .iter()
            .map(|c| c.position().distance_squared(p))
            .fold(f64::INFINITY, f64::min)
    }

    fn gradient(&self, p: DVec2) -> DVec2 {
        let (u, v) = self.sampler.potential_gradient(p.x, p.y);
        DVec2::new(u, v)
    }

    /// Level-set direction at `p`: the gradient turned a quarter turn.
    fn tangent(&self, p: DVec2) -> Option<DVec2> {
        self.gradient(p).perp().try_normalize()
    }

    /// Walks the level set from `seed` forward and, if the contour does not
    /// close, backward as well.
    fn trace_contour(&self, seed: DVec2, level: f64) -> Contour {
        let (mut points, closed) = self.walk(seed, level, STEP_SIZE);
        if !closed {
            let (mut backward, _) = self.walk(seed, level, -STEP_SIZE);
            backward.reverse();
            // Both walks start with the seed; keep it once.
            backward.pop();
            backward.append(&mut points);
            points = backward;
        }
        Contour {
            level,
            points,
            closed,
        }
    }

    /// One direction of a contour. Returns the sampled points and whether
    /// the walk closed on its seed.
    fn walk(&self, seed: DVec2, level: f64, step: f64) -> (Vec<DVec2>, bool) {
        let mut p = seed;
        let mut points = vec![seed];
        let mut closed = false;

        for n in 1..=MAX_STEPS {
            let Some(dir) = self.tangent(p) else {
                break;
            };
            let predicted = p + step * dir;
            p = match self.tangent(predicted) {
                Some(dir2) => predicted + 0.5 * step * (dir2 - dir),
                None => predicted,
            };

            if (self.sampler.potential(p.x, p.y) - level).abs() > DRIFT_TOLERANCE {
                p = self.find_crossing_point(level, p);
            }

            if n % SAMPLE_EVERY == 0 {
                points.push(p);
            }
            if !self.grid.contains(p) {
                break;
            }
            if n > MIN_STEPS && p.distance(seed) < FINISH_TOLERANCE {
                closed = true;
                break;
            }
        }

        if points.last() != Some(&p) {
            points.push(p);
        }
        (points, closed)
    }

    /// A point near `start` where the potential equals `level`.
    ///
    /// Newton-like steps along the gradient, lengthened by half, overshoot
    /// the level; bisection between `start` and the overshoot then pins it
    /// down. Gives back `start` if the gradient vanishes or the overshoot
    /// phase does not cross.
    pub fn find_crossing_point(&self, level: f64, start: DVec2) -> DVec2 {
        let mut potential = self.sampler.potential(start.x, start.y);
        if (potential - level).abs() < CROSSING_TOLERANCE {
            return start;
        }
        let side = (potential - level).signum();

        let mut p = start;
        let mut steps = 0;
        while (potential - level).signum() == side {
            let g = self.gradient(p);
            let r2 = g.length_squared();
            if r2.sqrt() < MIN_GRADIENT || steps > MAX_CROSSING_STEPS {
                return start;
            }
            p -= 1.5 * (potential - level) * g / r2;
            potential = self.sampler.potential(p.x, p.y);
            steps += 1;
        }

        let (mut near, mut far) = (start, p);
        let mut mid = p;
        steps = 0;
        while (potential - level).abs() > CROSSING_TOLERANCE && steps <= MAX_CROSSING_STEPS {
            mid = 0.5 * (near + far);
            potential = self.sampler.potential(mid.x, mid.y);
            if (potential - level).signum() == side {
                near = mid;
            } else {
                far = mid;
            }
            steps += 1;
        }
        mid
    }
}

/// Where segment `p0`-`p1` crosses a symmetry line of `charges`, if it does.
///
/// A lone charge uses the horizontal line through it. Otherwise charges are
/// paired greedily, each with the unpaired partner scoring highest on
/// `(1.3 - q_i q_j) / r²` (pairs scoring zero or less are never formed), and
/// the line through each pair is tested in turn. The first crossing wins.
pub fn symmetry_crossing(charges: &[Charge], p0: DVec2, p1: DVec2) -> Option<DVec2> {
    let crossing = |a: DVec2, b: DVec2| -> Option<DVec2> {
        let axis = b - a;
        let side = |p: DVec2| (p - a).perp_dot(axis);
        let (f0, f1) = (side(p0), side(p1));
        if f0.signum() != f1.signum() {
            let t = f0 / (f0 - f1);
            Some(p0 + t * (p1 - p0))
        } else {
            None
        }
    };

    match charges {
        [] => None,
        [only] => crossing(only.position(), only.position() + DVec2::X),
        _ => {
            let mut paired = vec![false; charges.len()];
            for i in 0..charges.len() {
                if paired[i] {
                    continue;
                }
                let mut best: Option<(usize, f64)> = None;
                for j in 0..charges.len() {
                    if j == i || paired[j] {
                        continue;
                    }
                    let score = pair_score(&charges[i], &charges[j]);
                    if score > best.map_or(0.0, |(_, s)| s) {
                        best = Some((j, score));
                    }
                }
                let Some((j, _)) = best else {
                    continue;
                };
                paired[i] = true;
                paired[j] = true;
                if let Some(p) = crossing(charges[i].position(), charges[j].position()) {
                    return Some(p);
                }
            }
            None
        }
    }
}

/// Favors close pairs of opposite or small charges.
fn pair_score(a: &Charge, b: &Charge) -> f64 {
    (1.3 - a.charge * b.charge) / a.position().distance_squared(b.position())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{ElectrostaticField, MagnetostaticField};

    fn grid_400() -> ContourGrid {
        ContourGrid::new(400.0, 400.0, 20, 20).unwrap()
    }

    // -- Grid --

    #[test]
    fn grid_geometry_includes_padding() {
        let g = grid_400();
        assert_eq!(g.delta_x(), 25.0);
        assert_eq!(g.cell_corners(0, 0)[0], DVec2::new(-50.0, -50.0));
        assert_eq!(g.cell_centroid(2, 2), DVec2::new(12.5, 12.5));
        assert!(g.contains(DVec2::new(450.0, -50.0)));
        assert!(!g.contains(DVec2::new(450.1, 0.0)));
    }

    #[test]
    fn surrounding_cells_are_clipped() {
        let g = grid_400();
        assert_eq!(g.surrounding_cells(DVec2::new(100.0, 100.0)).len(), 9);
        assert_eq!(g.surrounding_cells(DVec2::new(-49.0, -49.0)).len(), 4);
    }

    #[test]
    fn grid_rejects_degenerate_sizes() {
        assert!(matches!(
            ContourGrid::new(0.0, 100.0, 20, 20),
            Err(FieldError::InvalidDimensions)
        ));
        assert!(ContourGrid::new(100.0, 100.0, 1, 1).is_ok());
    }

    // -- Levels --

    #[test]
    fn field_line_levels_are_symmetric_with_zero() {
        let levels = field_line_levels();
        assert_eq!(levels.len(), 15);
        assert_eq!(*levels.last().unwrap(), 0.0);
        assert!((levels[0] - 10f64.powf(1.4)).abs() < 1e-9);
        for pair in levels[..14].chunks(2) {
            assert_eq!(pair[0], -pair[1]);
        }
    }

    // -- Crossing search --

    #[test]
    fn crossing_point_lands_on_level() {
        let charges = [Charge::new(200.0, 200.0, 1.0, 0)];
        let field = ElectrostaticField::new(charges.to_vec());
        let adapter = PotentialContourAdapter::new(&field, &charges, grid_400());
        let p = adapter.find_crossing_point(-200.0, DVec2::new(260.0, 230.0));
        assert!((field.potential(p.x, p.y) + 200.0).abs() < CROSSING_TOLERANCE);
    }

    #[test]
    fn crossing_point_gives_up_in_flat_field() {
        let field = ElectrostaticField::default();
        let charges = [Charge::new(0.0, 0.0, 0.0, 0)];
        let adapter = PotentialContourAdapter::new(&field, &charges, grid_400());
        let start = DVec2::new(10.0, 10.0);
        assert_eq!(adapter.find_crossing_point(5.0, start), start);
    }

    // -- Contours --

    #[test]
    fn single_charge_contour_is_closed_circle() {
        let charges = [Charge::new(200.0, 200.0, 1.0, 0)];
        let field = ElectrostaticField::new(charges.to_vec());
        let adapter = PotentialContourAdapter::new(&field, &charges, grid_400());
        // -20000 / r = -200 at r ≈ 100.
        let contours = adapter.contours_at_levels(&[-200.0]);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(c.closed);
        assert!(c.points.len() > 20);
        let expected_r = (100.0_f64 * 100.0 - 5.0).sqrt();
        for p in &c.points {
            let r = p.distance(charges[0].position());
            assert!((r - expected_r).abs() < 0.5, "point at radius {r}");
        }
    }

    #[test]
    fn dipole_zero_level_is_open_bisector() {
        let charges = [
            Charge::new(150.0, 200.0, 1.0, 0),
            Charge::new(250.0, 200.0, -1.0, 1),
        ];
        let field = ElectrostaticField::new(charges.to_vec());
        let adapter = PotentialContourAdapter::new(&field, &charges, grid_400());
        let contours = adapter.contours_at_levels(&[0.0]);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(!c.closed);
        assert!(c.points.iter().all(|p| (p.x - 200.0).abs() < 0.01));
        let ys: Vec<f64> = c.points.iter().map(|p| p.y).collect();
        assert!(ys.iter().cloned().fold(f64::INFINITY, f64::min) < 0.0);
        assert!(ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max) > 400.0);
    }

    #[test]
    fn no_charges_no_contours() {
        let field = ElectrostaticField::default();
        let adapter = PotentialContourAdapter::new(&field, &[], grid_400());
        assert!(adapter.contours_at_levels(&POTENTIAL_LEVELS).is_empty());
    }

    #[test]
    fn contour_count_is_capped() {
        let charges = [
            Charge::new(120.0, 200.0, 3.0, 0),
            Charge::new(280.0, 200.0, -3.0, 1),
        ];
        let field = ElectrostaticField::new(charges.to_vec());
        let adapter = PotentialContourAdapter::new(&field, &charges, grid_400());
        let levels: Vec<f64> = (-60..=60).map(|k| k as f64 * 25.0).collect();
        assert!(adapter.contours_at_levels(&levels).len() <= MAX_CONTOURS);
    }

    // -- Arrows --

    #[test]
    fn lone_current_arrows_sit_on_horizontal_axis() {
        let currents = [Charge::new(200.0, 200.0, 1.0, 0)];
        let field = MagnetostaticField::new(currents.to_vec());
        let adapter = PotentialContourAdapter::new(&field, &currents, grid_400());
        let plot = adapter.contours_with_arrows(&[-200.0]);
        assert_eq!(plot.contours.len(), 1);
        assert_eq!(plot.arrows.len(), 2);
        for a in &plot.arrows {
            assert!((a.y - 200.0).abs() < 1e-9);
            assert!(((a.x - 200.0).abs() - 100.0).abs() < 0.5);
        }
    }

    #[test]
    fn symmetry_crossing_uses_best_pair() {
        let charges = [
            Charge::new(0.0, 0.0, 1.0, 0),
            Charge::new(100.0, 0.0, -1.0, 1),
            Charge::new(0.0, 500.0, 1.0, 2),
        ];
        // Charges 0 and 1 pair up; their axis is y = 0.
        let hit = symmetry_crossing(&charges, DVec2::new(50.0, -5.0), DVec2::new(50.0, 5.0)).unwrap();
        assert!((hit - DVec2::new(50.0, 0.0)).length() < 1e-12);
        assert!(symmetry_crossing(&charges, DVec2::new(50.0, 5.0), DVec2::new(60.0, 5.0)).is_none());
    }

    #[test]
    fn strongly_like_charges_never_pair() {
        let charges = [Charge::new(0.0, 0.0, 2.0, 0), Charge::new(100.0, 0.0, 2.0, 1)];
        assert!(symmetry_crossing(&charges, DVec2::new(50.0, -5.0), DVec2::new(50.0, 5.0)).is_none());
    }

    #[test]
    fn contour_plot_serializes() {
        let plot = ContourPlot {
            contours: vec![Contour {
                level: 1.0,
                points: vec![DVec2::ZERO, DVec2::ONE],
                closed: false,
            }],
            arrows: vec![DVec2::new(0.5, 0.5)],
        };
        let v = serde_json::to_value(&plot).unwrap();
        assert_eq!(v["contours"][0]["level"], 1.0);
        assert_eq!(v["arrows"].as_array().unwrap().len(), 1);
    }
}
