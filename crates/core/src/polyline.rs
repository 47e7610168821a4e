//! Clipping traced lines to the canvas and placing direction arrows.
//!
//! A traced line may wander off-canvas and come back. Each maximal run of
//! consecutive on-canvas points is a [`VisibleSegment`]; every segment long
//! enough to draw gets one arrow at its middle sample, oriented along the
//! local field.
//!
//! [`gaussian_crossings`] marks where traced lines pierce a closed surface
//! and whether the field leaves or enters it there.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::sampler::FieldSampler;

/// Where to draw an arrowhead and which way it points (unit vector).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowPlacement {
    pub position: DVec2,
    pub direction: DVec2,
}

/// Points `start..end` of a polyline that lie on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleSegment {
    pub start: usize,
    pub end: usize,
    pub arrow: Option<ArrowPlacement>,
}

impl VisibleSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Whether `p` lies on the closed canvas rectangle.
pub fn on_canvas(p: DVec2, width: f64, height: f64) -> bool {
    p.x >= 0.0 && p.y >= 0.0 && p.x <= width && p.y <= height
}

/// Splits `points` into on-canvas runs and places an arrow on each run of at
/// least two points.
pub fn visible_segments<S: FieldSampler + ?Sized>(
    points: &[DVec2],
    width: f64,
    height: f64,
    sampler: &S,
) -> Vec<VisibleSegment> {
    let mut segments = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, p) in points.iter().enumerate() {
        match (on_canvas(*p, width, height), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                segments.push(segment(points, start, i, sampler));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        segments.push(segment(points, start, points.len(), sampler));
    }
    segments
}

fn segment<S: FieldSampler + ?Sized>(
    points: &[DVec2],
    start: usize,
    end: usize,
    sampler: &S,
) -> VisibleSegment {
    let arrow = if end - start >= 2 {
        arrow_at_middle(&points[start..end], sampler)
    } else {
        None
    };
    VisibleSegment { start, end, arrow }
}

/// Arrow at the middle sample of `run`, along the field there. Falls back to
/// the run's local tangent where the field vanishes.
fn arrow_at_middle<S: FieldSampler + ?Sized>(run: &[DVec2], sampler: &S) -> Option<ArrowPlacement> {
    let mid = run.len() / 2;
    let position = *run.get(mid)?;
    let (u, v) = sampler.evaluate(position.x, position.y);
    let direction = DVec2::new(u, v)
        .try_normalize()
        .or_else(|| (run[mid] - run[mid - 1]).try_normalize())?;
    Some(ArrowPlacement {
        position,
        direction,
    })
}

/// Distance along the field on either side of a crossing at which the
/// surface's winding number is sampled.
pub const CROSSING_OFFSET: f64 = 0.8;

/// A field line passing through a closed surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCrossing {
    pub position: DVec2,
    /// Unit field direction at `position`.
    pub direction: DVec2,
    /// True when the field leaves the enclosed region here.
    pub outward: bool,
}

/// Finds every point where a line in `lines` crosses `surface` and classifies
/// it as outward or inward flux.
///
/// `intersect(line, surface)` returns the intersection points of two
/// polylines and `winding(surface, p)` the winding number of `surface`
/// around `p`. Both see `surface` exactly as given, so a closed ring should
/// repeat its first vertex. At each crossing the winding number is taken
/// [`CROSSING_OFFSET`] ahead of and behind the point along the field; the
/// crossing is outward when the point ahead lies outside. Crossings where the
/// field vanishes, or where the surface wraps either sample more than once,
/// are dropped.
pub fn gaussian_crossings<'p, L, S, X, W>(
    lines: L,
    surface: &[DVec2],
    sampler: &S,
    intersect: X,
    winding: W,
) -> Vec<SurfaceCrossing>
where
    L: IntoIterator<Item = &'p [DVec2]>,
    S: FieldSampler + ?Sized,
    X: Fn(&[DVec2], &[DVec2]) -> Vec<DVec2>,
    W: Fn(&[DVec2], DVec2) -> i32,
{
    let mut crossings = Vec::new();
    for line in lines {
        for position in intersect(line, surface) {
            let (u, v) = sampler.evaluate(position.x, position.y);
            let Some(direction) = DVec2::new(u, v).try_normalize() else {
                continue;
            };
            let head = winding(surface, position + direction * CROSSING_OFFSET);
            let tail = winding(surface, position - direction * CROSSING_OFFSET);
            if head.abs() > 1 || tail.abs() > 1 {
                continue;
            }
            crossings.push(SurfaceCrossing {
                position,
                direction,
                outward: head == 0,
            });
        }
    }
    crossings
}
