//! Angle arithmetic on the circle [0, 2π).
//!
//! Every piece of seam handling in the crate goes through this module:
//! normalization, interleaved slot ordering, and [`AngularRange`] set
//! operations (subtraction and merging across the 0/2π seam).
//!
//! An [`AngularRange`] never wraps. Ranges that straddle the seam are
//! represented with `max > 2π` (after merging) or split into two pieces
//! (before subtraction).

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Distance below which two range endpoints at the seam are considered equal.
pub const SEAM_TOLERANCE: f64 = 1e-5;

/// Maps any finite angle into [0, 2π).
pub fn normalize(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU.
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Maps any finite angle into (-π, π].
pub fn wrap_to_pi(angle: f64) -> f64 {
    let a = normalize(angle);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Reorders sequential slot indices so that consecutive requests alternate
/// between the two ends of the slot range: 0, n-1, 1, n-2, 2, ...
///
/// For `index < count` the result is a permutation of `0..count`.
pub fn interleave(index: usize, count: usize) -> usize {
    debug_assert!(index < count, "slot {index} out of range for {count} slots");
    if index % 2 == 0 {
        index / 2
    } else {
        count - 1 - (index - 1) / 2
    }
}

/// A closed, non-wrapping interval of angles `[min, max]` with `min <= max`.
///
/// Endpoints may lie outside [0, 2π) when the range has been rotated into a
/// frame that does not start at zero, or merged across the seam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularRange {
    pub min: f64,
    pub max: f64,
}

impl AngularRange {
    /// Creates a range from ordered endpoints.
    pub fn new(min: f64, max: f64) -> Self {
        debug_assert!(min <= max, "inverted angular range [{min}, {max}]");
        Self { min, max }
    }

    /// Creates the range swept counter-clockwise from `start` to `end`.
    ///
    /// `min` is normalized into [0, 2π); `max` is `min` plus the swept width,
    /// so a range that crosses the seam has `max >= 2π`.
    pub fn from_endpoints(start: f64, end: f64) -> Self {
        let min = normalize(start);
        Self {
            min,
            max: min + normalize(end - start),
        }
    }

    /// The full circle starting at `origin`.
    pub fn full_circle(origin: f64) -> Self {
        Self {
            min: origin,
            max: origin + TAU,
        }
    }

    /// Angular width in radians.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Whether `angle` (any representation) lies strictly inside the range.
    pub fn contains(&self, angle: f64) -> bool {
        let base = normalize(angle);
        // Ranges start in [-2π, 4π) in practice; test every lift of the angle
        // that can land in that window.
        (-1..=2).any(|k| {
            let lifted = base + f64::from(k) * TAU;
            lifted > self.min && lifted < self.max
        })
    }

    /// The angle at fraction `t` in [0, 1] of the way from `min` to `max`.
    pub fn lerp(&self, t: f64) -> f64 {
        self.min + self.width() * t
    }
}

/// Removes `exclusion` from every range in `available`.
///
/// Ranges that overlap the exclusion are cut into the part before and the
/// part after it; ranges inside it are dropped; disjoint ranges are kept.
/// The exclusion must not wrap (split it first).
pub fn subtract(available: &[AngularRange], exclusion: AngularRange) -> Vec<AngularRange> {
    let mut out = Vec::with_capacity(available.len() + 1);
    for range in available {
        if exclusion.max <= range.min || exclusion.min >= range.max {
            out.push(*range);
            continue;
        }
        if exclusion.min > range.min {
            out.push(AngularRange::new(range.min, exclusion.min));
        }
        if exclusion.max < range.max {
            out.push(AngularRange::new(exclusion.max, range.max));
        }
    }
    out
}

/// Joins the last and first ranges when they meet at the seam of the frame
/// that starts at `origin`.
///
/// The joined range replaces the last one and extends past `origin + 2π`.
/// A lone range is never joined with itself.
pub fn merge_at_seam(mut ranges: Vec<AngularRange>, origin: f64) -> Vec<AngularRange> {
    if ranges.len() < 2 {
        return ranges;
    }
    let first = ranges[0];
    let last = ranges[ranges.len() - 1];
    if first.min - origin <= SEAM_TOLERANCE && origin + TAU - last.max <= SEAM_TOLERANCE {
        let merged = AngularRange::new(last.min, first.max + TAU);
        ranges.remove(0);
        if let Some(tail) = ranges.last_mut() {
            *tail = merged;
        }
    }
    ranges
}

/// The part of the circle not covered by any of `exclusions`, computed in the
/// frame `[origin, origin + 2π)` and merged across that frame's seam.
///
/// Each exclusion is given by [`AngularRange::from_endpoints`] and may wrap.
pub fn complement(exclusions: &[AngularRange], origin: f64) -> Vec<AngularRange> {
    let end = origin + TAU;
    let mut available = vec![AngularRange::full_circle(origin)];
    for exclusion in exclusions {
        let lo = origin + normalize(exclusion.min - origin);
        let mut hi = lo + exclusion.width();
        if (hi - end).abs() <= SEAM_TOLERANCE {
            hi = end;
        }
        if hi > end {
            available = subtract(&available, AngularRange::new(lo, end));
            available = subtract(&available, AngularRange::new(origin, hi - TAU));
        } else {
            available = subtract(&available, AngularRange::new(lo, hi));
        }
    }
    merge_at_seam(available, origin)
}
