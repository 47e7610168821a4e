//! Per-charge scheduling of field-line departure angles.
//!
//! A [`DepartureScheduler`] answers "at what angle should the next line leave
//! this charge?". Without arrivals the slots are spread evenly around the
//! full circle. Once lines from other charges have landed, each source's
//! arrival cluster becomes an exclusion interval and the slots are placed
//! inside the remaining open ranges instead.
//!
//! The scheduler is an [`Iterator`] over departure angles: finite, lazy, and
//! not restartable. [`DepartureScheduler::backtrack`] un-issues the most
//! recent angle when the orchestrator has to retry it. A slot whose new
//! position lands on an angle this charge already launched is skipped in
//! favour of the next free slot, so no two standing lines share an angle.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use crate::angle::{self, AngularRange};
use crate::charge::{Charge, ChargeId};

/// Departure bookkeeping for one charge during one tracing pass.
#[derive(Debug, Clone)]
pub struct DepartureScheduler {
    num_departures: usize,
    next_departure_index: usize,
    starting_angle: f64,
    arrivals: BTreeMap<ChargeId, Vec<f64>>,
    arrival_range: BTreeMap<ChargeId, AngularRange>,
    departure_ranges: Option<Vec<AngularRange>>,
    issued: Vec<f64>,
}

impl DepartureScheduler {
    /// Creates a scheduler that will issue `num_departures` angles, offset by
    /// `starting_angle` while no arrivals are registered.
    pub fn new(num_departures: usize, starting_angle: f64) -> Self {
        Self {
            num_departures,
            next_departure_index: 0,
            starting_angle,
            arrivals: BTreeMap::new(),
            arrival_range: BTreeMap::new(),
            departure_ranges: None,
            issued: Vec::new(),
        }
    }

    /// Slots still owed by this charge, including those already issued.
    pub fn num_departures(&self) -> usize {
        self.num_departures
    }

    /// Number of angles issued so far.
    pub fn next_departure_index(&self) -> usize {
        self.next_departure_index
    }

    /// True once every slot has been issued; an arrival now would conflict.
    pub fn is_exhausted(&self) -> bool {
        self.next_departure_index >= self.num_departures
    }

    /// Arrival angles grouped by the id of the charge the line came from.
    pub fn arrivals(&self) -> &BTreeMap<ChargeId, Vec<f64>> {
        &self.arrivals
    }

    /// Total number of arrivals registered (including self-arrivals from
    /// backtracking).
    pub fn arrival_count(&self) -> usize {
        self.arrivals.values().map(Vec::len).sum()
    }

    /// Exclusion interval derived from one source's arrivals.
    pub fn arrival_range(&self, source: ChargeId) -> Option<AngularRange> {
        self.arrival_range.get(&source).copied()
    }

    /// The open ranges departures are currently placed in, recomputed if an
    /// arrival invalidated them. Empty ranges mean "no arrivals yet".
    pub fn departure_ranges(&mut self) -> &[AngularRange] {
        if self.departure_ranges.is_none() {
            self.departure_ranges = Some(self.calculate_departure_ranges());
        }
        self.departure_ranges.as_deref().unwrap_or(&[])
    }

    /// Issues the next departure angle in [0, 2π), or `None` once every slot
    /// has been consumed.
    pub fn get_new_departure(&mut self) -> Option<f64> {
        if self.is_exhausted() {
            return None;
        }
        let count = self.num_departures;
        let index = angle::interleave(self.next_departure_index, count);

        let departure = if self.arrivals.is_empty() {
            angle::normalize(self.starting_angle + (index as f64 + 0.5) * TAU / count as f64)
        } else {
            self.free_slot(index, count)
        };

        self.next_departure_index += 1;
        self.issued.push(departure);
        Some(departure)
    }

    /// Angles issued and not taken back, in issue order.
    pub fn issued(&self) -> &[f64] {
        &self.issued
    }

    /// Places slot `index` in the current ranges. If a re-layout put it on an
    /// angle already issued, the remaining slots are tried in issue order and
    /// the first one clear of every issued angle wins.
    fn free_slot(&mut self, index: usize, count: usize) -> f64 {
        let ranges = self.departure_ranges().to_vec();
        let placed = angle::normalize(place_in_ranges(&ranges, index, count));
        if !self.already_issued(placed) {
            return placed;
        }
        let next = self.next_departure_index;
        (next + 1..count)
            .chain(0..next)
            .map(|k| angle::normalize(place_in_ranges(&ranges, angle::interleave(k, count), count)))
            .find(|&candidate| !self.already_issued(candidate))
            .unwrap_or(placed)
    }

    fn already_issued(&self, candidate: f64) -> bool {
        self.issued
            .iter()
            .any(|&a| angle::wrap_to_pi(a - candidate).abs() <= angle::SEAM_TOLERANCE)
    }

    /// Records that a line from `source` landed on `arrival` (this charge) at
    /// `angle`, freeing one departure slot.
    pub fn register_arrival(&mut self, angle: f64, source: &Charge, arrival: &Charge) {
        debug_assert!(
            self.num_departures > 0,
            "arrival registered on charge {} with no departures left",
            arrival.id
        );
        self.num_departures = self.num_departures.saturating_sub(1);

        let angles = self.arrivals.entry(source.id).or_default();
        angles.push(angle::normalize(angle));
        let range = arrivals_to_range(angles, arrival, source);
        self.arrival_range.insert(source.id, range);

        self.departure_ranges = None;
    }

    /// Takes back the most recently issued departure and blocks its angle for
    /// the next attempt.
    ///
    /// The angle is registered as an arrival from `own` on itself, which
    /// widens this charge's own exclusion; the slot count is restored so the
    /// retry still owes the same number of lines.
    pub fn backtrack(&mut self, departure_angle: f64, own: &Charge) {
        debug_assert!(self.next_departure_index > 0, "nothing to backtrack");
        self.next_departure_index = self.next_departure_index.saturating_sub(1);
        self.issued.pop();
        self.register_arrival(departure_angle, own, own);
        self.num_departures += 1;
    }

    /// Complement of all exclusion intervals on the circle.
    ///
    /// With exactly one arrival source the frame is rotated to begin at that
    /// source's exclusion boundary, so the single open range starts exactly
    /// where the arrivals end.
    fn calculate_departure_ranges(&self) -> Vec<AngularRange> {
        if self.arrival_range.is_empty() {
            return Vec::new();
        }
        let exclusions: Vec<AngularRange> = self.arrival_range.values().copied().collect();
        let origin = if exclusions.len() == 1 {
            angle::normalize(exclusions[0].max)
        } else {
            0.0
        };
        angle::complement(&exclusions, origin)
    }
}

impl Iterator for DepartureScheduler {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.get_new_departure()
    }
}

/// Smallest interval containing every arrival angle from one source.
///
/// Angles are measured as offsets from a center direction so a cluster that
/// straddles the 0/2π seam stays contiguous. The center is the direction from
/// `arrival` toward `source`; for self-arrivals (backtracking) it is the
/// circular mean of the angles.
pub fn arrivals_to_range(angles: &[f64], arrival: &Charge, source: &Charge) -> AngularRange {
    let center = if arrival.id == source.id {
        let (s, c) = angles
            .iter()
            .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
        s.atan2(c)
    } else {
        let d = source.position() - arrival.position();
        d.y.atan2(d.x)
    };

    let (lo, hi) = angles
        .iter()
        .map(|a| angle::wrap_to_pi(a - center))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), off| {
            (lo.min(off), hi.max(off))
        });

    AngularRange::from_endpoints(center + lo, center + hi)
}

/// Splits `count` slots across `ranges` proportionally to their widths and
/// returns the angle of slot `index`.
///
/// Counts are rounded to the nearest integer and the rounding remainder is
/// given to the first range (borrowing from later ranges if that would go
/// negative). Within a range of `n` slots, slot `j` sits at fraction
/// `(1 + j) / (1 + n)`, never on a boundary.
fn place_in_ranges(ranges: &[AngularRange], index: usize, count: usize) -> f64 {
    let counts = allocate_slots(ranges, count);
    let mut offset = 0;
    for (range, &n) in ranges.iter().zip(counts.iter()) {
        if index < offset + n {
            let j = index - offset;
            return range.lerp((1 + j) as f64 / (1 + n) as f64);
        }
        offset += n;
    }
    // Every range was blocked; fall back to the last range's far edge.
    ranges.last().map_or(0.0, |r| r.max)
}

/// Per-range slot counts summing exactly to `count`.
fn allocate_slots(ranges: &[AngularRange], count: usize) -> Vec<usize> {
    if ranges.is_empty() {
        return Vec::new();
    }
    let total: f64 = ranges.iter().map(AngularRange::width).sum();
    let mut counts: Vec<i64> = if total > 0.0 {
        ranges
            .iter()
            .map(|r| (count as f64 * r.width() / total).round() as i64)
            .collect()
    } else {
        vec![0; ranges.len()]
    };

    let assigned: i64 = counts.iter().sum();
    counts[0] += count as i64 - assigned;

    // A negative first count means rounding overshot; take the excess back
    // from the following ranges.
    let mut deficit = -counts[0].min(0);
    counts[0] = counts[0].max(0);
    for c in counts.iter_mut().skip(1) {
        if deficit == 0 {
            break;
        }
        let take = deficit.min(*c);
        *c -= take;
        deficit -= take;
    }

    counts.into_iter().map(|c| c as usize).collect()
}
