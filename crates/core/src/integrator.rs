//! Predictor-corrector streamline tracing.
//!
//! [`StreamlineIntegrator::trace`] follows the normalized field from a start
//! point with fixed-length steps until the line lands on a charge, leaves the
//! extended domain, or exhausts its step budget. Each step is a full Euler
//! step along the current direction followed by a half correction toward the
//! direction at the predicted point (Heun's method on the unit field).

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::charge::{charge_at_point, Charge};
use crate::config::TraceConfig;
use crate::sampler::FieldSampler;

/// Axis-aligned region outside which a line is abandoned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: DVec2,
    pub max: DVec2,
}

impl Domain {
    /// The canvas `[0, width] x [0, height]` grown by `margin` times its size
    /// on every side.
    pub fn from_canvas(width: f64, height: f64, margin: f64) -> Self {
        let pad = DVec2::new(width, height) * margin;
        Self {
            min: -pad,
            max: DVec2::new(width, height) + pad,
        }
    }

    /// Strict interior test.
    pub fn contains(&self, p: DVec2) -> bool {
        p.x > self.min.x && p.y > self.min.y && p.x < self.max.x && p.y < self.max.y
    }
}

/// Why a trace stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "charge", rename_all = "snake_case")]
pub enum Termination {
    /// Entered the capture disk of the charge at this index.
    Landed(usize),
    /// Left the extended domain.
    LeftDomain,
    /// Ran out of steps.
    StepLimit,
    /// Started in a zero field with no direction to fall back on.
    Stalled,
}

/// One traced curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Streamline {
    /// Sample points, starting with the start point. May extend off-canvas.
    pub points: Vec<DVec2>,
    pub termination: Termination,
    /// Displacement of the final step, zero if no step was taken.
    pub last_step: DVec2,
    /// Path length covered, in steps times step size.
    pub length: f64,
}

impl Streamline {
    /// Direction from which the line entered its final point, as an angle
    /// seen from that point: the reverse of the last step. `None` before the
    /// first step.
    pub fn arrival_angle(&self) -> Option<f64> {
        if self.last_step == DVec2::ZERO {
            return None;
        }
        let back = -self.last_step;
        Some(back.y.atan2(back.x))
    }
}

/// Traces streamlines through a sampler among a fixed set of charges.
pub struct StreamlineIntegrator<'a, S: FieldSampler + ?Sized> {
    sampler: &'a S,
    charges: &'a [Charge],
    domain: Domain,
    config: &'a TraceConfig,
}

impl<'a, S: FieldSampler + ?Sized> StreamlineIntegrator<'a, S> {
    pub fn new(sampler: &'a S, charges: &'a [Charge], domain: Domain, config: &'a TraceConfig) -> Self {
        Self {
            sampler,
            charges,
            domain,
            config,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Traces from `start`, stepping along the field when `sign > 0` and
    /// against it otherwise. `source` is never landed on.
    pub fn trace(&self, start: DVec2, sign: f64, source: Option<usize>) -> Streamline {
        let step = self.config.step_size * sign.signum();
        let threshold = self.config.low_field_threshold;

        let mut pos = start;
        let mut points = vec![start];
        let mut length = 0.0;
        let mut last_step = DVec2::ZERO;
        let mut last_dir: Option<DVec2> = None;

        for _ in 0..self.config.max_steps {
            if let Some(termination) = self.terminal(pos, length, source) {
                return Streamline {
                    points,
                    termination,
                    last_step,
                    length,
                };
            }

            let e = self.field(pos);
            let norm = e.length();
            let dir = if norm >= threshold {
                e / norm
            } else if let Some(d) = last_dir {
                d
            } else {
                return Streamline {
                    points,
                    termination: Termination::Stalled,
                    last_step,
                    length,
                };
            };

            let predicted = pos + step * dir;
            let e2 = self.field(predicted);
            let norm2 = e2.length();
            let (next, next_dir) = if norm2 > threshold {
                let dir2 = e2 / norm2;
                (predicted + step * (dir2 - dir) * 0.5, dir2)
            } else {
                (predicted, dir)
            };

            last_step = next - pos;
            pos = next;
            points.push(pos);
            length += step.abs();
            last_dir = Some(next_dir);
        }

        let termination = self
            .terminal(pos, length, source)
            .unwrap_or(Termination::StepLimit);
        Streamline {
            points,
            termination,
            last_step,
            length,
        }
    }

    /// Landing wins over leaving the domain.
    fn terminal(&self, pos: DVec2, length: f64, source: Option<usize>) -> Option<Termination> {
        if length >= self.config.min_landing_length {
            if let Some(i) = charge_at_point(self.charges, pos, self.config.capture_radius, source) {
                return Some(Termination::Landed(i));
            }
        }
        if !self.domain.contains(pos) {
            return Some(Termination::LeftDomain);
        }
        None
    }

    fn field(&self, p: DVec2) -> DVec2 {
        let (u, v) = self.sampler.evaluate(p.x, p.y);
        DVec2::new(u, v)
    }
}
