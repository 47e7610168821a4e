//! Field-line tracing over a whole charge configuration.
//!
//! [`FieldLineOrchestrator::trace`] runs one pass: it seeds every charge with
//! a preferred departure direction and a traversal score, then drains the
//! charges one at a time. Each departure is traced with the
//! [`StreamlineIntegrator`]; a line that lands registers an arrival on the
//! target's [`DepartureScheduler`], which frees one of the target's slots and
//! steers its later departures away from the arrivals.
//!
//! When a line lands on a charge that has already issued all of its slots,
//! the departure is backtracked and its angle blocked on the source. After
//! `max_failed_launches` such conflicts on one charge the line is kept
//! without an arrival and a [`TraceEvent::RetryCapExceeded`] is logged.
//!
//! All per-charge scheduling state lives in a [`TracingContext`] owned by the
//! pass, so repeated passes are independent.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::charge::{validate_charges, Charge, ChargeId};
use crate::config::{TraceConfig, TraversalPolicy};
use crate::departure::DepartureScheduler;
use crate::error::FieldError;
use crate::event::{TraceEvent, TraceLog, TraceSummary};
use crate::integrator::{Domain, Streamline, StreamlineIntegrator, Termination};
use crate::polyline::{visible_segments, VisibleSegment};
use crate::sampler::FieldSampler;

/// Where a charge is in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargePhase {
    /// Not yet selected.
    Idle,
    /// Currently issuing departures.
    Emitting,
    /// Every slot issued.
    Drained,
}

#[derive(Debug, Clone)]
struct ChargeState {
    scheduler: DepartureScheduler,
    phase: ChargePhase,
    retries: u32,
    score: f64,
    starting_angle: f64,
}

/// Per-charge scheduling state for one pass, indexed like the charge slice.
#[derive(Debug, Clone)]
pub struct TracingContext {
    states: Vec<ChargeState>,
}

impl TracingContext {
    /// Seeds every charge with its starting angle, score and slot count.
    pub fn new(charges: &[Charge], config: &TraceConfig) -> Self {
        let states = starting_angles(charges)
            .into_iter()
            .zip(charges)
            .map(|((starting_angle, score), charge)| ChargeState {
                scheduler: DepartureScheduler::new(
                    charge.num_departures(config.lines_per_unit_charge),
                    starting_angle,
                ),
                phase: ChargePhase::Idle,
                retries: 0,
                score,
                starting_angle,
            })
            .collect();
        Self { states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn scheduler(&self, index: usize) -> Option<&DepartureScheduler> {
        self.states.get(index).map(|s| &s.scheduler)
    }

    pub fn phase(&self, index: usize) -> Option<ChargePhase> {
        self.states.get(index).map(|s| s.phase)
    }

    /// Distance of the charge from the weighted centroid.
    pub fn score(&self, index: usize) -> Option<f64> {
        self.states.get(index).map(|s| s.score)
    }

    pub fn starting_angle(&self, index: usize) -> Option<f64> {
        self.states.get(index).map(|s| s.starting_angle)
    }

    /// Scheduling conflicts seen by the charge so far.
    pub fn retries(&self, index: usize) -> Option<u32> {
        self.states.get(index).map(|s| s.retries)
    }

    /// The idle charge to drain next, earliest index on ties.
    pub fn next_charge(&self, policy: TraversalPolicy) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, state) in self.states.iter().enumerate() {
            if state.phase != ChargePhase::Idle {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let current = &self.states[b];
                    match policy {
                        TraversalPolicy::StaticScore => state.score > current.score,
                        TraversalPolicy::ArrivalPressure => {
                            let (a, ca) = (
                                state.scheduler.arrival_count(),
                                current.scheduler.arrival_count(),
                            );
                            a > ca || (a == ca && state.score > current.score)
                        }
                    }
                }
            };
            if better {
                best = Some(i);
            }
        }
        best
    }
}

/// Preferred departure angle and traversal score for each charge.
///
/// Every charge points toward the centroid of all charges weighted by
/// `|charge|`, and scores its distance from it. The construction commutes
/// with rotation, translation and reordering of the configuration. A lone
/// charge, or one sitting on the centroid, gets angle 0.
pub fn starting_angles(charges: &[Charge]) -> Vec<(f64, f64)> {
    if charges.len() <= 1 {
        return charges.iter().map(|_| (0.0, 0.0)).collect();
    }

    let total: f64 = charges.iter().map(|c| c.charge.abs()).sum();
    let centroid = if total > 0.0 {
        charges
            .iter()
            .fold(DVec2::ZERO, |acc, c| acc + c.position() * c.charge.abs())
            / total
    } else {
        charges.iter().fold(DVec2::ZERO, |acc, c| acc + c.position()) / charges.len() as f64
    };

    charges
        .iter()
        .map(|c| {
            let d = centroid - c.position();
            let angle = if d == DVec2::ZERO { 0.0 } else { d.y.atan2(d.x) };
            (angle, d.length())
        })
        .collect()
}

/// One traced field line, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLine {
    /// Charge the line departed from.
    pub source: ChargeId,
    pub departure_angle: f64,
    pub points: Vec<DVec2>,
    pub termination: Termination,
    /// Charge the line landed on, if any.
    pub landed_on: Option<ChargeId>,
    pub segments: Vec<VisibleSegment>,
}

/// Result of one tracing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLinePlot {
    pub lines: Vec<FieldLine>,
    pub log: TraceLog,
    pub summary: TraceSummary,
}

/// Traces field lines for charge configurations on a fixed canvas.
pub struct FieldLineOrchestrator<'a, S: FieldSampler + ?Sized> {
    sampler: &'a S,
    width: f64,
    height: f64,
    config: TraceConfig,
}

impl<'a, S: FieldSampler + ?Sized> FieldLineOrchestrator<'a, S> {
    /// Returns `FieldError::InvalidDimensions` unless the canvas is finite
    /// and positive.
    pub fn new(sampler: &'a S, width: f64, height: f64, config: TraceConfig) -> Result<Self, FieldError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FieldError::InvalidDimensions);
        }
        Ok(Self {
            sampler,
            width,
            height,
            config,
        })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Runs one full pass over `charges`.
    pub fn trace(&self, charges: &[Charge]) -> Result<FieldLinePlot, FieldError> {
        self.trace_with_context(charges).map(|(plot, _)| plot)
    }

    /// Like [`FieldLineOrchestrator::trace`], also returning the final
    /// scheduling state for inspection.
    pub fn trace_with_context(
        &self,
        charges: &[Charge],
    ) -> Result<(FieldLinePlot, TracingContext), FieldError> {
        validate_charges(charges)?;

        let config = &self.config;
        let domain = Domain::from_canvas(self.width, self.height, config.domain_margin);
        let integrator = StreamlineIntegrator::new(self.sampler, charges, domain, config);
        let mut ctx = TracingContext::new(charges, config);
        let mut log = TraceLog::new();
        let mut lines = Vec::new();
        let mut attempt = 0;

        while let Some(i) = ctx.next_charge(config.traversal) {
            ctx.states[i].phase = ChargePhase::Emitting;
            let source = charges[i];

            while let Some(angle) = ctx.states[i].scheduler.get_new_departure() {
                let line = attempt;
                attempt += 1;
                log.log(TraceEvent::Launched {
                    line,
                    charge: source.id,
                    angle,
                });

                let start = source.position() + config.capture_radius * DVec2::from_angle(angle);
                let streamline = integrator.trace(start, source.step_sign(), Some(i));

                let landed_on = match streamline.termination {
                    Termination::Landed(j) => {
                        let target = charges[j];
                        if ctx.states[j].scheduler.is_exhausted() {
                            let state = &mut ctx.states[i];
                            state.retries += 1;
                            if state.retries > config.max_failed_launches {
                                log.log(TraceEvent::RetryCapExceeded {
                                    line,
                                    source: source.id,
                                    target: target.id,
                                    retries: state.retries,
                                });
                            } else {
                                log.log(TraceEvent::Backtracked {
                                    line,
                                    source: source.id,
                                    target: target.id,
                                    retries: state.retries,
                                });
                                state.scheduler.backtrack(angle, &source);
                                continue;
                            }
                        } else {
                            let arrival = arrival_angle(&streamline, &target);
                            ctx.states[j]
                                .scheduler
                                .register_arrival(arrival, &source, &target);
                            log.log(TraceEvent::Arrived {
                                line,
                                source: source.id,
                                target: target.id,
                                angle: arrival,
                            });
                        }
                        Some(target.id)
                    }
                    Termination::LeftDomain => {
                        log.log(TraceEvent::LeftDomain {
                            line,
                            charge: source.id,
                        });
                        None
                    }
                    Termination::StepLimit => {
                        log.log(TraceEvent::StepLimitReached {
                            line,
                            charge: source.id,
                        });
                        None
                    }
                    Termination::Stalled => {
                        log.log(TraceEvent::Stalled {
                            line,
                            charge: source.id,
                        });
                        None
                    }
                };

                let segments = visible_segments(&streamline.points, self.width, self.height, self.sampler);
                lines.push(FieldLine {
                    source: source.id,
                    departure_angle: angle,
                    points: streamline.points,
                    termination: streamline.termination,
                    landed_on,
                    segments,
                });
            }

            ctx.states[i].phase = ChargePhase::Drained;
        }

        let summary = TraceSummary::from_log(&log, lines.len());
        Ok((FieldLinePlot { lines, log, summary }, ctx))
    }
}

/// Angle, seen from `target`, at which the line arrived: the reverse of the
/// final integration step, or the end point's bearing if no step was taken.
fn arrival_angle(streamline: &Streamline, target: &Charge) -> f64 {
    streamline.arrival_angle().unwrap_or_else(|| {
        let end = streamline.points.last().copied().unwrap_or(target.position());
        let d = end - target.position();
        d.y.atan2(d.x)
    })
}

/// Traces one pass with a throwaway orchestrator.
pub fn trace_field_lines<S: FieldSampler + ?Sized>(
    sampler: &S,
    charges: &[Charge],
    width: f64,
    height: f64,
    config: TraceConfig,
) -> Result<FieldLinePlot, FieldError> {
    FieldLineOrchestrator::new(sampler, width, height, config)?.trace(charges)
}
