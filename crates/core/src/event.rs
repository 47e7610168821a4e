//! Structured diagnostics for one field-line tracing pass.
//!
//! The orchestrator never prints. Everything worth reporting (a line was
//! launched, landed, had to be retried, ran out of steps) is appended to a
//! [`TraceLog`] that is returned alongside the traced lines, so callers decide
//! whether to show, filter or discard it.
//!
//! Events carry a `line` number: the zero-based launch attempt within the
//! pass. Attempts that were backtracked keep their number, so a line number
//! may appear in a `Launched` event with no matching entry in the output.

use serde::{Deserialize, Serialize};

use crate::charge::ChargeId;

/// One thing that happened while tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A line left `charge` at `angle` (radians, [0, 2π)).
    Launched {
        line: usize,
        charge: ChargeId,
        angle: f64,
    },

    /// A line from `source` landed on `target`, registered at `angle` in the
    /// target's frame.
    Arrived {
        line: usize,
        source: ChargeId,
        target: ChargeId,
        angle: f64,
    },

    /// A line landed on a charge with no departure slots left; the departure
    /// was taken back and its angle blocked. `retries` counts conflicts seen
    /// by `source` so far.
    Backtracked {
        line: usize,
        source: ChargeId,
        target: ChargeId,
        retries: u32,
    },

    /// Too many conflicts for `source`; the line was kept without
    /// registering an arrival, so line counts may be off.
    RetryCapExceeded {
        line: usize,
        source: ChargeId,
        target: ChargeId,
        retries: u32,
    },

    /// The line left the extended domain.
    LeftDomain { line: usize, charge: ChargeId },

    /// The line hit the step cap without landing or leaving.
    StepLimitReached { line: usize, charge: ChargeId },

    /// The field vanished before any direction was known.
    Stalled { line: usize, charge: ChargeId },
}

impl TraceEvent {
    /// Launch attempt this event belongs to.
    pub fn line(&self) -> usize {
        match self {
            TraceEvent::Launched { line, .. }
            | TraceEvent::Arrived { line, .. }
            | TraceEvent::Backtracked { line, .. }
            | TraceEvent::RetryCapExceeded { line, .. }
            | TraceEvent::LeftDomain { line, .. }
            | TraceEvent::StepLimitReached { line, .. }
            | TraceEvent::Stalled { line, .. } => *line,
        }
    }

    /// The charge the line departed from.
    pub fn charge(&self) -> ChargeId {
        match self {
            TraceEvent::Launched { charge, .. }
            | TraceEvent::LeftDomain { charge, .. }
            | TraceEvent::StepLimitReached { charge, .. }
            | TraceEvent::Stalled { charge, .. } => *charge,
            TraceEvent::Arrived { source, .. }
            | TraceEvent::Backtracked { source, .. }
            | TraceEvent::RetryCapExceeded { source, .. } => *source,
        }
    }

    /// The charge a line landed on, if any.
    pub fn target(&self) -> Option<ChargeId> {
        match self {
            TraceEvent::Arrived { target, .. }
            | TraceEvent::Backtracked { target, .. }
            | TraceEvent::RetryCapExceeded { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Snake-case name matching the serialized `kind` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            TraceEvent::Launched { .. } => "launched",
            TraceEvent::Arrived { .. } => "arrived",
            TraceEvent::Backtracked { .. } => "backtracked",
            TraceEvent::RetryCapExceeded { .. } => "retry_cap_exceeded",
            TraceEvent::LeftDomain { .. } => "left_domain",
            TraceEvent::StepLimitReached { .. } => "step_limit_reached",
            TraceEvent::Stalled { .. } => "stalled",
        }
    }

    /// Events that indicate a degraded result rather than normal progress.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            TraceEvent::RetryCapExceeded { .. }
                | TraceEvent::StepLimitReached { .. }
                | TraceEvent::Stalled { .. }
        )
    }

    /// One-line human-readable description.
    pub fn describe(&self) -> String {
        match self {
            TraceEvent::Launched { line, charge, angle } => {
                format!("line {line}: launched from charge {charge} at {angle:.4} rad")
            }
            TraceEvent::Arrived {
                line,
                source,
                target,
                angle,
            } => format!("line {line}: charge {source} -> charge {target}, arrival at {angle:.4} rad"),
            TraceEvent::Backtracked {
                line,
                source,
                target,
                retries,
            } => format!(
                "line {line}: charge {target} has no slots left; backtracking charge {source} (retry {retries})"
            ),
            TraceEvent::RetryCapExceeded {
                line,
                source,
                target,
                retries,
            } => format!(
                "line {line}: too many failed launches from charge {source} ({retries}); \
                 kept line into charge {target}, line counts may be wrong"
            ),
            TraceEvent::LeftDomain { line, charge } => {
                format!("line {line}: from charge {charge} left the domain")
            }
            TraceEvent::StepLimitReached { line, charge } => {
                format!("line {line}: from charge {charge} hit the step limit")
            }
            TraceEvent::Stalled { line, charge } => {
                format!("line {line}: from charge {charge} stalled in a zero field")
            }
        }
    }
}

/// Ordered record of the events of one tracing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceLog {
    events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Events whose [`TraceEvent::event_type`] equals `event_type`.
    pub fn events_of_type(&self, event_type: &str) -> Vec<&TraceEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events for lines departing from `charge`.
    pub fn events_for_charge(&self, charge: ChargeId) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.charge() == charge).collect()
    }

    /// Events flagged by [`TraceEvent::is_warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(|e| e.is_warning())
    }

    fn count(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

/// Aggregate counts for a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Lines kept in the output.
    pub lines: usize,
    /// Arrivals registered on a landed charge.
    pub arrivals: usize,
    /// Launches that were taken back and retried.
    pub backtracks: usize,
    /// Lines kept after the retry cap without registering their arrival.
    pub miscounted: usize,
    /// Lines that hit the step cap or stalled.
    pub incomplete: usize,
}

impl TraceSummary {
    /// Derives the counts from a pass's log and its number of output lines.
    pub fn from_log(log: &TraceLog, lines: usize) -> Self {
        Self {
            lines,
            arrivals: log.count("arrived"),
            backtracks: log.count("backtracked"),
            miscounted: log.count("retry_cap_exceeded"),
            incomplete: log.count("step_limit_reached") + log.count("stalled"),
        }
    }

    /// Departure slots accounted for: each kept line consumes one slot at its
    /// source and each registered arrival frees one at its target.
    pub fn slots_consumed(&self) -> usize {
        self.lines + self.arrivals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> TraceLog {
        let mut log = TraceLog::new();
        log.log(TraceEvent::Launched {
            line: 0,
            charge: 1,
            angle: 0.5,
        });
        log.log(TraceEvent::Backtracked {
            line: 0,
            source: 1,
            target: 2,
            retries: 1,
        });
        log.log(TraceEvent::Launched {
            line: 1,
            charge: 1,
            angle: 1.5,
        });
        log.log(TraceEvent::Arrived {
            line: 1,
            source: 1,
            target: 2,
            angle: 3.0,
        });
        log.log(TraceEvent::Launched {
            line: 2,
            charge: 2,
            angle: 0.0,
        });
        log.log(TraceEvent::StepLimitReached { line: 2, charge: 2 });
        log
    }

    #[test]
    fn log_keeps_insertion_order() {
        let log = sample_log();
        assert_eq!(log.len(), 6);
        assert!(!log.is_empty());
        let lines: Vec<usize> = log.events().iter().map(TraceEvent::line).collect();
        assert_eq!(lines, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn query_by_type_and_charge() {
        let log = sample_log();
        assert_eq!(log.events_of_type("launched").len(), 3);
        assert_eq!(log.events_for_charge(1).len(), 4);
        assert_eq!(log.events_for_charge(2).len(), 2);
        assert!(log.events_for_charge(9).is_empty());
    }

    #[test]
    fn warnings_are_degradations_only() {
        let log = sample_log();
        let warnings: Vec<&TraceEvent> = log.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event_type(), "step_limit_reached");
    }

    #[test]
    fn target_is_reported_for_landings() {
        let arrived = TraceEvent::Arrived {
            line: 0,
            source: 3,
            target: 4,
            angle: 0.0,
        };
        assert_eq!(arrived.charge(), 3);
        assert_eq!(arrived.target(), Some(4));
        assert_eq!(TraceEvent::LeftDomain { line: 0, charge: 3 }.target(), None);
    }

    #[test]
    fn summary_counts_events() {
        let summary = TraceSummary::from_log(&sample_log(), 2);
        assert_eq!(
            summary,
            TraceSummary {
                lines: 2,
                arrivals: 1,
                backtracks: 1,
                miscounted: 0,
                incomplete: 1,
            }
        );
        assert_eq!(summary.slots_consumed(), 3);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let event = TraceEvent::RetryCapExceeded {
            line: 7,
            source: 1,
            target: 2,
            retries: 21,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["kind"], "retry_cap_exceeded");
        assert_eq!(v["retries"], 21);
        assert_eq!(v["kind"], event.event_type());
        let back: TraceEvent = serde_json::from_value(v).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn describe_mentions_the_charges() {
        let text = TraceEvent::Backtracked {
            line: 4,
            source: 1,
            target: 2,
            retries: 3,
        }
        .describe();
        assert!(text.contains("charge 1"));
        assert!(text.contains("charge 2"));
        assert!(text.contains("retry 3"));
    }
}
