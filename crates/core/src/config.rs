//! Tracing tunables.
//!
//! [`TraceConfig`] bundles every constant the integrator and orchestrator
//! use. [`Default`] gives the values the renderer was tuned with; a JSON
//! params object can override any subset of them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::params::{param_f64, param_string, param_usize};

/// Default integration step length in pixels.
const DEFAULT_STEP_SIZE: f64 = 5.0;
/// Default hard cap on integration steps per line.
const DEFAULT_MAX_STEPS: usize = 2000;
/// Default capture-disk radius in pixels (the drawn charge radius).
const DEFAULT_CAPTURE_RADIUS: f64 = 10.0;
/// Default path length a line must cover before it may land.
const DEFAULT_MIN_LANDING_LENGTH: f64 = 20.0;
/// Default extra domain on every side, as a fraction of the canvas size.
const DEFAULT_DOMAIN_MARGIN: f64 = 1.0;
/// Default field magnitude below which the previous direction is reused.
const DEFAULT_LOW_FIELD_THRESHOLD: f64 = 1e-4;
/// Default number of lines per unit of charge.
const DEFAULT_LINES_PER_UNIT_CHARGE: f64 = 4.0;
/// Default number of conflicts per charge before a miscount is accepted.
const DEFAULT_MAX_FAILED_LAUNCHES: u32 = 20;

/// Order in which the orchestrator drains charges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// Highest distance-from-centroid first, fixed for the whole pass.
    #[default]
    StaticScore,
    /// Most registered arrivals first, falling back to the static score.
    ArrivalPressure,
}

impl TraversalPolicy {
    /// Parses the snake-case name used in params objects.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "static_score" => Some(TraversalPolicy::StaticScore),
            "arrival_pressure" => Some(TraversalPolicy::ArrivalPressure),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TraversalPolicy::StaticScore => "static_score",
            TraversalPolicy::ArrivalPressure => "arrival_pressure",
        }
    }
}

/// Parameters of one field-line tracing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Integration step length (px). The sign comes from the source charge.
    pub step_size: f64,
    /// Hard cap on integration steps per line.
    pub max_steps: usize,
    /// Radius of the disk around a charge in which a line lands (px). Lines
    /// also start on this circle.
    pub capture_radius: f64,
    /// Path length a line must cover before it may land (px).
    pub min_landing_length: f64,
    /// Extra room on every side of the canvas, as a fraction of its size.
    pub domain_margin: f64,
    /// Field magnitude below which the previous direction is reused.
    pub low_field_threshold: f64,
    /// Lines carried per unit of charge magnitude.
    pub lines_per_unit_charge: f64,
    /// Scheduling conflicts tolerated per charge before a miscount is
    /// accepted.
    pub max_failed_launches: u32,
    /// Order in which charges are drained.
    pub traversal: TraversalPolicy,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            max_steps: DEFAULT_MAX_STEPS,
            capture_radius: DEFAULT_CAPTURE_RADIUS,
            min_landing_length: DEFAULT_MIN_LANDING_LENGTH,
            domain_margin: DEFAULT_DOMAIN_MARGIN,
            low_field_threshold: DEFAULT_LOW_FIELD_THRESHOLD,
            lines_per_unit_charge: DEFAULT_LINES_PER_UNIT_CHARGE,
            max_failed_launches: DEFAULT_MAX_FAILED_LAUNCHES,
            traversal: TraversalPolicy::default(),
        }
    }
}

impl TraceConfig {
    /// Extracts parameters from a JSON object, falling back to defaults for
    /// missing or mistyped keys. Negative lengths are taken by magnitude.
    pub fn from_json(params: &Value) -> Self {
        let traversal = param_string(params, "traversal", TraversalPolicy::StaticScore.name());
        let max_failed = param_usize(params, "max_failed_launches", DEFAULT_MAX_FAILED_LAUNCHES as usize);
        Self {
            step_size: param_f64(params, "step_size", DEFAULT_STEP_SIZE).abs(),
            max_steps: param_usize(params, "max_steps", DEFAULT_MAX_STEPS),
            capture_radius: param_f64(params, "capture_radius", DEFAULT_CAPTURE_RADIUS).abs(),
            min_landing_length: param_f64(params, "min_landing_length", DEFAULT_MIN_LANDING_LENGTH)
                .abs(),
            domain_margin: param_f64(params, "domain_margin", DEFAULT_DOMAIN_MARGIN).max(0.0),
            low_field_threshold: param_f64(
                params,
                "low_field_threshold",
                DEFAULT_LOW_FIELD_THRESHOLD,
            )
            .abs(),
            lines_per_unit_charge: param_f64(
                params,
                "lines_per_unit_charge",
                DEFAULT_LINES_PER_UNIT_CHARGE,
            )
            .max(0.0),
            max_failed_launches: u32::try_from(max_failed).unwrap_or(u32::MAX),
            traversal: TraversalPolicy::from_name(&traversal).unwrap_or_default(),
        }
    }

    /// Current values as a JSON object, keyed like [`TraceConfig::from_json`].
    pub fn params(&self) -> Value {
        json!({
            "step_size": self.step_size,
            "max_steps": self.max_steps,
            "capture_radius": self.capture_radius,
            "min_landing_length": self.min_landing_length,
            "domain_margin": self.domain_margin,
            "low_field_threshold": self.low_field_threshold,
            "lines_per_unit_charge": self.lines_per_unit_charge,
            "max_failed_launches": self.max_failed_launches,
            "traversal": self.traversal.name(),
        })
    }

    /// Describes every parameter: type, default, range and purpose.
    pub fn param_schema() -> Value {
        json!({
            "step_size": {
                "type": "number",
                "default": DEFAULT_STEP_SIZE,
                "min": 0.5,
                "max": 20.0,
                "description": "Integration step length in pixels"
            },
            "max_steps": {
                "type": "integer",
                "default": DEFAULT_MAX_STEPS,
                "min": 1,
                "max": 20000,
                "description": "Hard cap on integration steps per line"
            },
            "capture_radius": {
                "type": "number",
                "default": DEFAULT_CAPTURE_RADIUS,
                "min": 1.0,
                "max": 50.0,
                "description": "Radius around a charge where lines start and land"
            },
            "min_landing_length": {
                "type": "number",
                "default": DEFAULT_MIN_LANDING_LENGTH,
                "min": 0.0,
                "max": 200.0,
                "description": "Path length a line must cover before it may land"
            },
            "domain_margin": {
                "type": "number",
                "default": DEFAULT_DOMAIN_MARGIN,
                "min": 0.0,
                "max": 10.0,
                "description": "Extra domain on every side as a fraction of canvas size"
            },
            "low_field_threshold": {
                "type": "number",
                "default": DEFAULT_LOW_FIELD_THRESHOLD,
                "min": 0.0,
                "max": 1.0,
                "description": "Field magnitude below which the previous direction is reused"
            },
            "lines_per_unit_charge": {
                "type": "number",
                "default": DEFAULT_LINES_PER_UNIT_CHARGE,
                "min": 0.0,
                "max": 32.0,
                "description": "Field lines per unit of charge magnitude"
            },
            "max_failed_launches": {
                "type": "integer",
                "default": DEFAULT_MAX_FAILED_LAUNCHES,
                "min": 0,
                "max": 1000,
                "description": "Scheduling conflicts per charge before a miscount is accepted"
            },
            "traversal": {
                "type": "string",
                "default": TraversalPolicy::StaticScore.name(),
                "options": ["static_score", "arrival_pressure"],
                "description": "Order in which charges are drained"
            }
        })
    }
}
