//! Scene files: canvas size, solver choice, charges and tracing params.
//!
//! Charge coordinates are stored normalized to `[0, 1]` by the canvas size
//! so a scene can be replayed at any resolution; [`Scene::pixel_charges`]
//! scales them back.
//!
//! ```json
//! {
//!   "width": 400, "height": 600, "solver": "electrostatic",
//!   "charges": [{"x": 0.25, "y": 0.5, "charge": 2, "id": 0}],
//!   "params": {"step_size": 5.0}
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::charge::{validate_charges, Charge};
use crate::config::TraceConfig;
use crate::error::FieldError;
use crate::params::{param_string, require_f64};

/// Solver used when a scene does not name one.
pub const DEFAULT_SOLVER: &str = "electrostatic";

/// A charge configuration on a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub solver: String,
    /// Charges with coordinates normalized by the canvas size.
    pub charges: Vec<Charge>,
    pub params: Value,
}

impl Scene {
    /// Builds a scene from charges in pixel coordinates.
    pub fn from_pixel_charges(
        width: f64,
        height: f64,
        solver: &str,
        charges: &[Charge],
        params: Value,
    ) -> Result<Self, FieldError> {
        check_dimensions(width, height)?;
        validate_charges(charges)?;
        let charges = charges
            .iter()
            .map(|c| Charge::new(c.x / width, c.y / height, c.charge, c.id))
            .collect();
        Ok(Self {
            width,
            height,
            solver: solver.to_owned(),
            charges,
            params,
        })
    }

    /// Parses and validates a scene from a JSON value.
    ///
    /// `width` and `height` are required; `solver` defaults to
    /// [`DEFAULT_SOLVER`] and `params` to an empty object.
    pub fn from_value(value: &Value) -> Result<Self, FieldError> {
        if !value.is_object() {
            return Err(FieldError::InvalidScene("expected a JSON object".into()));
        }
        let width = require_f64(value, "width")?;
        let height = require_f64(value, "height")?;
        check_dimensions(width, height)?;

        let charges: Vec<Charge> = match value.get("charges") {
            Some(list) => serde_json::from_value(list.clone())
                .map_err(|e| FieldError::InvalidScene(format!("charges: {e}")))?,
            None => Vec::new(),
        };
        validate_charges(&charges)?;

        let params = value.get("params").cloned().unwrap_or_else(|| json!({}));
        if !params.is_object() {
            return Err(FieldError::InvalidScene("params must be an object".into()));
        }

        Ok(Self {
            width,
            height,
            solver: param_string(value, "solver", DEFAULT_SOLVER),
            charges,
            params,
        })
    }

    /// Parses a scene from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, FieldError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FieldError::InvalidScene(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn to_json_string(&self) -> Result<String, FieldError> {
        serde_json::to_string_pretty(self).map_err(|e| FieldError::InvalidScene(e.to_string()))
    }

    /// Charges scaled to canvas pixels.
    pub fn pixel_charges(&self) -> Vec<Charge> {
        self.charges
            .iter()
            .map(|c| Charge::new(c.x * self.width, c.y * self.height, c.charge, c.id))
            .collect()
    }

    /// Tracing parameters from `params`, defaults for anything missing.
    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig::from_json(&self.params)
    }
}

fn check_dimensions(width: f64, height: f64) -> Result<(), FieldError> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(FieldError::InvalidDimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIPOLE: &str = r#"{
        "width": 400, "height": 600, "solver": "electrostatic",
        "charges": [
            {"x": 0.25, "y": 0.5, "charge": 2, "id": 0},
            {"x": 0.75, "y": 0.5, "charge": -2, "id": 1}
        ],
        "params": {"max_steps": 4000}
    }"#;

    #[test]
    fn parses_and_scales_charges() {
        let scene = Scene::from_json_str(DIPOLE).unwrap();
        assert_eq!(scene.solver, "electrostatic");
        let charges = scene.pixel_charges();
        assert_eq!(charges[0], Charge::new(100.0, 300.0, 2.0, 0));
        assert_eq!(charges[1], Charge::new(300.0, 300.0, -2.0, 1));
        assert_eq!(scene.trace_config().max_steps, 4000);
    }

    #[test]
    fn missing_optional_fields_default() {
        let scene = Scene::from_json_str(r#"{"width": 10, "height": 20}"#).unwrap();
        assert_eq!(scene.solver, DEFAULT_SOLVER);
        assert!(scene.charges.is_empty());
        assert_eq!(scene.trace_config(), TraceConfig::default());
    }

    #[test]
    fn pixel_round_trip() {
        let pixels = [Charge::new(100.0, 150.0, 1.0, 3)];
        let scene = Scene::from_pixel_charges(200.0, 300.0, "magnetostatic", &pixels, json!({})).unwrap();
        assert_eq!(scene.charges[0].x, 0.5);
        assert_eq!(scene.pixel_charges(), pixels.to_vec());
        let text = scene.to_json_string().unwrap();
        assert_eq!(Scene::from_json_str(&text).unwrap(), scene);
    }

    #[test]
    fn missing_width_is_param_not_found() {
        let result = Scene::from_json_str(r#"{"height": 20}"#);
        assert!(matches!(result, Err(FieldError::ParamNotFound(name)) if name == "width"));
    }

    #[test]
    fn rejects_bad_scenes() {
        assert!(matches!(
            Scene::from_json_str("not json"),
            Err(FieldError::InvalidScene(_))
        ));
        assert!(matches!(
            Scene::from_json_str("[1, 2]"),
            Err(FieldError::InvalidScene(_))
        ));
        assert!(matches!(
            Scene::from_json_str(r#"{"width": 0, "height": 20}"#),
            Err(FieldError::InvalidDimensions)
        ));
        assert!(matches!(
            Scene::from_json_str(r#"{"width": 10, "height": 20, "charges": [{"x": 1}]}"#),
            Err(FieldError::InvalidScene(_))
        ));
        assert!(matches!(
            Scene::from_json_str(r#"{"width": 10, "height": 20, "params": 3}"#),
            Err(FieldError::InvalidScene(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = r#"{"width": 10, "height": 20, "charges": [
            {"x": 0.1, "y": 0.1, "charge": 1, "id": 2},
            {"x": 0.2, "y": 0.1, "charge": 1, "id": 2}
        ]}"#;
        assert!(matches!(
            Scene::from_json_str(text),
            Err(FieldError::DuplicateChargeId(2))
        ));
    }
}
