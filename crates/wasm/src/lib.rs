#![deny(unsafe_code)]
//! WASM bindings for fieldviz.
//!
//! The host page keeps one [`FieldVizJs`] per canvas, edits its charges as
//! the user drags them around, and asks for plots as JSON strings (or an
//! RGBA buffer it can put straight into an `ImageData`).

use fieldviz_core::{Charge, ChargeId, FieldError, FieldSampler, Scene, TraceConfig};
use fieldviz_solvers::pixel::{self, CHARGE_RADIUS};
use fieldviz_solvers::{PlotKind, SolverKind};
use glam::DVec2;
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// A canvas with a solver, its charges and the tracing parameters.
#[wasm_bindgen]
pub struct FieldVizJs {
    solver: SolverKind,
    width: f64,
    height: f64,
    config: TraceConfig,
}

#[wasm_bindgen]
impl FieldVizJs {
    /// An empty canvas using the named solver.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, solver: &str) -> Result<FieldVizJs, JsError> {
        Ok(Self::create(width, height, solver)?)
    }

    /// Switches solver, keeping the charges.
    pub fn set_solver(&mut self, name: &str) -> Result<(), JsError> {
        let charges = self.solver.charges().to_vec();
        self.solver = SolverKind::from_name(name, charges)?;
        Ok(())
    }

    pub fn solver_name(&self) -> String {
        self.solver.name().to_string()
    }

    /// Replaces all charges from a JSON array of `{x, y, charge, id}` in
    /// pixels.
    pub fn set_charges(&mut self, json: &str) -> Result<(), JsError> {
        Ok(self.load_charges(json)?)
    }

    /// Adds a charge and returns its new id.
    pub fn add_charge(&mut self, x: f64, y: f64, charge: f64) -> u32 {
        let id = self.next_id();
        let mut charges = self.solver.charges().to_vec();
        charges.push(Charge::new(x, y, charge, id));
        self.solver.set_charges(charges);
        id
    }

    /// Id of the topmost charge under `(x, y)`, if any.
    pub fn charge_at(&self, x: f64, y: f64) -> Option<u32> {
        self.index_at(x, y).map(|i| self.solver.charges()[i].id)
    }

    /// Moves the charge with `id`. Returns false if there is none.
    pub fn move_charge(&mut self, id: u32, x: f64, y: f64) -> bool {
        self.update_charge(id, |c| {
            c.x = x;
            c.y = y;
        })
    }

    /// Changes the magnitude of the charge with `id`.
    pub fn set_charge_value(&mut self, id: u32, charge: f64) -> bool {
        self.update_charge(id, |c| c.charge = charge)
    }

    /// Removes the topmost charge under `(x, y)` and returns its id.
    pub fn remove_charge_at(&mut self, x: f64, y: f64) -> Option<u32> {
        let index = self.index_at(x, y)?;
        let mut charges = self.solver.charges().to_vec();
        let removed = charges.remove(index);
        self.solver.set_charges(charges);
        Some(removed.id)
    }

    /// Tracing overrides as a JSON object; missing keys keep their defaults.
    pub fn set_params(&mut self, json: &str) -> Result<(), JsError> {
        Ok(self.load_params(json)?)
    }

    /// Field vector at `(x, y)` as `[u, v]`.
    pub fn evaluate(&self, x: f64, y: f64) -> Vec<f64> {
        let (u, v) = self.solver.evaluate(x, y);
        vec![u, v]
    }

    pub fn field_lines(&self) -> Result<String, JsError> {
        Ok(self.field_lines_json()?)
    }

    pub fn contours(&self) -> Result<String, JsError> {
        Ok(self.contours_json()?)
    }

    /// Quiver samples; `spacing` of 0 or less uses the default lattice.
    pub fn quiver(&self, spacing: f64) -> Result<String, JsError> {
        Ok(self.quiver_json(spacing)?)
    }

    /// RGBA8 pixels of the named plot (`field-line`, `contour`, `quiver`).
    pub fn render(&self, plot: &str) -> Result<Vec<u8>, JsError> {
        Ok(self.render_rgba(plot)?)
    }

    /// The current canvas as a scene file.
    pub fn scene(&self) -> Result<String, JsError> {
        Ok(self.scene_json()?)
    }

    /// JSON list of solvers with the plots each supports.
    pub fn list_solvers() -> String {
        let solvers: Vec<Value> = SolverKind::list_solvers()
            .iter()
            .filter_map(|name| SolverKind::from_name(name, Vec::new()).ok())
            .map(|s| s.describe())
            .collect();
        Value::Array(solvers).to_string()
    }
}

impl FieldVizJs {
    fn create(width: f64, height: f64, solver: &str) -> Result<Self, FieldError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FieldError::InvalidDimensions);
        }
        Ok(Self {
            solver: SolverKind::from_name(solver, Vec::new())?,
            width,
            height,
            config: TraceConfig::default(),
        })
    }

    fn load_charges(&mut self, json: &str) -> Result<(), FieldError> {
        let charges: Vec<Charge> =
            serde_json::from_str(json).map_err(|e| FieldError::InvalidScene(e.to_string()))?;
        fieldviz_core::charge::validate_charges(&charges)?;
        self.solver.set_charges(charges);
        Ok(())
    }

    fn load_params(&mut self, json: &str) -> Result<(), FieldError> {
        let params: Value =
            serde_json::from_str(json).map_err(|e| FieldError::InvalidScene(e.to_string()))?;
        self.config = TraceConfig::from_json(&params);
        Ok(())
    }

    fn next_id(&self) -> ChargeId {
        self.solver
            .charges()
            .iter()
            .map(|c| c.id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Picking ignores sign, so neutral charges can still be grabbed.
    fn index_at(&self, x: f64, y: f64) -> Option<usize> {
        let p = DVec2::new(x, y);
        self.solver
            .charges()
            .iter()
            .rposition(|c| c.position().distance(p) < CHARGE_RADIUS)
    }

    fn update_charge(&mut self, id: ChargeId, edit: impl FnOnce(&mut Charge)) -> bool {
        let mut charges = self.solver.charges().to_vec();
        let Some(charge) = charges.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        edit(charge);
        self.solver.set_charges(charges);
        true
    }

    fn field_lines_json(&self) -> Result<String, FieldError> {
        let plot = self.solver.field_lines(self.width, self.height, self.config)?;
        to_json(&plot)
    }

    fn contours_json(&self) -> Result<String, FieldError> {
        let plot = self.solver.contours(self.width, self.height)?;
        to_json(&plot)
    }

    fn quiver_json(&self, spacing: f64) -> Result<String, FieldError> {
        let spacing = (spacing > 0.0).then_some(spacing);
        to_json(&self.solver.quiver(self.width, self.height, spacing))
    }

    fn render_rgba(&self, plot: &str) -> Result<Vec<u8>, FieldError> {
        let kind = PlotKind::from_name(plot).ok_or_else(|| FieldError::UnsupportedPlot {
            solver: self.solver.name().to_string(),
            plot: plot.to_string(),
        })?;
        let charges = self.solver.charges();
        let (w, h) = (self.width.ceil() as usize, self.height.ceil() as usize);
        let raster = match kind {
            PlotKind::FieldLines => {
                let plot = self.solver.field_lines(self.width, self.height, self.config)?;
                pixel::render_field_lines(&plot, charges, w, h)?
            }
            PlotKind::Contours => {
                let plot = self.solver.contours(self.width, self.height)?;
                pixel::render_contours(&plot, charges, w, h)?
            }
            PlotKind::Quiver => {
                let arrows = self.solver.quiver(self.width, self.height, None);
                pixel::render_quiver(&arrows, charges, w, h)?
            }
        };
        Ok(raster.into_rgba())
    }

    fn scene_json(&self) -> Result<String, FieldError> {
        Scene::from_pixel_charges(
            self.width,
            self.height,
            self.solver.name(),
            self.solver.charges(),
            self.config.params(),
        )?
        .to_json_string()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, FieldError> {
    serde_json::to_string(value).map_err(|e| FieldError::InvalidScene(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> FieldVizJs {
        let mut viz = FieldVizJs::create(300.0, 200.0, "electrostatic").unwrap();
        viz.add_charge(100.0, 100.0, 1.0);
        viz.add_charge(200.0, 100.0, -1.0);
        viz
    }

    #[test]
    fn add_charge_assigns_fresh_ids() {
        let mut viz = canvas();
        assert_eq!(viz.add_charge(50.0, 50.0, 2.0), 2);
        assert_eq!(viz.solver.charges().len(), 3);
    }

    #[test]
    fn picking_prefers_topmost() {
        let mut viz = canvas();
        let top = viz.add_charge(104.0, 100.0, 0.0);
        assert_eq!(viz.charge_at(102.0, 100.0), Some(top));
        assert_eq!(viz.charge_at(10.0, 10.0), None);
        assert_eq!(viz.remove_charge_at(102.0, 100.0), Some(top));
        assert_eq!(viz.charge_at(102.0, 100.0), Some(0));
    }

    #[test]
    fn move_and_edit_charges() {
        let mut viz = canvas();
        assert!(viz.move_charge(1, 250.0, 120.0));
        assert!(viz.set_charge_value(1, -3.0));
        assert!(!viz.move_charge(9, 0.0, 0.0));
        let moved = viz.solver.charges()[1];
        assert_eq!((moved.x, moved.y, moved.charge), (250.0, 120.0, -3.0));
    }

    #[test]
    fn field_lines_json_lists_lines() {
        let mut viz = canvas();
        viz.load_params(r#"{"domain_margin": 10, "max_steps": 5000}"#).unwrap();
        let json: Value = serde_json::from_str(&viz.field_lines_json().unwrap()).unwrap();
        assert_eq!(json["lines"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn magnetostatic_has_no_field_lines() {
        let viz = FieldVizJs::create(300.0, 200.0, "magnetostatic").unwrap();
        assert!(matches!(
            viz.field_lines_json(),
            Err(FieldError::UnsupportedPlot { .. })
        ));
        assert!(viz.contours_json().is_ok());
    }

    #[test]
    fn render_returns_full_buffer() {
        let viz = canvas();
        let rgba = viz.render_rgba("quiver").unwrap();
        assert_eq!(rgba.len(), 300 * 200 * 4);
        assert!(matches!(
            viz.render_rgba("heatmap"),
            Err(FieldError::UnsupportedPlot { .. })
        ));
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(matches!(
            FieldVizJs::create(0.0, 10.0, "electrostatic"),
            Err(FieldError::InvalidDimensions)
        ));
        assert!(matches!(
            FieldVizJs::create(10.0, 10.0, "plasma"),
            Err(FieldError::UnknownSolver(_))
        ));
        let mut viz = canvas();
        let dup = r#"[{"x": 1, "y": 1, "charge": 1, "id": 0}, {"x": 2, "y": 2, "charge": 1, "id": 0}]"#;
        assert!(matches!(
            viz.load_charges(dup),
            Err(FieldError::DuplicateChargeId(0))
        ));
        assert_eq!(viz.solver.charges().len(), 2);
    }

    #[test]
    fn scene_export_round_trips() {
        let viz = canvas();
        let scene = Scene::from_json_str(&viz.scene_json().unwrap()).unwrap();
        for (a, b) in scene.pixel_charges().iter().zip(viz.solver.charges()) {
            assert_eq!(a.id, b.id);
            assert!(a.position().distance(b.position()) < 1e-9);
        }
        assert_eq!(scene.trace_config(), TraceConfig::default());
    }

    #[test]
    fn list_solvers_is_json_array() {
        let list: Value = serde_json::from_str(&FieldVizJs::list_solvers()).unwrap();
        assert_eq!(list.as_array().unwrap().len(), 2);
    }
}
