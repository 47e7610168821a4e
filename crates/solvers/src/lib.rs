#![deny(unsafe_code)]
//! Solver registry: maps solver names to field samplers and knows which plot
//! kinds each one can produce. Also provides CPU-side rasterization and PNG
//! snapshots.
//!
//! Both the CLI and the WASM bindings go through [`SolverKind`] so the
//! "field lines only for the direct electrostatic solver" rule lives in one
//! place.

pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

use fieldviz_core::contour::{field_line_levels, ContourGrid, POTENTIAL_LEVELS};
use fieldviz_core::quiver::DEFAULT_SPACING;
use fieldviz_core::{
    trace_field_lines, Charge, ContourPlot, ElectrostaticField, FieldError, FieldLinePlot,
    FieldSampler, MagnetostaticField, PotentialContourAdapter, PotentialSampler, QuiverArrow,
    TraceConfig,
};
use serde_json::{json, Value};

/// Names accepted by [`SolverKind::from_name`].
const SOLVER_NAMES: &[&str] = &["electrostatic", "magnetostatic"];

/// Name reported by host-driven solvers.
pub const DYNAMIC_SOLVER: &str = "dynamic";

/// Contour grid cells per axis, padding included.
pub const DEFAULT_GRID_RESOLUTION: usize = 20;

/// The kinds of plot a solver may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    FieldLines,
    Contours,
    Quiver,
}

impl PlotKind {
    pub fn name(self) -> &'static str {
        match self {
            PlotKind::FieldLines => "field-line",
            PlotKind::Contours => "contour",
            PlotKind::Quiver => "quiver",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "field-line" | "fieldline" => Some(PlotKind::FieldLines),
            "contour" => Some(PlotKind::Contours),
            "quiver" => Some(PlotKind::Quiver),
            _ => None,
        }
    }
}

/// A field solver together with the charges (or currents) it sums over.
///
/// Selected once by name; callers then ask for plots and get
/// `FieldError::UnsupportedPlot` where the solver cannot provide one.
pub enum SolverKind {
    /// Softened Coulomb sum over point charges.
    ElectrostaticDirect(ElectrostaticField),
    /// In-plane field of line currents.
    MagnetostaticDirect(MagnetostaticField),
    /// A time-stepped field owned by the host. Only quiver plots are
    /// available because its lines need not end on charges.
    Dynamic {
        engine: Box<dyn FieldSampler>,
        charges: Vec<Charge>,
    },
}

impl SolverKind {
    /// Constructs a direct-summation solver by name.
    ///
    /// Returns `FieldError::UnknownSolver` if the name is not recognized.
    pub fn from_name(name: &str, charges: Vec<Charge>) -> Result<Self, FieldError> {
        match name {
            "electrostatic" => Ok(SolverKind::ElectrostaticDirect(ElectrostaticField::new(
                charges,
            ))),
            "magnetostatic" => Ok(SolverKind::MagnetostaticDirect(MagnetostaticField::new(
                charges,
            ))),
            _ => Err(FieldError::UnknownSolver(name.to_string())),
        }
    }

    /// Wraps a host-driven sampler.
    pub fn dynamic(engine: Box<dyn FieldSampler>, charges: Vec<Charge>) -> Self {
        SolverKind::Dynamic { engine, charges }
    }

    /// Returns a slice of all names [`SolverKind::from_name`] accepts.
    pub fn list_solvers() -> &'static [&'static str] {
        SOLVER_NAMES
    }

    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::ElectrostaticDirect(_) => "electrostatic",
            SolverKind::MagnetostaticDirect(_) => "magnetostatic",
            SolverKind::Dynamic { .. } => DYNAMIC_SOLVER,
        }
    }

    pub fn charges(&self) -> &[Charge] {
        match self {
            SolverKind::ElectrostaticDirect(f) => f.charges(),
            SolverKind::MagnetostaticDirect(f) => f.currents(),
            SolverKind::Dynamic { charges, .. } => charges,
        }
    }

    /// Replaces the sources. A dynamic engine keeps its own state; only the
    /// charges used for markers and quiver exclusion change.
    pub fn set_charges(&mut self, new: Vec<Charge>) {
        match self {
            SolverKind::ElectrostaticDirect(f) => f.set_charges(new),
            SolverKind::MagnetostaticDirect(f) => f.set_currents(new),
            SolverKind::Dynamic { charges, .. } => *charges = new,
        }
    }

    pub fn supports(&self, plot: PlotKind) -> bool {
        match self {
            SolverKind::ElectrostaticDirect(_) => true,
            SolverKind::MagnetostaticDirect(_) => plot != PlotKind::FieldLines,
            SolverKind::Dynamic { .. } => plot == PlotKind::Quiver,
        }
    }

    /// The scalar potential, for solvers that have one.
    pub fn potential(&self) -> Option<&dyn PotentialSampler> {
        match self {
            SolverKind::ElectrostaticDirect(f) => Some(f),
            SolverKind::MagnetostaticDirect(f) => Some(f),
            SolverKind::Dynamic { .. } => None,
        }
    }

    /// Field lines that start and end on charges.
    pub fn field_lines(
        &self,
        width: f64,
        height: f64,
        config: TraceConfig,
    ) -> Result<FieldLinePlot, FieldError> {
        match self {
            SolverKind::ElectrostaticDirect(f) => {
                trace_field_lines(f, f.charges(), width, height, config)
            }
            _ => Err(self.unsupported(PlotKind::FieldLines)),
        }
    }

    /// Equipotentials for the electrostatic solver; field lines drawn as
    /// contours, with direction arrows, for the magnetostatic one.
    pub fn contours(&self, width: f64, height: f64) -> Result<ContourPlot, FieldError> {
        let grid = ContourGrid::new(
            width,
            height,
            DEFAULT_GRID_RESOLUTION,
            DEFAULT_GRID_RESOLUTION,
        )?;
        match self {
            SolverKind::ElectrostaticDirect(f) => {
                let adapter = PotentialContourAdapter::new(f, f.charges(), grid);
                Ok(ContourPlot {
                    contours: adapter.contours_at_levels(&POTENTIAL_LEVELS),
                    arrows: Vec::new(),
                })
            }
            SolverKind::MagnetostaticDirect(f) => {
                let adapter = PotentialContourAdapter::new(f, f.currents(), grid);
                Ok(adapter.contours_with_arrows(&field_line_levels()))
            }
            SolverKind::Dynamic { .. } => Err(self.unsupported(PlotKind::Contours)),
        }
    }

    /// Field vectors on a lattice. Every solver supports this.
    pub fn quiver(&self, width: f64, height: f64, spacing: Option<f64>) -> Vec<QuiverArrow> {
        fieldviz_core::quiver(
            self,
            width,
            height,
            spacing.unwrap_or(DEFAULT_SPACING),
            self.charges(),
        )
    }

    /// Name and supported plot kinds, for listings.
    pub fn describe(&self) -> Value {
        let plots: Vec<&str> = [PlotKind::FieldLines, PlotKind::Contours, PlotKind::Quiver]
            .into_iter()
            .filter(|p| self.supports(*p))
            .map(PlotKind::name)
            .collect();
        json!({ "name": self.name(), "plots": plots })
    }

    fn unsupported(&self, plot: PlotKind) -> FieldError {
        FieldError::UnsupportedPlot {
            solver: self.name().to_string(),
            plot: plot.name().to_string(),
        }
    }
}

impl FieldSampler for SolverKind {
    fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            SolverKind::ElectrostaticDirect(f) => f.evaluate(x, y),
            SolverKind::MagnetostaticDirect(f) => f.evaluate(x, y),
            SolverKind::Dynamic { engine, .. } => engine.evaluate(x, y),
        }
    }

    fn tick(&mut self, dt: f64) {
        match self {
            SolverKind::ElectrostaticDirect(f) => f.tick(dt),
            SolverKind::MagnetostaticDirect(f) => f.tick(dt),
            SolverKind::Dynamic { engine, .. } => engine.tick(dt),
        }
    }
}
