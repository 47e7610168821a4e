#![deny(unsafe_code)]
//! Core types and algorithms for fieldviz, a 2D electromagnetic field
//! visualizer.
//!
//! Given point charges (or line currents) and a [`FieldSampler`], this crate
//! decides where to draw: field lines that start and end on charges with a
//! line count proportional to each charge ([`FieldLineOrchestrator`]),
//! equipotential and magnetostatic contours ([`PotentialContourAdapter`]),
//! and quiver samples ([`quiver()`]). Nothing here draws pixels or touches
//! the filesystem.

pub mod angle;
pub mod charge;
pub mod config;
pub mod contour;
pub mod departure;
pub mod error;
pub mod event;
pub mod integrator;
pub mod orchestrator;
pub mod params;
pub mod polyline;
pub mod quiver;
pub mod sampler;
pub mod scene;

pub use angle::AngularRange;
pub use charge::{Charge, ChargeId};
pub use config::{TraceConfig, TraversalPolicy};
pub use contour::{Contour, ContourGrid, ContourPlot, PotentialContourAdapter};
pub use departure::DepartureScheduler;
pub use error::FieldError;
pub use event::{TraceEvent, TraceLog, TraceSummary};
pub use integrator::{Domain, Streamline, StreamlineIntegrator, Termination};
pub use orchestrator::{
    trace_field_lines, ChargePhase, FieldLine, FieldLineOrchestrator, FieldLinePlot,
    TracingContext,
};
pub use polyline::{gaussian_crossings, ArrowPlacement, SurfaceCrossing, VisibleSegment};
pub use quiver::{quiver, QuiverArrow};
pub use sampler::{ElectrostaticField, FieldSampler, MagnetostaticField, PotentialSampler};
pub use scene::Scene;
