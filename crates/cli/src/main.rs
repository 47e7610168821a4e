#![deny(unsafe_code)]
//! CLI binary for fieldviz.
//!
//! Subcommands:
//! - `trace <scene>`: trace field lines, write the plot as JSON
//! - `contours <scene>`: equipotentials (or magnetostatic field lines) as JSON
//! - `render <scene>`: rasterize a plot to PNG
//! - `list`: print solvers and tracing parameters

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use fieldviz_core::{Scene, TraceConfig, TraceLog, TraceSummary};
use fieldviz_solvers::pixel::{self, Raster};
use fieldviz_solvers::{PlotKind, SolverKind};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "fieldviz", about = "2D electromagnetic field visualizer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace field lines for a scene and write the plot as JSON.
    Trace {
        /// Scene file (JSON).
        scene: PathBuf,

        /// Tracing parameters as a JSON string, overriding the scene's.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Write the plot here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute potential contours for a scene and write them as JSON.
    Contours {
        /// Scene file (JSON).
        scene: PathBuf,

        /// Solver name, overriding the scene's.
        #[arg(long)]
        solver: Option<String>,

        /// Write the contours here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rasterize a plot of a scene and write a PNG.
    Render {
        /// Scene file (JSON).
        scene: PathBuf,

        /// Plot kind (field-line, contour, quiver).
        #[arg(short, long, default_value = "field-line")]
        plot: String,

        /// Solver name, overriding the scene's.
        #[arg(long)]
        solver: Option<String>,

        /// Quiver lattice spacing in pixels.
        #[arg(long)]
        spacing: Option<f64>,

        /// Tracing parameters as a JSON string, overriding the scene's.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// List available solvers and tracing parameters.
    List,
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let solvers: Vec<Value> = SolverKind::list_solvers()
                .iter()
                .map(|name| SolverKind::from_name(name, Vec::new()).map(|s| s.describe()))
                .collect::<Result<_, _>>()?;
            let schema = TraceConfig::param_schema();
            if cli.json {
                let info = serde_json::json!({
                    "solvers": solvers,
                    "params": schema,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Solvers:");
                for s in &solvers {
                    println!("  {} ({})", s["name"].as_str().unwrap_or("?"), plot_list(s));
                }
                println!("Params:");
                if let Some(params) = schema.as_object() {
                    for (name, spec) in params {
                        println!("  {name} = {}", spec["default"]);
                    }
                }
            }
        }
        Command::Trace {
            scene,
            params,
            output,
        } => {
            let scene = load_scene(&scene, &params, None)?;
            let solver = SolverKind::from_name(&scene.solver, scene.pixel_charges())?;
            let plot = solver.field_lines(scene.width, scene.height, scene.trace_config())?;

            report_warnings(&plot.log, cli.json);
            write_json(&serde_json::to_value(&plot)?, output.as_deref())?;
            if !cli.json {
                eprintln!("{}", summary_line(&plot.summary));
            }
        }
        Command::Contours {
            scene,
            solver,
            output,
        } => {
            let scene = load_scene(&scene, "{}", solver)?;
            let solver = SolverKind::from_name(&scene.solver, scene.pixel_charges())?;
            let plot = solver.contours(scene.width, scene.height)?;

            write_json(&serde_json::to_value(&plot)?, output.as_deref())?;
            if !cli.json {
                eprintln!(
                    "{} contours, {} arrows ({})",
                    plot.contours.len(),
                    plot.arrows.len(),
                    solver.name()
                );
            }
        }
        Command::Render {
            scene,
            plot,
            solver,
            spacing,
            params,
            output,
        } => {
            let kind = PlotKind::from_name(&plot)
                .ok_or_else(|| CliError::Input(format!("unknown plot kind: {plot}")))?;
            let scene = load_scene(&scene, &params, solver)?;
            let charges = scene.pixel_charges();
            let solver = SolverKind::from_name(&scene.solver, charges.clone())?;
            let (w, h) = raster_size(&scene);

            let raster: Raster = match kind {
                PlotKind::FieldLines => {
                    let plot =
                        solver.field_lines(scene.width, scene.height, scene.trace_config())?;
                    report_warnings(&plot.log, cli.json);
                    pixel::render_field_lines(&plot, &charges, w, h)?
                }
                PlotKind::Contours => {
                    let plot = solver.contours(scene.width, scene.height)?;
                    pixel::render_contours(&plot, &charges, w, h)?
                }
                PlotKind::Quiver => {
                    let arrows = solver.quiver(scene.width, scene.height, spacing);
                    pixel::render_quiver(&arrows, &charges, w, h)?
                }
            };

            fieldviz_solvers::snapshot::write_png(&raster, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "solver": solver.name(),
                    "plot": kind.name(),
                    "width": w,
                    "height": h,
                    "charges": charges.len(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} {} ({w}x{h}, {} charges) -> {}",
                    solver.name(),
                    kind.name(),
                    charges.len(),
                    output.display()
                );
            }
        }
    }

    Ok(())
}

/// Reads a scene file, applies `--params` overrides and an optional solver
/// override.
fn load_scene(path: &Path, params: &str, solver: Option<String>) -> Result<Scene, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    let mut scene = Scene::from_json_str(&text)?;

    let overrides: Value = serde_json::from_str(params)
        .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
    merge_params(&mut scene.params, &overrides)?;

    if let Some(name) = solver {
        scene.solver = name;
    }
    Ok(scene)
}

/// Copies every key of `overrides` into `base`.
fn merge_params(base: &mut Value, overrides: &Value) -> Result<(), CliError> {
    let overrides = overrides
        .as_object()
        .ok_or_else(|| CliError::Input("--params must be a JSON object".into()))?;
    let base = base
        .as_object_mut()
        .ok_or_else(|| CliError::Input("scene params must be a JSON object".into()))?;
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
    Ok(())
}

fn raster_size(scene: &Scene) -> (usize, usize) {
    (scene.width.ceil() as usize, scene.height.ceil() as usize)
}

/// Warning-class trace events go to stderr, one line each (or one JSON
/// object each under `--json`).
fn report_warnings(log: &TraceLog, json: bool) {
    for event in log.warnings() {
        if json {
            let line = serde_json::to_string(event).unwrap_or_default();
            eprintln!("{line}");
        } else {
            eprintln!("warning: {}", event.describe());
        }
    }
}

fn summary_line(summary: &TraceSummary) -> String {
    format!(
        "traced {} lines: {} arrivals, {} backtracks, {} miscounted, {} incomplete",
        summary.lines, summary.arrivals, summary.backtracks, summary.miscounted, summary.incomplete
    )
}

fn plot_list(solver: &Value) -> String {
    solver["plots"]
        .as_array()
        .map(|plots| {
            plots
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn write_json(value: &Value, output: Option<&Path>) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| CliError::Io(format!("{}: {e}", path.display()))),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
