//! Mesh CLI
//!
//! Replay, evaluate and check Mesh scenes from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mesh_core::{
    evaluate, Clock, DisplayChange, JsonFileStore, ManualClock, Mesh, MeshConfig, TargetSpec,
    ValueStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod scene;

use scene::Scene;

#[derive(Parser)]
#[command(name = "mesh")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drag-linked reactive values", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scene's gesture script and print the resulting displays
    Run {
        /// Scene file
        scene: PathBuf,

        /// JSON file persisting source values between runs
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Evaluate a single target expression
    Eval {
        /// Expression, e.g. "@bananas / (@others + 1)"
        expression: String,

        /// Source value as name=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, f64)>,

        /// Round to this many decimal places
        #[arg(short, long)]
        decimal: Option<String>,

        /// Floor the result
        #[arg(long)]
        floor: bool,

        /// Format the result as currency
        #[arg(long)]
        currency: bool,
    },

    /// Check that every target in a scene evaluates
    Check {
        /// Scene file
        scene: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { scene, state } => cmd_run(&scene, state.as_deref()),

        Commands::Eval {
            expression,
            vars,
            decimal,
            floor,
            currency,
        } => cmd_eval(&expression, vars, decimal, floor, currency),

        Commands::Check { scene } => cmd_check(&scene),
    }
}

fn parse_var(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim().trim_start_matches('@');
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

fn cmd_run(path: &Path, state: Option<&Path>) -> Result<()> {
    let scene = Scene::load(path)?;
    info!(
        "Replaying {} ({} sources, {} targets, {} steps)",
        path.display(),
        scene.sources.len(),
        scene.targets.len(),
        scene.script.len()
    );

    let clock = ManualClock::new();
    let observed = clock.clone();
    let mut builder = Mesh::builder()
        .config(scene.config.clone())
        .clock(Arc::new(clock.clone()))
        .sources(scene.source_specs()?)
        .targets(scene.target_specs()?)
        .observer(move |change| {
            let at = observed.now().as_millis();
            match change {
                DisplayChange::Source { name, text } => {
                    println!("{at:>6}ms  source {name} = {text}")
                }
                DisplayChange::Target { id, text } => {
                    println!("{at:>6}ms  target #{} = {text}", id.index())
                }
                DisplayChange::DragActive(active) => {
                    println!("{at:>6}ms  dragging: {active}")
                }
            }
        });

    if let Some(state) = state {
        builder = builder.persistence(JsonFileStore::open(state)?);
    }
    let mut mesh = builder.build()?;

    for step in &scene.script {
        advance_to(&mut mesh, &clock, step.time());
        if let Err(err) = mesh.handle(step.action.clone().into()) {
            warn!("step at {}ms: {}", step.at, err);
        }
    }
    while let Some(deadline) = mesh.next_deadline() {
        clock.set(deadline);
        mesh.tick();
    }

    println!();
    for name in mesh.source_names() {
        println!("{name} = {}", mesh.source_display(name).unwrap_or_default());
    }
    for id in mesh.target_ids() {
        println!(
            "{} => {}",
            mesh.target_expression(id).unwrap_or_default(),
            mesh.target_display(id).unwrap_or_default()
        );
    }

    Ok(())
}

/// Fire every timer due before `time`, then move the clock there
fn advance_to(mesh: &mut Mesh, clock: &ManualClock, time: Duration) {
    while let Some(deadline) = mesh.next_deadline() {
        if deadline > time {
            break;
        }
        clock.set(deadline);
        mesh.tick();
    }
    clock.set(time);
}

fn cmd_eval(
    expression: &str,
    vars: Vec<(String, f64)>,
    decimal: Option<String>,
    floor: bool,
    currency: bool,
) -> Result<()> {
    let values: ValueStore = vars.into_iter().collect();

    let mut spec = TargetSpec::new(expression);
    spec.decimal = decimal;
    spec.floor = floor;
    spec.currency = currency;
    let format = spec.format(MeshConfig::default().decimal_places);

    match evaluate(expression, &values) {
        Ok(raw) => {
            println!("{}", format.apply(raw));
            Ok(())
        }
        Err(err) => anyhow::bail!("Could not evaluate '{}': {}", expression, err),
    }
}

fn cmd_check(path: &Path) -> Result<()> {
    let scene = Scene::load(path)?;
    let mut mesh = Mesh::builder()
        .config(MeshConfig {
            save: Some(false),
            ..scene.config.clone()
        })
        .clock(Arc::new(ManualClock::new()))
        .sources(scene.source_specs()?)
        .targets(scene.target_specs()?)
        .build()?;
    mesh.flush();

    let mut failures = 0;
    for id in mesh.target_ids() {
        if let Some(err) = mesh.target_error(id) {
            failures += 1;
            warn!(
                "target #{} '{}': {}",
                id.index(),
                mesh.target_expression(id).unwrap_or_default(),
                err
            );
        }
    }

    if failures > 0 {
        anyhow::bail!(
            "{} of {} targets failed to evaluate",
            failures,
            mesh.target_ids().count()
        );
    }
    info!("All {} targets evaluate", mesh.target_ids().count());
    Ok(())
}
