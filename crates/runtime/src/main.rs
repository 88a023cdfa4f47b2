//! # CNC Runtime
//!
//! The host process that owns the motion planner and torch controller: loads
//! configuration, drains a move file through them, and either prints the
//! resulting trace (`replay`) or runs the pair live at 1kHz until the queue
//! drains or Ctrl+C arrives (`run`). Mirrors `klipper-host`'s `Cli`/
//! `Commands::{Run, Batch}` split, with `replay` standing in for `batch`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod config;
mod engine;
mod errors;
mod hardware;
mod moves;

use config::RuntimeConfig;
use engine::Engine;
use errors::RuntimeError;
use hardware::{ScriptedArcVoltage, ScriptedProbe, TraceStepSink, TraceTorchOutput, TraceZSink, VirtualClock, WallClock};
use motion::Vector3F;
use moves::Command;
use torch::sync::CallbackData;

/// Move queue capacity: generous for a host process with no real memory
/// pressure, well above the `CONTINUOUS_MOTION_DEPTH` the planner looks
/// ahead by.
const MOVE_CAP: usize = 64;
/// ATHC averaging window capacity; `runtime.cfg`'s `num_readings` is clamped
/// to this.
const ADC_CAP: usize = 2048;
/// Upper bound on ticks a single `replay` run will spend draining its move
/// file, so a move file that never reaches `is_idle()` (e.g. a scripted
/// probe that never triggers on a probe-only move) fails loudly instead of
/// hanging the process.
const MAX_REPLAY_TICKS: usize = 20_000_000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drain a move file synchronously against a virtual clock and print the
    /// resulting step/torch trace.
    Replay(ReplayArgs),
    /// Run the planner/torch pair live at 1kHz until the queue drains or
    /// Ctrl+C is pressed.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Path to the runtime's ini-style configuration file.
    #[arg(short, long, default_value = "runtime.cfg")]
    config_path: PathBuf,
    /// Path to a JSON move file (a `moves::Command` array).
    moves_path: PathBuf,
}

#[derive(Parser, Debug)]
struct RunArgs {
    #[arg(short, long, default_value = "runtime.cfg")]
    config_path: PathBuf,
    moves_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct ReplayTrace {
    ticks: usize,
    x_steps: usize,
    y_steps: usize,
    z_steps: usize,
    torch_transitions: usize,
    final_x: f64,
    final_y: f64,
}

fn main() -> Result<(), RuntimeError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => replay(args),
        Commands::Run(args) => {
            let rt = tokio::runtime::Runtime::new().expect("failed to start the tokio runtime");
            rt.block_on(run(args))
        }
    }
}

fn load_config(path: &PathBuf) -> Result<RuntimeConfig, RuntimeError> {
    tracing::info!(?path, "loading configuration");
    RuntimeConfig::load(path)
}

/// Applies a command stream to an engine and its scripted collaborators.
/// Config-override commands (`ArcVoltage`, `ProbeTriggerAfter`) take effect
/// as encountered, before ticking begins draining motion — that pins their
/// granularity to "which move this happens during" rather than a specific
/// instant mid-cut, which is enough to script ATHC/probe scenarios for a
/// replay.
fn enqueue_commands(
    engine: &Engine<MOVE_CAP, ADC_CAP>,
    commands: &[Command],
    probe: &mut ScriptedProbe,
    arc: &mut ScriptedArcVoltage,
) -> Result<(), RuntimeError> {
    for cmd in commands {
        match *cmd {
            Command::Rapid { x, y, f } => {
                engine.push_rapid(Vector3F::new(x, y, f))?;
            }
            Command::Line { x, y, f, pierce_height, pierce_delay_secs, clearance_height, cut_height } => {
                let data = CallbackData { pierce_height, pierce_delay_secs, clearance_height, cut_height };
                engine.push_line(Vector3F::new(x, y, f), data)?;
            }
            Command::Feedhold => engine.feedhold(),
            Command::Run => engine.run(),
            Command::SoftAbort => engine.soft_abort(),
            Command::Abort => engine.abort(),
            Command::ArcVoltage { raw } => arc.set_raw(raw),
            Command::ProbeTriggerAfter { steps } => probe.set_trigger_after(Some(steps)),
        }
    }
    Ok(())
}

fn replay(args: ReplayArgs) -> Result<(), RuntimeError> {
    let config = load_config(&args.config_path)?;
    let engine: Engine<MOVE_CAP, ADC_CAP> = Engine::new(&config);
    let commands = moves::load_commands(&args.moves_path)?;

    let mut probe = ScriptedProbe::new(None);
    let mut arc = ScriptedArcVoltage::new(0);
    enqueue_commands(&engine, &commands, &mut probe, &mut arc)?;

    let mut clock = VirtualClock::new();
    let mut step_sink = TraceStepSink::default();
    let mut z_sink = TraceZSink::default();
    let mut torch_out = TraceTorchOutput::default();

    let mut ticks = 0usize;
    while !engine.is_idle() && ticks < MAX_REPLAY_TICKS {
        clock.advance_one_tick();
        engine.tick(&clock, &mut step_sink, &mut z_sink, &mut probe, &mut torch_out, &mut arc)?;
        ticks += 1;
    }
    if !engine.is_idle() {
        tracing::warn!(ticks, "replay hit its tick budget before the queue drained");
    }

    let final_position = engine.current_position();
    let trace = ReplayTrace {
        ticks,
        x_steps: step_sink.x_steps.len(),
        y_steps: step_sink.y_steps.len(),
        z_steps: z_sink.z_steps.len(),
        torch_transitions: torch_out.transitions.len(),
        final_x: final_position.x,
        final_y: final_position.y,
    };
    println!("{}", serde_json::to_string_pretty(&trace).expect("ReplayTrace always serializes"));
    Ok(())
}

async fn run(args: RunArgs) -> Result<(), RuntimeError> {
    let config = load_config(&args.config_path)?;
    let engine: Engine<MOVE_CAP, ADC_CAP> = Engine::new(&config);
    let commands = moves::load_commands(&args.moves_path)?;

    let mut probe = ScriptedProbe::new(None);
    let mut arc = ScriptedArcVoltage::new(0);
    enqueue_commands(&engine, &commands, &mut probe, &mut arc)?;

    let clock = WallClock::new();
    let mut step_sink = TraceStepSink::default();
    let mut z_sink = TraceZSink::default();
    let mut torch_out = TraceTorchOutput::default();

    let mut interval = tokio::time::interval(std::time::Duration::from_millis(1));
    tracing::info!("runtime started, ticking at 1kHz");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.tick(&clock, &mut step_sink, &mut z_sink, &mut probe, &mut torch_out, &mut arc)?;
                if engine.is_idle() {
                    tracing::info!("queue drained, shutting down");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}
