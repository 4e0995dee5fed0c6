mod control;
mod scene;
mod time_accumulator;

use anyhow::{bail, Context};
use clap::Parser;
use control::Gains;
use rigid_physics::WorldConfig;
use scene::{Lesson, LessonScene};
use std::{path::PathBuf, time::Duration};
use time_accumulator::TimeAccumulator;
use tracing_subscriber::EnvFilter;

/// Runs a rigid body lesson scene without a window, printing body state as it goes.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = Lesson::Bounce)]
    scenario: Lesson,

    /// Number of physics steps to run.
    #[arg(long, default_value_t = 1000)]
    steps: u64,

    /// Simulated frame time fed to the step accumulator.
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Print every body each N steps, 0 to only print the final state.
    #[arg(long, default_value_t = 100)]
    print_every: u64,

    /// Ankle then knee PD gains for the leg lesson.
    #[arg(long, num_args = 4, value_names = ["KP0", "KV0", "KP1", "KV1"])]
    gains: Option<Vec<f32>>,

    /// JSON world settings replacing the lesson's own.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_gains(values: Option<&[f32]>) -> [Gains; 2] {
    match values {
        Some(&[kp0, kv0, kp1, kv1]) => [Gains { kp: kp0, kv: kv0 }, Gains { kp: kp1, kv: kv1 }],
        _ => [Gains::default(); 2],
    }
}

fn load_config(path: &PathBuf) -> anyhow::Result<WorldConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    WorldConfig::from_json(&json).with_context(|| format!("invalid world config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if !(args.frame_ms.is_finite() && args.frame_ms > 0.0) {
        bail!("--frame-ms must be positive, got {}", args.frame_ms);
    }

    let config = args.config.as_ref().map(load_config).transpose()?;
    let gains = parse_gains(args.gains.as_deref());
    let mut scene = LessonScene::new(args.scenario, gains, config)
        .with_context(|| format!("failed to build the {:?} lesson", args.scenario))?;

    let mut accum = TimeAccumulator::new(Duration::from_secs_f32(scene.step_secs()));
    let frame = Duration::from_secs_f64(args.frame_ms * 1e-3);
    tracing::info!(
        "running {:?} for {} steps of {}s",
        args.scenario,
        args.steps,
        accum.step_secs()
    );

    let mut step = 0;
    let mut contacts = 0;
    let mut recovered = 0;
    while step < args.steps {
        accum.update(frame);
        for _ in 0..accum.num_steps() {
            if step == args.steps {
                break;
            }
            let stats = scene.update()?;
            step += 1;
            contacts += stats.contacts;
            recovered += stats.recovered_bodies;
            if args.print_every != 0 && step % args.print_every == 0 {
                scene.world().print_bodies();
            }
        }
    }

    if args.print_every == 0 || step % args.print_every != 0 {
        scene.world().print_bodies();
    }
    tracing::info!(
        "finished {} steps over {} frames: {} contacts, {} recovered bodies",
        step,
        accum.frame_number(),
        contacts,
        recovered
    );
    Ok(())
}
