// src/main.rs
//
// Research-harness CLI entrypoint for greenwave.
//
// Runs the synthetic traffic model through either the fixed-timing
// baseline or the multi-agent Q-learning trainer. Deterministic given
// --seed; hyperparameters default to the tuned values and can be
// overridden per flag or via GREENWAVE_* environment variables.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};

use greenwave::config::Config;
use greenwave::harness::{run, RunOutcome};
use greenwave::logging::{EventSink, JsonlSink, NoopSink};
use greenwave::sim::{SyntheticEnv, SyntheticEnvConfig};

#[derive(Debug, Parser)]
#[command(
    name = "greenwave",
    about = "Tabular Q-learning traffic-signal trainer (research harness)",
    version
)]
struct Args {
    /// Run mode: baseline | qlearning.
    #[arg(long, default_value = "qlearning")]
    mode: String,

    /// Number of training episodes (qlearning mode).
    #[arg(long, default_value_t = 10)]
    episodes: u32,

    /// Steps per episode (and total steps in baseline mode).
    #[arg(long, default_value_t = 100)]
    steps: u32,

    /// Learning rate α.
    #[arg(long)]
    alpha: Option<f64>,

    /// Discount factor γ.
    #[arg(long)]
    gamma: Option<f64>,

    /// Initial exploration rate ε.
    #[arg(long)]
    epsilon: Option<f64>,

    /// ε floor.
    #[arg(long)]
    min_epsilon: Option<f64>,

    /// Multiplicative ε decay per action selection.
    #[arg(long)]
    epsilon_decay: Option<f64>,

    /// Master seed (agents and arrivals derive from it).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of synthetic intersections.
    #[arg(long, default_value_t = 2)]
    intersections: usize,

    /// Per-lane arrival probability per step.
    #[arg(long, default_value_t = 0.3)]
    arrival_rate: f64,

    /// Snapshot file used for episode resets.
    #[arg(long, default_value = "initial_state.json")]
    snapshot: PathBuf,

    /// Write per-step telemetry as JSONL to this path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut cfg = Config::from_env();
    cfg.episodes = args.episodes;
    cfg.steps_per_episode = args.steps;
    cfg.seed = args.seed;
    cfg.snapshot_path = args.snapshot.clone();
    if args.verbose == 0 {
        cfg.progress_every = 5;
    } else {
        cfg.progress_every = 1;
    }
    if let Some(v) = args.alpha {
        cfg.learning.alpha = v;
    }
    if let Some(v) = args.gamma {
        cfg.learning.gamma = v;
    }
    if let Some(v) = args.epsilon {
        cfg.learning.epsilon = v;
    }
    if let Some(v) = args.min_epsilon {
        cfg.learning.min_epsilon = v;
    }
    if let Some(v) = args.epsilon_decay {
        cfg.learning.epsilon_decay = v;
    }

    println!(
        "greenwave | cfg={} | mode={} | episodes={} | steps={} | seed={}",
        cfg.version, args.mode, cfg.episodes, cfg.steps_per_episode, cfg.seed
    );

    let sink: Box<dyn EventSink> = match &args.out {
        Some(path) => Box::new(
            JsonlSink::create(path)
                .with_context(|| format!("creating telemetry sink at {}", path.display()))?,
        ),
        None => Box::new(NoopSink),
    };

    let sim_cfg = SyntheticEnvConfig {
        intersections: args.intersections,
        arrival_rate: args.arrival_rate,
        seed: args.seed,
        ..SyntheticEnvConfig::default()
    };

    let outcome = run(&args.mode, || Ok(SyntheticEnv::new(sim_cfg)), &cfg, sink)
        .context("run failed")?;

    match outcome {
        RunOutcome::Baseline(stats) => {
            let s = stats.summary();
            println!();
            println!("=== Baseline Summary ===");
            println!("Steps: {}", stats.len());
            println!("Mean waiting time: {:.2}s", s.mean_waiting_time);
            println!("Mean queue length: {:.2}", s.mean_queue_length);
            println!("Mean speed: {:.2} m/s", s.mean_speed);
            println!("Mean vehicles: {:.2}", s.mean_vehicle_count);
        }
        RunOutcome::Training(summary) => {
            println!();
            println!("=== Training Summary ===");
            println!("Episodes: {}", summary.episodes);
            println!("Total reward: {:.2}", summary.total_reward);
            if let Some(last) = summary.episode_rewards.last() {
                println!("Final episode reward: {:.2}", last);
            }
            println!(
                "Mean waiting time: {:.2}s",
                summary.run_summary.mean_waiting_time
            );
            println!("Mean speed: {:.2} m/s", summary.run_summary.mean_speed);
        }
    }

    Ok(())
}
