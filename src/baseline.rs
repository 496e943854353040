// src/baseline.rs
//
// Fixed-timing baseline run: no agents, no learning. Drives the simulation
// for the configured step budget with whatever signal program the engine
// runs by default, folding per-step vehicle telemetry into run statistics
// for comparison against trained runs.

use crate::config::Config;
use crate::env::TrafficEnv;
use crate::error::Result;
use crate::logging::{EventSink, StepRecord};
use crate::stats::{RunStats, StepAggregate};

/// Steps between progress lines.
const PROGRESS_STRIDE: u32 = 100;

pub fn run_baseline<E, S>(cfg: &Config, mut env: E, mut sink: S) -> Result<RunStats>
where
    E: TrafficEnv,
    S: EventSink,
{
    let mut stats = RunStats::default();

    for step in 0..cfg.steps_per_episode {
        let aggregate = StepAggregate::observe(&env);
        stats.push(aggregate);
        sink.log_step(&StepRecord {
            episode: 0,
            step,
            aggregate,
            reward: 0.0,
        });

        env.advance_step()?;

        if (step + 1) % PROGRESS_STRIDE == 0 {
            println!(
                "step {}/{} | vehicles={} | mean_wait={:.2}s",
                step + 1,
                cfg.steps_per_episode,
                aggregate.vehicle_count,
                aggregate.mean_waiting_time
            );
        }
    }

    env.close();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopSink;
    use crate::sim::{SyntheticEnv, SyntheticEnvConfig};

    #[test]
    fn baseline_records_one_aggregate_per_step() {
        let env = SyntheticEnv::new(SyntheticEnvConfig {
            arrival_rate: 0.5,
            seed: 4,
            ..SyntheticEnvConfig::default()
        });
        let cfg = Config {
            steps_per_episode: 25,
            ..Config::default()
        };

        let stats = run_baseline(&cfg, env, NoopSink).unwrap();
        assert_eq!(stats.len(), 25);
    }

    #[test]
    fn baseline_first_step_sees_empty_network() {
        let env = SyntheticEnv::new(SyntheticEnvConfig::default());
        let cfg = Config {
            steps_per_episode: 1,
            ..Config::default()
        };

        let stats = run_baseline(&cfg, env, NoopSink).unwrap();
        assert_eq!(stats.steps[0].vehicle_count, 0);
        assert_eq!(stats.steps[0].mean_waiting_time, 0.0);
    }
}
