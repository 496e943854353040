// src/harness.rs
//
// Top-level run dispatch. The run-mode selector is validated before the
// environment session is opened; an unrecognized mode fails fast with no
// resources acquired.

use crate::baseline::run_baseline;
use crate::config::{Config, RunMode};
use crate::env::TrafficEnv;
use crate::error::{Error, Result};
use crate::logging::EventSink;
use crate::stats::RunStats;
use crate::trainer::{Trainer, TrainingSummary};

/// Result of a dispatched run.
#[derive(Debug)]
pub enum RunOutcome {
    Baseline(RunStats),
    Training(TrainingSummary),
}

/// Parse `mode`, open the environment, and run.
///
/// `open_env` is only invoked once the mode string has been validated.
pub fn run<E, F, S>(mode: &str, open_env: F, cfg: &Config, sink: S) -> Result<RunOutcome>
where
    E: TrafficEnv,
    F: FnOnce() -> Result<E>,
    S: EventSink,
{
    let mode = RunMode::parse(mode).ok_or_else(|| Error::InvalidRunMode(mode.to_string()))?;
    let env = open_env()?;

    match mode {
        RunMode::Baseline => Ok(RunOutcome::Baseline(run_baseline(cfg, env, sink)?)),
        RunMode::Qlearning => {
            let mut trainer = Trainer::new(cfg, env, sink);
            Ok(RunOutcome::Training(trainer.run()?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopSink;
    use crate::sim::{SyntheticEnv, SyntheticEnvConfig};
    use std::cell::Cell;

    #[test]
    fn invalid_mode_fails_before_env_is_opened() {
        let opened = Cell::new(false);
        let cfg = Config::default();

        let result = run(
            "foo",
            || {
                opened.set(true);
                Ok(SyntheticEnv::new(SyntheticEnvConfig::default()))
            },
            &cfg,
            NoopSink,
        );

        assert!(matches!(result, Err(Error::InvalidRunMode(ref m)) if m == "foo"));
        assert!(!opened.get(), "environment opened despite invalid mode");
    }

    #[test]
    fn baseline_mode_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            steps_per_episode: 5,
            snapshot_path: dir.path().join("snap.json"),
            ..Config::default()
        };

        let outcome = run(
            "baseline",
            || Ok(SyntheticEnv::new(SyntheticEnvConfig::default())),
            &cfg,
            NoopSink,
        )
        .unwrap();

        match outcome {
            RunOutcome::Baseline(stats) => assert_eq!(stats.len(), 5),
            RunOutcome::Training(_) => panic!("expected baseline outcome"),
        }
    }

    #[test]
    fn qlearning_mode_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            episodes: 1,
            steps_per_episode: 4,
            snapshot_path: dir.path().join("snap.json"),
            progress_every: 0,
            ..Config::default()
        };

        let outcome = run(
            "qlearning",
            || Ok(SyntheticEnv::new(SyntheticEnvConfig::default())),
            &cfg,
            NoopSink,
        )
        .unwrap();

        match outcome {
            RunOutcome::Training(summary) => {
                assert_eq!(summary.episode_rewards.len(), 1);
            }
            RunOutcome::Baseline(_) => panic!("expected training outcome"),
        }
    }
}
