// src/trainer.rs
//
// Multi-agent training orchestrator.
//
// Owns the environment session, one agent per signalized intersection, the
// run statistics and the telemetry sink. Episodes restart from a single
// snapshot captured before the first episode, so every episode sees the
// same initial traffic. Fully synchronous: one control thread drives all
// agents and the simulation clock.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::agent::SignalAgent;
use crate::config::Config;
use crate::env::TrafficEnv;
use crate::error::Result;
use crate::logging::{EventSink, StepRecord};
use crate::stats::{RunStats, RunSummary, StepAggregate};
use crate::types::StateKey;

/// Outcome of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub episodes: u32,
    pub steps_per_episode: u32,
    /// Summed agent reward per episode, in episode order.
    pub episode_rewards: Vec<f64>,
    pub total_reward: f64,
    /// Run-level means of the per-step vehicle aggregates.
    pub run_summary: RunSummary,
}

/// Episode/step loop driver for Q-learning training.
pub struct Trainer<'a, E, S>
where
    E: TrafficEnv,
    S: EventSink,
{
    cfg: &'a Config,
    env: E,
    sink: S,
    agents: Vec<SignalAgent>,
    stats: RunStats,
    episode_rewards: Vec<f64>,
}

impl<'a, E, S> Trainer<'a, E, S>
where
    E: TrafficEnv,
    S: EventSink,
{
    /// Enumerate intersections and construct one agent per intersection.
    ///
    /// Intersections without controlled lanes are skipped with a warning;
    /// training proceeds with the remaining agents. Each agent gets its own
    /// RNG stream derived from the master seed, in enumeration order.
    pub fn new(cfg: &'a Config, env: E, sink: S) -> Self {
        let mut master = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut agents = Vec::new();

        for tl_id in env.traffic_lights() {
            let phases = env.phases(&tl_id);
            let lanes = env.controlled_lanes(&tl_id);

            if lanes.is_empty() {
                eprintln!("[trainer] WARN: skipping {tl_id} (no controlled lanes)");
                continue;
            }

            let agent_seed: u64 = master.gen();
            agents.push(SignalAgent::new(
                tl_id,
                phases,
                lanes,
                cfg.learning,
                &env,
                agent_seed,
            ));
        }

        Self {
            cfg,
            env,
            sink,
            agents,
            stats: RunStats::default(),
            episode_rewards: Vec::new(),
        }
    }

    /// Active agents (intersections with controlled lanes).
    pub fn agents(&self) -> &[SignalAgent] {
        &self.agents
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Run the full episode × step budget.
    ///
    /// Per step: fold env-wide vehicle telemetry, then for each agent in
    /// fixed order select an action from its cached prior state, actuate
    /// the phase, re-observe state and reward (both before the clock
    /// advances, so the stored transition reflects post-actuation,
    /// pre-advance conditions), update the agent, and cache the fresh
    /// state. Only then advance the simulation clock one tick.
    pub fn run(&mut self) -> Result<TrainingSummary> {
        self.env.save_snapshot(&self.cfg.snapshot_path)?;

        for episode in 0..self.cfg.episodes {
            self.env.restore_snapshot(&self.cfg.snapshot_path)?;

            let mut prior: Vec<StateKey> = self
                .agents
                .iter()
                .map(|a| a.observe_state(&self.env))
                .collect();
            let mut episode_reward = 0.0;

            for step in 0..self.cfg.steps_per_episode {
                let aggregate = StepAggregate::observe(&self.env);

                let mut step_reward = 0.0;
                for (agent, prior_state) in self.agents.iter_mut().zip(prior.iter_mut()) {
                    let action = agent.choose_action(prior_state);
                    self.env.set_phase(agent.id(), action)?;

                    let next_state = agent.observe_state(&self.env);
                    let reward = agent.compute_reward(&self.env);
                    agent.update(prior_state.clone(), action, reward, next_state.clone());

                    *prior_state = next_state;
                    step_reward += reward;
                }
                episode_reward += step_reward;

                self.stats.push(aggregate);
                self.sink.log_step(&StepRecord {
                    episode,
                    step,
                    aggregate,
                    reward: step_reward,
                });

                self.env.advance_step()?;
            }

            self.episode_rewards.push(episode_reward);
            self.sink.log_episode_end(episode, episode_reward);
            self.print_progress(episode);
        }

        self.env.close();

        let total_reward = self.episode_rewards.iter().sum();
        Ok(TrainingSummary {
            episodes: self.cfg.episodes,
            steps_per_episode: self.cfg.steps_per_episode,
            episode_rewards: self.episode_rewards.clone(),
            total_reward,
            run_summary: self.stats.summary(),
        })
    }

    fn print_progress(&self, episode: u32) {
        let every = self.cfg.progress_every;
        if every == 0 || (episode + 1) % every != 0 {
            return;
        }
        let window = every as usize;
        let tail = &self.episode_rewards[self.episode_rewards.len().saturating_sub(window)..];
        let mean_reward = tail.iter().sum::<f64>() / tail.len() as f64;
        println!(
            "episode {}/{} | mean_reward={:.2} | mean_wait={:.2}s",
            episode + 1,
            self.cfg.episodes,
            mean_reward,
            self.stats
                .recent_mean_waiting_time(self.cfg.steps_per_episode as usize)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopSink;
    use crate::sim::{SyntheticEnv, SyntheticEnvConfig};

    fn sim_config() -> SyntheticEnvConfig {
        SyntheticEnvConfig {
            intersections: 2,
            arrival_rate: 0.5,
            seed: 9,
            ..SyntheticEnvConfig::default()
        }
    }

    fn run_config(dir: &std::path::Path) -> Config {
        Config {
            episodes: 2,
            steps_per_episode: 8,
            seed: 1,
            snapshot_path: dir.join("snap.json"),
            progress_every: 0,
            ..Config::default()
        }
    }

    #[test]
    fn constructs_one_agent_per_intersection() {
        let env = SyntheticEnv::new(sim_config());
        let dir = tempfile::tempdir().unwrap();
        let cfg = run_config(dir.path());
        let trainer = Trainer::new(&cfg, env, NoopSink);
        assert_eq!(trainer.agents().len(), 2);
    }

    #[test]
    fn zero_lane_intersection_is_excluded() {
        let mut sim_cfg = sim_config();
        sim_cfg.orphan_intersection = true;
        let env = SyntheticEnv::new(sim_cfg);
        let dir = tempfile::tempdir().unwrap();
        let cfg = run_config(dir.path());

        let trainer = Trainer::new(&cfg, env, NoopSink);
        assert_eq!(trainer.agents().len(), 2);
        assert!(trainer.agents().iter().all(|a| a.id() != "tl_orphan"));
    }

    #[test]
    fn run_collects_stats_for_every_step() {
        let env = SyntheticEnv::new(sim_config());
        let dir = tempfile::tempdir().unwrap();
        let cfg = run_config(dir.path());

        let mut trainer = Trainer::new(&cfg, env, NoopSink);
        let summary = trainer.run().unwrap();

        assert_eq!(summary.episode_rewards.len(), 2);
        assert_eq!(trainer.stats().len(), 2 * 8);
        assert!((summary.total_reward - summary.episode_rewards.iter().sum::<f64>()).abs() < 1e-9);
    }

    #[test]
    fn agents_accumulate_experience_during_training() {
        let env = SyntheticEnv::new(sim_config());
        let dir = tempfile::tempdir().unwrap();
        let cfg = run_config(dir.path());

        let mut trainer = Trainer::new(&cfg, env, NoopSink);
        trainer.run().unwrap();

        for agent in trainer.agents() {
            // One transition per step per episode.
            assert_eq!(agent.replay_len(), 2 * 8);
            assert_eq!(agent.steps_since_change(), 2 * 8);
        }
    }
}
