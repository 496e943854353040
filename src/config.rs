// src/config.rs
//
// Central configuration for the greenwave trainer.
//
// Exposes the run shape (mode, episodes, steps) and the Q-learning
// hyperparameters tuned on the reference network. Boltzmann temperature,
// replay capacity and batch size are internal defaults owned by the agent
// and deliberately not part of this surface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level run-mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Fixed-timing signals, no learning; collects run statistics only.
    Baseline,
    /// Multi-agent tabular Q-learning training.
    Qlearning,
}

impl RunMode {
    /// Return a stable lowercase name for the mode (used in logs/telemetry).
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Baseline => "baseline",
            RunMode::Qlearning => "qlearning",
        }
    }

    /// Parse a mode name (case-insensitive). Returns None if unrecognized.
    pub fn parse(s: &str) -> Option<RunMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" | "standard" | "fixed" => Some(RunMode::Baseline),
            "qlearning" | "q-learning" | "rl" => Some(RunMode::Qlearning),
            _ => None,
        }
    }
}

/// Q-learning hyperparameters for one agent.
///
/// Defaults are the grid-search optima from the reference runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QLearningParams {
    /// Learning rate α.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Initial exploration rate ε.
    pub epsilon: f64,
    /// Floor for ε after decay.
    pub min_epsilon: f64,
    /// Multiplicative ε decay applied once per action selection.
    pub epsilon_decay: f64,
}

impl Default for QLearningParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.2,
            min_epsilon: 0.01,
            epsilon_decay: 0.995,
        }
    }
}

/// Full run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Human-readable config / release version.
    pub version: &'static str,
    /// Number of training episodes.
    pub episodes: u32,
    /// Steps per episode.
    pub steps_per_episode: u32,
    /// Agent hyperparameters.
    pub learning: QLearningParams,
    /// Master seed; per-agent streams are derived from it.
    pub seed: u64,
    /// Where the pre-episode snapshot is written and restored from.
    pub snapshot_path: PathBuf,
    /// Emit a progress line every N episodes (0 disables).
    pub progress_every: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "greenwave-0.3",
            episodes: 10,
            steps_per_episode: 100,
            learning: QLearningParams::default(),
            seed: 0,
            snapshot_path: PathBuf::from("initial_state.json"),
            progress_every: 5,
        }
    }
}

impl Config {
    /// Build a config from defaults plus `GREENWAVE_*` environment overrides.
    ///
    /// Unparseable values warn and fall back to the default rather than
    /// aborting, matching how the rest of the surface treats soft inputs.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();

        env_override_f64("GREENWAVE_ALPHA", &mut cfg.learning.alpha);
        env_override_f64("GREENWAVE_GAMMA", &mut cfg.learning.gamma);
        env_override_f64("GREENWAVE_EPSILON", &mut cfg.learning.epsilon);
        env_override_f64("GREENWAVE_MIN_EPSILON", &mut cfg.learning.min_epsilon);
        env_override_f64("GREENWAVE_EPSILON_DECAY", &mut cfg.learning.epsilon_decay);

        cfg
    }
}

fn env_override_f64(key: &str, slot: &mut f64) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse::<f64>() {
            Ok(v) => {
                *slot = v;
                eprintln!("[config] {key} = {v} (overrode default)");
            }
            Err(_) => {
                eprintln!(
                    "[config] WARN: could not parse {key} = {raw:?} as f64; using default {slot}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parse_accepts_canonical_and_aliases() {
        assert_eq!(RunMode::parse("baseline"), Some(RunMode::Baseline));
        assert_eq!(RunMode::parse("  QLearning "), Some(RunMode::Qlearning));
        assert_eq!(RunMode::parse("q-learning"), Some(RunMode::Qlearning));
        assert_eq!(RunMode::parse("rl"), Some(RunMode::Qlearning));
    }

    #[test]
    fn run_mode_parse_rejects_unknown() {
        assert_eq!(RunMode::parse("foo"), None);
        assert_eq!(RunMode::parse(""), None);
    }

    #[test]
    fn default_hyperparameters_match_tuned_values() {
        let p = QLearningParams::default();
        assert_eq!(p.alpha, 0.1);
        assert_eq!(p.gamma, 0.9);
        assert_eq!(p.epsilon, 0.2);
        assert_eq!(p.min_epsilon, 0.01);
        assert_eq!(p.epsilon_decay, 0.995);
    }
}
