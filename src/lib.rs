//! Greenwave core library.
//!
//! Tabular Q-learning traffic-signal control: one agent per signalized
//! intersection, trained against a microscopic traffic simulation reached
//! through the [`env::TrafficEnv`] adapter trait. The binary
//! (`src/main.rs`) is a thin research harness over these components.
//!
//! # Architecture
//!
//! - **Agent** (`agent`): per-intersection controller: state
//!   discretization, shaped reward, ε-gated Boltzmann action selection,
//!   experience-replay Q-table updates.
//! - **Trainer** (`trainer`): multi-agent episode/step loop with
//!   snapshot-based episode resets and telemetry folding.
//! - **Environment boundary** (`env`): adapter trait for the external
//!   simulation engine; `sim::SyntheticEnv` is the in-crate deterministic
//!   stand-in used by tests and the research harness.
//! - **Harness** (`harness`): run-mode dispatch (baseline vs. qlearning)
//!   with fail-fast mode validation.
//!
//! All randomness flows through explicitly seeded `ChaCha8Rng` streams
//! derived from the master seed, so runs are reproducible.

pub mod agent;
pub mod baseline;
pub mod config;
pub mod env;
pub mod error;
pub mod harness;
pub mod logging;
pub mod sim;
pub mod stats;
pub mod trainer;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use agent::{SignalAgent, BATCH_SIZE, REPLAY_CAPACITY};
pub use config::{Config, QLearningParams, RunMode};
pub use env::TrafficEnv;
pub use error::{Error, Result};
pub use harness::{run, RunOutcome};
pub use logging::{EventSink, JsonlSink, NoopSink, StepRecord};
pub use sim::{SyntheticEnv, SyntheticEnvConfig};
pub use stats::{RunStats, RunSummary, StepAggregate};
pub use trainer::{Trainer, TrainingSummary};
pub use types::{ActionIndex, LaneId, Phase, StateKey, TlId, Transition, VehicleId};
