// src/types.rs
//
// Common shared types for the greenwave trainer.

use serde::{Deserialize, Serialize};

/// Identifier of a signalized intersection (traffic light).
pub type TlId = String;

/// Identifier of a lane controlled by an intersection.
pub type LaneId = String;

/// Identifier of a vehicle currently in the simulation.
pub type VehicleId = String;

/// Index into an agent's ordered phase list. Actions are phase selections.
pub type ActionIndex = usize;

/// One discrete signal configuration an intersection can be set to.
///
/// `state` encodes the per-lane right-of-way assignment the way the
/// simulation engine reports it (e.g. `"GGrr"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Nominal phase duration in simulation seconds.
    pub duration: u32,
    /// Per-lane right-of-way string as reported by the engine.
    pub state: String,
}

/// Discretized observation of one intersection.
///
/// Fixed-length integer tuple: for each controlled lane, in lane order,
/// (stalled count, mean waiting time, halting count, mean speed), followed
/// by the agent's step counter. All components are floor-truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey(pub Vec<i64>);

/// One unit of experience: the tuple stored in the replay buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: StateKey,
    pub action: ActionIndex,
    pub reward: f64,
    pub next_state: StateKey,
}
