// src/env.rs
//
// Adapter boundary to the microscopic traffic simulation engine.
//
// The engine itself (step advancement, sensor queries, phase actuation,
// snapshot save/restore) is an external collaborator. Everything the agent
// and trainer need from it goes through the `TrafficEnv` trait so the
// engine can be swapped for the in-crate synthetic model (`sim::SyntheticEnv`)
// in tests and research runs.
//
// Sensor queries are read-only and infallible; a real binding surfaces
// transport failures on the mutating lifecycle calls, which return Result
// and abort the run when they fail.

use std::path::Path;

use crate::error::Result;
use crate::types::{LaneId, Phase, TlId, VehicleId};

/// Speed threshold (m/s) below which a vehicle counts as stalled/halting.
pub const STALL_SPEED: f64 = 0.1;

/// Abstract interface to a running simulation session.
pub trait TrafficEnv {
    /// Advance the simulation clock by exactly one tick.
    fn advance_step(&mut self) -> Result<()>;

    /// All signalized intersections, in the engine's enumeration order.
    fn traffic_lights(&self) -> Vec<TlId>;

    /// Ordered phase list for an intersection.
    fn phases(&self, tl: &str) -> Vec<Phase>;

    /// Lanes controlled by an intersection, in fixed order. May be empty.
    fn controlled_lanes(&self, tl: &str) -> Vec<LaneId>;

    /// All vehicles currently active in the simulation.
    fn vehicles(&self) -> Vec<VehicleId>;

    /// Vehicles currently occupying a lane.
    fn lane_vehicles(&self, lane: &str) -> Vec<VehicleId>;

    /// Current speed of a vehicle (m/s).
    fn vehicle_speed(&self, vehicle: &str) -> f64;

    /// Accumulated waiting time of a vehicle (s).
    fn vehicle_waiting_time(&self, vehicle: &str) -> f64;

    /// Number of stops the vehicle has made so far.
    fn vehicle_stop_count(&self, vehicle: &str) -> u32;

    /// Number of halting vehicles on a lane (queue length).
    fn lane_halting_count(&self, lane: &str) -> u32;

    /// Mean speed on a lane (m/s); free-flow speed when the lane is empty.
    fn lane_mean_speed(&self, lane: &str) -> f64;

    /// Vehicles that passed/cleared the lane during the last step.
    fn lane_vehicle_throughput(&self, lane: &str) -> u32;

    /// Actuate a phase on an intersection.
    fn set_phase(&mut self, tl: &str, phase_index: usize) -> Result<()>;

    /// Persist the full simulation state to `path`. Opaque to the trainer.
    fn save_snapshot(&self, path: &Path) -> Result<()>;

    /// Restore the simulation state previously saved to `path`.
    fn restore_snapshot(&mut self, path: &Path) -> Result<()>;

    /// Tear down the session. Idempotent.
    fn close(&mut self);
}
