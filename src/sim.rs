// src/sim.rs
//
// Deterministic synthetic traffic model implementing TrafficEnv.
//
// A stand-in for the external microscopic engine so the binary and the
// integration tests can run without one: a row of intersections, each with
// four approach lanes and two phases (north-south green / east-west green).
// Seeded arrivals feed per-lane queues; a lane's queue discharges while its
// phase shows green. Per-step randomness is derived from (seed, tick), so a
// restored snapshot replays identically.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::env::{TrafficEnv, STALL_SPEED};
use crate::error::{Error, Result};
use crate::types::{LaneId, Phase, TlId, VehicleId};

/// Shape and dynamics of the synthetic network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticEnvConfig {
    /// Number of signalized intersections.
    pub intersections: usize,
    /// Per-lane arrival probability per step.
    pub arrival_rate: f64,
    /// Vehicles a green lane can discharge per step.
    pub saturation_flow: u32,
    /// Free-flow speed (m/s); also reported for empty lanes.
    pub free_flow_speed: f64,
    /// Seed for the arrival process.
    pub seed: u64,
    /// Add one intersection that controls no lanes (skip-path exercise).
    pub orphan_intersection: bool,
}

impl Default for SyntheticEnvConfig {
    fn default() -> Self {
        Self {
            intersections: 2,
            arrival_rate: 0.3,
            saturation_flow: 2,
            free_flow_speed: 13.9,
            seed: 0,
            orphan_intersection: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Vehicle {
    lane: LaneId,
    speed: f64,
    waiting_time: f64,
    stops: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Intersection {
    id: TlId,
    lanes: Vec<LaneId>,
    phases: Vec<Phase>,
    current_phase: usize,
}

impl Intersection {
    fn lane_is_green(&self, lane_index: usize) -> bool {
        self.phases[self.current_phase]
            .state
            .chars()
            .nth(lane_index)
            == Some('G')
    }
}

/// In-crate TrafficEnv implementation. Fully serializable; snapshots capture
/// the whole model state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticEnv {
    config: SyntheticEnvConfig,
    tick: u64,
    next_vehicle: u64,
    intersections: Vec<Intersection>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    /// Per-lane vehicle ids in arrival (queue) order.
    queues: BTreeMap<LaneId, Vec<VehicleId>>,
    /// Vehicles that cleared each lane during the last step.
    throughput: BTreeMap<LaneId, u32>,
    closed: bool,
}

const APPROACHES: [&str; 4] = ["n", "s", "e", "w"];

impl SyntheticEnv {
    pub fn new(config: SyntheticEnvConfig) -> Self {
        let mut intersections = Vec::with_capacity(config.intersections + 1);
        let mut queues = BTreeMap::new();

        for i in 0..config.intersections {
            let id = format!("tl{i}");
            let lanes: Vec<LaneId> = APPROACHES
                .iter()
                .map(|a| format!("{id}_{a}"))
                .collect();
            for lane in &lanes {
                queues.insert(lane.clone(), Vec::new());
            }
            intersections.push(Intersection {
                id,
                lanes,
                phases: vec![
                    Phase {
                        duration: 30,
                        state: "GGrr".to_string(),
                    },
                    Phase {
                        duration: 30,
                        state: "rrGG".to_string(),
                    },
                ],
                current_phase: 0,
            });
        }

        if config.orphan_intersection {
            intersections.push(Intersection {
                id: "tl_orphan".to_string(),
                lanes: Vec::new(),
                phases: vec![Phase {
                    duration: 30,
                    state: String::new(),
                }],
                current_phase: 0,
            });
        }

        Self {
            config,
            tick: 0,
            next_vehicle: 0,
            intersections,
            vehicles: BTreeMap::new(),
            queues,
            throughput: BTreeMap::new(),
            closed: false,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Env("session closed".to_string()));
        }
        Ok(())
    }

    fn intersection(&self, tl: &str) -> Option<&Intersection> {
        self.intersections.iter().find(|i| i.id == tl)
    }

    fn spawn_arrivals(&mut self) {
        // Per-step stream derived from (seed, tick): snapshot restore
        // replays the same arrivals.
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ self.tick.wrapping_mul(0x9e37_79b9));
        let lanes: Vec<LaneId> = self.queues.keys().cloned().collect();
        for lane in lanes {
            if rng.gen::<f64>() < self.config.arrival_rate {
                let id = format!("veh{}", self.next_vehicle);
                self.next_vehicle += 1;
                self.vehicles.insert(
                    id.clone(),
                    Vehicle {
                        lane: lane.clone(),
                        speed: self.config.free_flow_speed,
                        waiting_time: 0.0,
                        stops: 0,
                    },
                );
                self.queues.get_mut(&lane).expect("lane exists").push(id);
            }
        }
    }
}

impl TrafficEnv for SyntheticEnv {
    fn advance_step(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.throughput.clear();

        for i in 0..self.intersections.len() {
            let (lanes, greens): (Vec<LaneId>, Vec<bool>) = {
                let tl = &self.intersections[i];
                let greens = (0..tl.lanes.len()).map(|l| tl.lane_is_green(l)).collect();
                (tl.lanes.clone(), greens)
            };

            for (lane, green) in lanes.iter().zip(greens) {
                if green {
                    // Discharge from the head of the queue.
                    let queue = self.queues.get_mut(lane).expect("lane exists");
                    let cleared = queue.len().min(self.config.saturation_flow as usize);
                    for id in queue.drain(..cleared) {
                        self.vehicles.remove(&id);
                    }
                    self.throughput.insert(lane.clone(), cleared as u32);

                    // Remaining vehicles roll forward.
                    for id in self.queues[lane].clone() {
                        let v = self.vehicles.get_mut(&id).expect("vehicle exists");
                        v.speed = self.config.free_flow_speed * 0.5;
                        v.waiting_time = 0.0;
                    }
                } else {
                    self.throughput.insert(lane.clone(), 0);
                    for id in self.queues[lane].clone() {
                        let v = self.vehicles.get_mut(&id).expect("vehicle exists");
                        if v.speed >= STALL_SPEED {
                            v.stops += 1;
                        }
                        v.speed = 0.0;
                        v.waiting_time += 1.0;
                    }
                }
            }
        }

        self.spawn_arrivals();
        self.tick += 1;
        Ok(())
    }

    fn traffic_lights(&self) -> Vec<TlId> {
        self.intersections.iter().map(|i| i.id.clone()).collect()
    }

    fn phases(&self, tl: &str) -> Vec<Phase> {
        self.intersection(tl)
            .map(|i| i.phases.clone())
            .unwrap_or_default()
    }

    fn controlled_lanes(&self, tl: &str) -> Vec<LaneId> {
        self.intersection(tl)
            .map(|i| i.lanes.clone())
            .unwrap_or_default()
    }

    fn vehicles(&self) -> Vec<VehicleId> {
        self.vehicles.keys().cloned().collect()
    }

    fn lane_vehicles(&self, lane: &str) -> Vec<VehicleId> {
        self.queues.get(lane).cloned().unwrap_or_default()
    }

    fn vehicle_speed(&self, vehicle: &str) -> f64 {
        self.vehicles.get(vehicle).map(|v| v.speed).unwrap_or(0.0)
    }

    fn vehicle_waiting_time(&self, vehicle: &str) -> f64 {
        self.vehicles
            .get(vehicle)
            .map(|v| v.waiting_time)
            .unwrap_or(0.0)
    }

    fn vehicle_stop_count(&self, vehicle: &str) -> u32 {
        self.vehicles.get(vehicle).map(|v| v.stops).unwrap_or(0)
    }

    fn lane_halting_count(&self, lane: &str) -> u32 {
        self.lane_vehicles(lane)
            .iter()
            .filter(|id| self.vehicle_speed(id) < STALL_SPEED)
            .count() as u32
    }

    fn lane_mean_speed(&self, lane: &str) -> f64 {
        let vehicles = self.lane_vehicles(lane);
        if vehicles.is_empty() {
            return self.config.free_flow_speed;
        }
        vehicles.iter().map(|id| self.vehicle_speed(id)).sum::<f64>() / vehicles.len() as f64
    }

    fn lane_vehicle_throughput(&self, lane: &str) -> u32 {
        self.throughput.get(lane).copied().unwrap_or(0)
    }

    fn set_phase(&mut self, tl: &str, phase_index: usize) -> Result<()> {
        self.ensure_open()?;
        let tl_entry = self
            .intersections
            .iter_mut()
            .find(|i| i.id == tl)
            .ok_or_else(|| Error::Env(format!("unknown traffic light {tl:?}")))?;
        if phase_index >= tl_entry.phases.len() {
            return Err(Error::Env(format!(
                "phase index {phase_index} out of range for {tl:?}"
            )));
        }
        tl_entry.current_phase = phase_index;
        Ok(())
    }

    fn save_snapshot(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    fn restore_snapshot(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        let restored: SyntheticEnv = serde_json::from_reader(BufReader::new(file))?;
        *self = restored;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy_config() -> SyntheticEnvConfig {
        SyntheticEnvConfig {
            intersections: 2,
            arrival_rate: 0.8,
            seed: 42,
            ..SyntheticEnvConfig::default()
        }
    }

    #[test]
    fn advance_is_deterministic_for_a_seed() {
        let mut a = SyntheticEnv::new(busy_config());
        let mut b = SyntheticEnv::new(busy_config());
        for _ in 0..20 {
            a.advance_step().unwrap();
            b.advance_step().unwrap();
        }
        assert_eq!(a.vehicles(), b.vehicles());
        for lane in a.queues.keys() {
            assert_eq!(a.lane_halting_count(lane), b.lane_halting_count(lane));
        }
    }

    #[test]
    fn red_lanes_accumulate_waiting_green_lanes_discharge() {
        let mut env = SyntheticEnv::new(busy_config());
        for _ in 0..10 {
            env.advance_step().unwrap();
        }
        // Phase 0: n/s green, e/w red. Red-lane queues build up and halt
        // (the newest arrival may still be rolling in at free flow).
        let halted = env.lane_halting_count("tl0_e") + env.lane_halting_count("tl0_w");
        let red_queue = env.lane_vehicles("tl0_e").len() + env.lane_vehicles("tl0_w").len();
        assert!(red_queue > 0);
        assert!(halted > 0);
        assert!((halted as usize) <= red_queue);

        // Switch to phase 1 and step: east/west discharges.
        env.set_phase("tl0", 1).unwrap();
        env.advance_step().unwrap();
        let cleared = env.lane_vehicle_throughput("tl0_e") + env.lane_vehicle_throughput("tl0_w");
        assert!(cleared > 0);
    }

    #[test]
    fn snapshot_roundtrip_restores_state_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");

        let mut env = SyntheticEnv::new(busy_config());
        for _ in 0..5 {
            env.advance_step().unwrap();
        }
        env.save_snapshot(&path).unwrap();

        // Diverge, then restore and replay: identical trajectories.
        let mut diverged = env.clone();
        for _ in 0..5 {
            diverged.advance_step().unwrap();
        }
        let mut restored = SyntheticEnv::new(busy_config());
        restored.restore_snapshot(&path).unwrap();
        assert_eq!(restored.tick(), env.tick());
        assert_eq!(restored.vehicles(), env.vehicles());

        for _ in 0..5 {
            restored.advance_step().unwrap();
        }
        assert_eq!(restored.vehicles(), diverged.vehicles());
    }

    #[test]
    fn set_phase_rejects_unknown_intersection_and_bad_index() {
        let mut env = SyntheticEnv::new(busy_config());
        assert!(env.set_phase("nope", 0).is_err());
        assert!(env.set_phase("tl0", 99).is_err());
        assert!(env.set_phase("tl0", 1).is_ok());
    }

    #[test]
    fn closed_session_rejects_mutation() {
        let mut env = SyntheticEnv::new(busy_config());
        env.close();
        assert!(env.advance_step().is_err());
        assert!(env.set_phase("tl0", 0).is_err());
    }

    #[test]
    fn orphan_intersection_reports_no_lanes() {
        let mut cfg = busy_config();
        cfg.orphan_intersection = true;
        let env = SyntheticEnv::new(cfg);
        assert!(env.traffic_lights().contains(&"tl_orphan".to_string()));
        assert!(env.controlled_lanes("tl_orphan").is_empty());
    }

    #[test]
    fn empty_lane_reports_free_flow_speed() {
        let env = SyntheticEnv::new(SyntheticEnvConfig {
            arrival_rate: 0.0,
            ..SyntheticEnvConfig::default()
        });
        assert_eq!(env.lane_mean_speed("tl0_n"), 13.9);
    }
}
