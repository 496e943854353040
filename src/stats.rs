// src/stats.rs
//
// Folds per-step vehicle telemetry into scalar run statistics.

use serde::{Deserialize, Serialize};

use crate::env::{TrafficEnv, STALL_SPEED};

/// Scalar aggregates over all vehicles active at one step.
///
/// Aggregates over zero active vehicles default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepAggregate {
    /// Mean waiting time across active vehicles (s).
    pub mean_waiting_time: f64,
    /// Number of halted vehicles (speed below the stall threshold).
    pub queue_length: u32,
    /// Mean speed across active vehicles (m/s).
    pub mean_speed: f64,
    /// Number of active vehicles.
    pub vehicle_count: usize,
    /// Total stops made so far by active vehicles.
    pub stop_count: u32,
}

impl StepAggregate {
    /// Fold the environment's per-vehicle telemetry into one aggregate.
    pub fn observe<E: TrafficEnv>(env: &E) -> Self {
        let vehicles = env.vehicles();
        if vehicles.is_empty() {
            return Self {
                mean_waiting_time: 0.0,
                queue_length: 0,
                mean_speed: 0.0,
                vehicle_count: 0,
                stop_count: 0,
            };
        }

        let mut total_wait = 0.0;
        let mut total_speed = 0.0;
        let mut queue_length = 0u32;
        let mut stop_count = 0u32;

        for v in &vehicles {
            total_wait += env.vehicle_waiting_time(v);
            let speed = env.vehicle_speed(v);
            total_speed += speed;
            if speed < STALL_SPEED {
                queue_length += 1;
            }
            stop_count += env.vehicle_stop_count(v);
        }

        let n = vehicles.len() as f64;
        Self {
            mean_waiting_time: total_wait / n,
            queue_length,
            mean_speed: total_speed / n,
            vehicle_count: vehicles.len(),
            stop_count,
        }
    }
}

/// Ordered per-step aggregates across a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub steps: Vec<StepAggregate>,
}

/// Run-level means over the collected per-step aggregates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunSummary {
    pub mean_waiting_time: f64,
    pub mean_queue_length: f64,
    pub mean_speed: f64,
    pub mean_vehicle_count: f64,
}

impl RunStats {
    pub fn push(&mut self, aggregate: StepAggregate) {
        self.steps.push(aggregate);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Mean waiting time over the last `n` recorded steps (for progress lines).
    pub fn recent_mean_waiting_time(&self, n: usize) -> f64 {
        let tail = &self.steps[self.steps.len().saturating_sub(n)..];
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().map(|s| s.mean_waiting_time).sum::<f64>() / tail.len() as f64
    }

    /// Collapse the run into scalar means. Zeros when no steps were recorded.
    pub fn summary(&self) -> RunSummary {
        if self.steps.is_empty() {
            return RunSummary {
                mean_waiting_time: 0.0,
                mean_queue_length: 0.0,
                mean_speed: 0.0,
                mean_vehicle_count: 0.0,
            };
        }
        let n = self.steps.len() as f64;
        RunSummary {
            mean_waiting_time: self.steps.iter().map(|s| s.mean_waiting_time).sum::<f64>() / n,
            mean_queue_length: self.steps.iter().map(|s| s.queue_length as f64).sum::<f64>() / n,
            mean_speed: self.steps.iter().map(|s| s.mean_speed).sum::<f64>() / n,
            mean_vehicle_count: self.steps.iter().map(|s| s.vehicle_count as f64).sum::<f64>() / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::types::{LaneId, Phase, TlId, VehicleId};
    use std::path::Path;

    struct TinyEnv {
        vehicles: Vec<(VehicleId, f64, f64, u32)>, // id, speed, wait, stops
    }

    impl TrafficEnv for TinyEnv {
        fn advance_step(&mut self) -> Result<()> {
            Ok(())
        }
        fn traffic_lights(&self) -> Vec<TlId> {
            Vec::new()
        }
        fn phases(&self, _tl: &str) -> Vec<Phase> {
            Vec::new()
        }
        fn controlled_lanes(&self, _tl: &str) -> Vec<LaneId> {
            Vec::new()
        }
        fn vehicles(&self) -> Vec<VehicleId> {
            self.vehicles.iter().map(|v| v.0.clone()).collect()
        }
        fn lane_vehicles(&self, _lane: &str) -> Vec<VehicleId> {
            Vec::new()
        }
        fn vehicle_speed(&self, vehicle: &str) -> f64 {
            self.vehicles
                .iter()
                .find(|v| v.0 == vehicle)
                .map(|v| v.1)
                .unwrap_or(0.0)
        }
        fn vehicle_waiting_time(&self, vehicle: &str) -> f64 {
            self.vehicles
                .iter()
                .find(|v| v.0 == vehicle)
                .map(|v| v.2)
                .unwrap_or(0.0)
        }
        fn vehicle_stop_count(&self, vehicle: &str) -> u32 {
            self.vehicles
                .iter()
                .find(|v| v.0 == vehicle)
                .map(|v| v.3)
                .unwrap_or(0)
        }
        fn lane_halting_count(&self, _lane: &str) -> u32 {
            0
        }
        fn lane_mean_speed(&self, _lane: &str) -> f64 {
            0.0
        }
        fn lane_vehicle_throughput(&self, _lane: &str) -> u32 {
            0
        }
        fn set_phase(&mut self, _tl: &str, _phase_index: usize) -> Result<()> {
            Ok(())
        }
        fn save_snapshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        fn restore_snapshot(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) {}
    }

    #[test]
    fn empty_telemetry_folds_to_zeros() {
        let env = TinyEnv { vehicles: vec![] };
        let agg = StepAggregate::observe(&env);
        assert_eq!(agg.mean_waiting_time, 0.0);
        assert_eq!(agg.queue_length, 0);
        assert_eq!(agg.mean_speed, 0.0);
        assert_eq!(agg.vehicle_count, 0);
        assert_eq!(agg.stop_count, 0);
    }

    #[test]
    fn aggregates_mean_and_count_correctly() {
        let env = TinyEnv {
            vehicles: vec![
                ("a".to_string(), 0.0, 10.0, 2),
                ("b".to_string(), 8.0, 0.0, 1),
            ],
        };
        let agg = StepAggregate::observe(&env);
        assert!((agg.mean_waiting_time - 5.0).abs() < 1e-12);
        assert_eq!(agg.queue_length, 1);
        assert!((agg.mean_speed - 4.0).abs() < 1e-12);
        assert_eq!(agg.vehicle_count, 2);
        assert_eq!(agg.stop_count, 3);
    }

    #[test]
    fn summary_over_empty_run_is_zeros() {
        let stats = RunStats::default();
        let s = stats.summary();
        assert_eq!(s.mean_waiting_time, 0.0);
        assert_eq!(s.mean_vehicle_count, 0.0);
    }
}
