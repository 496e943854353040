// src/agent.rs
//
// Per-intersection tabular Q-learning agent.
//
// Each agent owns its exploration schedule, sparse Q-table, replay buffer
// and RNG stream. Action selection is a two-stage stochastic policy:
// an ε-gate for uniform exploration, then Boltzmann (softmax) sampling
// over Q-values on the exploit branch. Value updates are replay-batch
// Q-learning, applied against the pre-batch table so every sampled
// transition is updated independently.

use std::collections::HashMap;
use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::QLearningParams;
use crate::env::{TrafficEnv, STALL_SPEED};
use crate::types::{ActionIndex, LaneId, Phase, StateKey, TlId, Transition};

/// Replay buffer capacity (oldest transition evicted on overflow).
pub const REPLAY_CAPACITY: usize = 2000;
/// Minimum buffer length before batch updates fire; also the batch size.
pub const BATCH_SIZE: usize = 64;

/// Boltzmann temperature schedule (internal defaults, not configurable).
const INITIAL_TEMPERATURE: f64 = 1.0;
const MIN_TEMPERATURE: f64 = 0.1;
const TEMPERATURE_DECAY: f64 = 0.995;

/// Waiting time (s) beyond which a vehicle draws the long-wait penalty.
const LONG_WAIT_THRESHOLD: f64 = 30.0;
/// Steps below which a fresh phase change draws the churn penalty.
const CHURN_WINDOW: u64 = 10;

/// Sparse (state, action) → value map; absent entries are implicitly 0.
#[derive(Debug, Clone, Default)]
pub struct QTable {
    values: HashMap<(StateKey, ActionIndex), f64>,
}

impl QTable {
    /// Look up Q(state, action), defaulting to 0 on a miss.
    pub fn value(&self, state: &StateKey, action: ActionIndex) -> f64 {
        self.values
            .get(&(state.clone(), action))
            .copied()
            .unwrap_or(0.0)
    }

    /// max over the first `num_actions` actions of Q(state, ·), misses = 0.
    pub fn max_value(&self, state: &StateKey, num_actions: usize) -> f64 {
        if num_actions == 0 {
            return 0.0;
        }
        (0..num_actions)
            .map(|a| self.value(state, a))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn insert(&mut self, key: (StateKey, ActionIndex), value: f64) {
        self.values.insert(key, value);
    }

    /// Number of populated (state, action) entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bounded FIFO experience buffer with O(1) push-and-evict.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    buf: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest one at capacity.
    pub fn push(&mut self, transition: Transition) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Oldest transition still held, if any.
    pub fn front(&self) -> Option<&Transition> {
        self.buf.front()
    }

    /// Sample `k` transitions uniformly without replacement.
    pub fn sample(&self, k: usize, rng: &mut ChaCha8Rng) -> Vec<Transition> {
        rand::seq::index::sample(rng, self.buf.len(), k)
            .into_iter()
            .map(|i| self.buf[i].clone())
            .collect()
    }
}

/// Tabular Q-learning controller for one signalized intersection.
pub struct SignalAgent {
    id: TlId,
    phases: Vec<Phase>,
    controlled_lanes: Vec<LaneId>,
    params: QLearningParams,
    epsilon: f64,
    temperature: f64,
    q_table: QTable,
    replay: ReplayBuffer,
    /// Incremented unconditionally on every update and never reset, so it
    /// is monotonic over the agent's lifetime rather than per phase.
    steps_since_change: u64,
    rng: ChaCha8Rng,
}

impl SignalAgent {
    /// Construct an agent for intersection `id`.
    ///
    /// `controlled_lanes` is accepted for interface parity but discarded:
    /// the environment's controlled-lane metadata for `id` is authoritative
    /// and overwrites it. An intersection with no controlled lanes still
    /// constructs (with a warning); callers are expected to exclude it
    /// from training.
    pub fn new<E: TrafficEnv>(
        id: TlId,
        phases: Vec<Phase>,
        _controlled_lanes: Vec<LaneId>,
        params: QLearningParams,
        env: &E,
        seed: u64,
    ) -> Self {
        let controlled_lanes = env.controlled_lanes(&id);
        if controlled_lanes.is_empty() {
            eprintln!("[agent] WARN: traffic light {id} has no controlled lanes");
        }

        Self {
            id,
            phases,
            controlled_lanes,
            params,
            epsilon: params.epsilon,
            temperature: INITIAL_TEMPERATURE,
            q_table: QTable::default(),
            replay: ReplayBuffer::new(REPLAY_CAPACITY),
            steps_since_change: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn controlled_lanes(&self) -> &[LaneId] {
        &self.controlled_lanes
    }

    pub fn has_controlled_lanes(&self) -> bool {
        !self.controlled_lanes.is_empty()
    }

    /// Number of actions = number of phases.
    pub fn num_actions(&self) -> usize {
        self.phases.len()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn steps_since_change(&self) -> u64 {
        self.steps_since_change
    }

    /// Current Q(state, action) estimate (0 if never written).
    pub fn q_value(&self, state: &StateKey, action: ActionIndex) -> f64 {
        self.q_table.value(state, action)
    }

    /// Read the discretized state of this intersection from live telemetry.
    ///
    /// Per controlled lane, in lane order: stalled-vehicle count, mean
    /// waiting time (0 when the lane is empty), halting count, mean speed;
    /// the step counter is appended last. Every component is truncated to
    /// an integer. Read-only.
    pub fn observe_state<E: TrafficEnv>(&self, env: &E) -> StateKey {
        let mut components = Vec::with_capacity(self.controlled_lanes.len() * 4 + 1);

        for lane in &self.controlled_lanes {
            let vehicles = env.lane_vehicles(lane);

            let stalled = vehicles
                .iter()
                .filter(|v| env.vehicle_speed(v) < STALL_SPEED)
                .count();
            components.push(stalled as f64);

            let total_wait: f64 = vehicles.iter().map(|v| env.vehicle_waiting_time(v)).sum();
            components.push(total_wait / vehicles.len().max(1) as f64);

            components.push(env.lane_halting_count(lane) as f64);
            components.push(env.lane_mean_speed(lane));
        }

        components.push(self.steps_since_change as f64);

        StateKey(components.into_iter().map(|v| v as i64).collect())
    }

    /// Shaped reward over current telemetry. Pure; identical sensor
    /// snapshots yield identical rewards.
    ///
    /// Per lane: −0.1 per stalled vehicle, an extra −0.01·wait for every
    /// vehicle waiting longer than 30 s, and +0.2 per vehicle that cleared
    /// the lane. A flat −0.5 applies while the step counter is under 10,
    /// discouraging rapid phase churn.
    pub fn compute_reward<E: TrafficEnv>(&self, env: &E) -> f64 {
        let mut reward = 0.0;

        for lane in &self.controlled_lanes {
            let vehicles = env.lane_vehicles(lane);

            let stalled = vehicles
                .iter()
                .filter(|v| env.vehicle_speed(v) < STALL_SPEED)
                .count();
            reward -= stalled as f64 * 0.1;

            for v in &vehicles {
                let wait = env.vehicle_waiting_time(v);
                if wait > LONG_WAIT_THRESHOLD {
                    reward -= wait * 0.01;
                }
            }
        }

        for lane in &self.controlled_lanes {
            reward += env.lane_vehicle_throughput(lane) as f64 * 0.2;
        }

        if self.steps_since_change < CHURN_WINDOW {
            reward -= 0.5;
        }

        reward
    }

    /// Select an action for `state`.
    ///
    /// ε and τ decay multiplicatively once per call (clamped at their
    /// floors). With probability ε the action is uniform random; otherwise
    /// it is sampled from a Boltzmann distribution over the Q-values at
    /// temperature τ. The exploit branch is stochastic, not arg-max.
    pub fn choose_action(&mut self, state: &StateKey) -> ActionIndex {
        self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.min_epsilon);
        self.temperature = (self.temperature * TEMPERATURE_DECAY).max(MIN_TEMPERATURE);

        let n = self.phases.len();
        if self.rng.gen::<f64>() < self.epsilon {
            return self.rng.gen_range(0..n);
        }

        // Boltzmann sampling; shifting by the max Q leaves the distribution
        // unchanged and keeps exp() finite.
        let q: Vec<f64> = (0..n).map(|a| self.q_table.value(state, a)).collect();
        let q_max = q.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = q
            .iter()
            .map(|v| ((v - q_max) / self.temperature).exp())
            .collect();
        let total: f64 = weights.iter().sum();

        let mut draw = self.rng.gen::<f64>() * total;
        for (action, w) in weights.iter().enumerate() {
            draw -= w;
            if draw <= 0.0 {
                return action;
            }
        }
        n - 1
    }

    /// Record a transition and, once the buffer holds at least one batch,
    /// run a replay update: 64 transitions sampled uniformly without
    /// replacement, each updated against the pre-batch table with
    /// `Q(s,a) ← Q(s,a) + α·(r + γ·max_a' Q(s',a') − Q(s,a))`.
    ///
    /// The step counter increments unconditionally.
    pub fn update(
        &mut self,
        state: StateKey,
        action: ActionIndex,
        reward: f64,
        next_state: StateKey,
    ) {
        self.replay.push(Transition {
            state,
            action,
            reward,
            next_state,
        });

        if self.replay.len() >= BATCH_SIZE {
            let batch = self.replay.sample(BATCH_SIZE, &mut self.rng);
            let n = self.phases.len();

            let staged: Vec<((StateKey, ActionIndex), f64)> = batch
                .iter()
                .map(|t| {
                    let old = self.q_table.value(&t.state, t.action);
                    let next_max = self.q_table.max_value(&t.next_state, n);
                    let new = old + self.params.alpha * (t.reward + self.params.gamma * next_max - old);
                    ((t.state.clone(), t.action), new)
                })
                .collect();

            for (key, value) in staged {
                self.q_table.insert(key, value);
            }
        }

        self.steps_since_change += 1;
    }
}
