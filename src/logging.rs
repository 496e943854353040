// src/logging.rs
//
// Telemetry sinks for greenwave.
// - EventSink: trait used by the trainer and the baseline run
// - NoopSink:  discards all events
// - JsonlSink: writes one JSON line per step for offline analysis

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::stats::StepAggregate;

/// One step's telemetry record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepRecord {
    pub episode: u32,
    pub step: u32,
    #[serde(flatten)]
    pub aggregate: StepAggregate,
    /// Summed agent reward for this step (0 in baseline runs).
    pub reward: f64,
}

/// Abstract sink for per-step telemetry.
pub trait EventSink {
    fn log_step(&mut self, record: &StepRecord);

    /// Episode boundary marker. Default: ignored.
    fn log_episode_end(&mut self, _episode: u32, _total_reward: f64) {}
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn log_step(&mut self, record: &StepRecord) {
        (**self).log_step(record);
    }

    fn log_episode_end(&mut self, episode: u32, total_reward: f64) {
        (**self).log_episode_end(episode, total_reward);
    }
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_step(&mut self, _record: &StepRecord) {
        // intentionally no-op
    }
}

/// JSONL file sink: each step as a single JSON object on its own line.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl EventSink for JsonlSink {
    fn log_step(&mut self, record: &StepRecord) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(self.writer, "{line}");
        }
    }

    fn log_episode_end(&mut self, episode: u32, total_reward: f64) {
        let _ = writeln!(
            self.writer,
            "{{\"episode_end\":{episode},\"total_reward\":{total_reward}}}"
        );
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        self.flush();
    }
}
