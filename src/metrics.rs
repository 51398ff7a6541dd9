//! Metrics describing a ranking pipeline run.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Pipeline stage a measurement belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Flattening and schema enforcement.
    Schema,
    /// Numeric attribute binning.
    Binning,
    /// Grouping into attribute counts.
    Aggregation,
    /// Probability and information scoring.
    Scoring,
    /// Join of statistics back onto token rows.
    Merge,
    /// Per-token reduction and rank assignment.
    Ranking,
}

/// Measurement captured for one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageMetrics {
    /// Stage measured.
    pub stage: PipelineStage,
    /// Rows produced (or modified, for binning) by the stage.
    pub rows: usize,
    /// Time spent in the stage.
    pub elapsed: Duration,
}

/// Aggregate metrics produced by a ranking run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineMetrics {
    /// Per-stage snapshots in execution order.
    pub stages: Vec<StageMetrics>,
    /// Total duration of the run.
    pub total_duration: Duration,
}

impl PipelineMetrics {
    /// Creates an empty metrics container with room for every stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::with_capacity(6),
            total_duration: Duration::ZERO,
        }
    }

    /// Records a stage that started at `started`.
    pub fn record(&mut self, stage: PipelineStage, rows: usize, started: Instant) {
        self.stages.push(StageMetrics {
            stage,
            rows,
            elapsed: started.elapsed(),
        });
    }

    /// Returns the measurement of a stage, if it ran.
    #[must_use]
    pub fn stage(&self, stage: PipelineStage) -> Option<&StageMetrics> {
        self.stages.iter().find(|metrics| metrics.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_stages_in_order() {
        let mut metrics = PipelineMetrics::new();
        let started = Instant::now();
        metrics.record(PipelineStage::Schema, 12, started);
        metrics.record(PipelineStage::Aggregation, 4, started);
        assert_eq!(metrics.stages.len(), 2);
        assert_eq!(metrics.stages[0].stage, PipelineStage::Schema);
        assert_eq!(
            metrics.stage(PipelineStage::Aggregation).map(|m| m.rows),
            Some(4)
        );
        assert!(metrics.stage(PipelineStage::Ranking).is_none());
    }
}
