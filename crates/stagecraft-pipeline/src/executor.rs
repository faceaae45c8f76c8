//! Mock pipeline executor.
//!
//! Walks the block list in insertion order, one stage at a time, logging a
//! `running` entry and then a terminal entry per block. The first synthetic
//! failure halts the run. Connections are not consulted.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use stagecraft_types::{LogEntry, Result, StagecraftError};

use crate::block::BlockInstance;
use crate::driver::{MockStageDriver, StageDriver};
use crate::events::{EventEmitter, ExecutionEvent};
use crate::state::PipelineState;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Timing and outcome parameters for the mock driver.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Lower bound of the per-stage delay (inclusive).
    pub min_delay: Duration,
    /// Upper bound of the per-stage delay (exclusive).
    pub max_delay: Duration,
    /// Probability that a stage succeeds.
    pub success_rate: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(5000),
            success_rate: 0.9,
            seed: None,
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_delay > self.max_delay {
            return Err(StagecraftError::InvalidConfig(format!(
                "min delay {}ms exceeds max delay {}ms",
                self.min_delay.as_millis(),
                self.max_delay.as_millis()
            )));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(StagecraftError::InvalidConfig(format!(
                "success rate {} is outside [0, 1]",
                self.success_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every block passed.
    Completed,
    /// The block at `index` failed; later blocks were not run.
    Halted { index: usize, block_id: String },
    /// The run was cancelled while the block at `index` was pending.
    Cancelled { index: usize, block_id: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub logs: Vec<LogEntry>,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// MockExecutor
// ---------------------------------------------------------------------------

/// Drives runs over a pipeline and keeps the log list of the latest run.
pub struct MockExecutor {
    driver: Box<dyn StageDriver>,
    events: EventEmitter,
    phase: RunPhase,
    logs: Vec<LogEntry>,
}

impl MockExecutor {
    /// Create an executor with the given stage driver.
    pub fn new(driver: impl StageDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            events: EventEmitter::default(),
            phase: RunPhase::Idle,
            logs: Vec::new(),
        }
    }

    /// Create an executor backed by the randomized [`MockStageDriver`].
    pub fn with_config(config: ExecutorConfig) -> Result<Self> {
        Ok(Self::new(MockStageDriver::new(config)?))
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_executing(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// Log entries of the latest run; kept until the next run starts.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Run the pipeline to completion or first failure.
    pub async fn execute(&mut self, state: &PipelineState) -> Result<RunReport> {
        self.execute_with_cancel(state, CancellationToken::new()).await
    }

    /// Run the pipeline, stopping early if `cancel` fires.
    ///
    /// The block list is snapshotted at start; edits made to `state`
    /// afterwards do not affect this run.
    pub async fn execute_with_cancel(
        &mut self,
        state: &PipelineState,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        if state.is_empty() {
            return Err(StagecraftError::EmptyPipeline);
        }

        let blocks: Vec<BlockInstance> = state.blocks().to_vec();
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        self.logs.clear();
        self.phase = RunPhase::Running;
        tracing::info!(
            run = %run_id,
            pipeline = %state.name(),
            blocks = blocks.len(),
            driver = self.driver.name(),
            "Pipeline run started"
        );
        self.events.emit(ExecutionEvent::RunStarted {
            run_id: run_id.clone(),
            pipeline_name: state.name().to_string(),
            block_count: blocks.len(),
        });

        let mut outcome = RunOutcome::Completed;
        for (index, block) in blocks.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = RunOutcome::Cancelled {
                    index,
                    block_id: block.id().to_string(),
                };
                break;
            }

            let stage = block.display_name();
            self.append(&run_id, block, LogEntry::running(stage));

            let stage_started = Instant::now();
            let verdict = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                verdict = self.driver.drive(block) => Some(verdict),
            };
            let Some(verdict) = verdict else {
                tracing::info!(run = %run_id, block = %block.id(), "Run cancelled");
                outcome = RunOutcome::Cancelled {
                    index,
                    block_id: block.id().to_string(),
                };
                break;
            };

            let success = verdict.is_success();
            self.append(&run_id, block, LogEntry::finished(stage, success));
            self.events.emit(ExecutionEvent::StageFinished {
                run_id: run_id.clone(),
                block_id: block.id().to_string(),
                index,
                success,
                duration_ms: stage_started.elapsed().as_millis() as u64,
            });

            if !success {
                tracing::warn!(
                    run = %run_id,
                    block = %block.id(),
                    stage,
                    "Stage failed, halting run"
                );
                outcome = RunOutcome::Halted {
                    index,
                    block_id: block.id().to_string(),
                };
                break;
            }
        }

        let duration = started.elapsed();
        self.phase = RunPhase::Idle;
        tracing::info!(
            run = %run_id,
            outcome = ?outcome,
            duration_ms = duration.as_millis() as u64,
            "Pipeline run finished"
        );
        self.events.emit(ExecutionEvent::RunFinished {
            run_id: run_id.clone(),
            outcome: outcome.clone(),
            duration_ms: duration.as_millis() as u64,
        });

        Ok(RunReport {
            run_id,
            outcome,
            logs: self.logs.clone(),
            duration,
        })
    }

    fn append(&mut self, run_id: &str, block: &BlockInstance, entry: LogEntry) {
        tracing::debug!(
            run = %run_id,
            block = %block.id(),
            status = ?entry.status,
            "{}",
            entry.message
        );
        self.logs.push(entry.clone());
        self.events.emit(ExecutionEvent::LogAppended {
            run_id: run_id.to_string(),
            block_id: block.id().to_string(),
            entry,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
