//! Stage driver trait and the built-in drivers.
//!
//! A driver decides how long a stage "runs" and whether it passes. The
//! executor owns sequencing, logging and cancellation; drivers only produce
//! a verdict for one block.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use stagecraft_types::Result;

use crate::block::BlockInstance;
use crate::executor::ExecutorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageVerdict {
    Success,
    Failure,
}

impl StageVerdict {
    pub fn is_success(self) -> bool {
        matches!(self, StageVerdict::Success)
    }
}

// ---------------------------------------------------------------------------
// StageDriver trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StageDriver: Send + Sync {
    /// Driver identifier used in logs (e.g. "mock", "scripted").
    fn name(&self) -> &str;

    /// Run one stage to its synthetic verdict. May suspend.
    async fn drive(&self, block: &BlockInstance) -> StageVerdict;
}

// ---------------------------------------------------------------------------
// MockStageDriver: randomized delay and outcome
// ---------------------------------------------------------------------------

/// Sleeps for a uniformly drawn delay, then passes with the configured
/// success rate.
pub struct MockStageDriver {
    config: ExecutorConfig,
    rng: Mutex<StdRng>,
}

impl MockStageDriver {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    /// Draw the delay and the verdict for one stage.
    pub async fn sample(&self) -> (Duration, StageVerdict) {
        let mut rng = self.rng.lock().await;
        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        let delay_ms = if max > min {
            rng.random_range(min..max)
        } else {
            min
        };
        let verdict = if rng.random_bool(self.config.success_rate) {
            StageVerdict::Success
        } else {
            StageVerdict::Failure
        };
        (Duration::from_millis(delay_ms), verdict)
    }
}

#[async_trait]
impl StageDriver for MockStageDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn drive(&self, block: &BlockInstance) -> StageVerdict {
        let (delay, verdict) = self.sample().await;
        tracing::debug!(
            block = %block.id(),
            delay_ms = delay.as_millis() as u64,
            "Simulating stage"
        );
        tokio::time::sleep(delay).await;
        verdict
    }
}

// ---------------------------------------------------------------------------
// ScriptedStageDriver: deterministic verdicts
// ---------------------------------------------------------------------------

/// Fails on chosen call numbers (0-based, in the order stages are driven)
/// and passes everything else, after a fixed delay.
pub struct ScriptedStageDriver {
    failing_calls: HashSet<usize>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedStageDriver {
    pub fn always_succeed() -> Self {
        Self {
            failing_calls: HashSet::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing_calls: calls.into_iter().collect(),
            ..Self::always_succeed()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of stages driven so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageDriver for ScriptedStageDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn drive(&self, _block: &BlockInstance) -> StageVerdict {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_calls.contains(&call) {
            StageVerdict::Failure
        } else {
            StageVerdict::Success
        }
    }
}
