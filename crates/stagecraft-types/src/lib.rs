//! Shared types, errors, and stage configuration for Stagecraft pipelines.
//!
//! This crate provides the foundational types used across the other Stagecraft crates:
//! - `StagecraftError`: unified error taxonomy
//! - `BlockKind`: the closed set of stage block kinds
//! - `BlockConfig`: typed per-kind configuration (see [`config`])
//! - `LogEntry`: one line of mock execution output

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    field_label, BlockConfig, BuildConfig, ConfigFields, ConfigValue, DatabaseConfig,
    DeployConfig, MonitoringConfig, SourceConfig, TestConfig,
};

/// Unified error type for all Stagecraft subsystems.
#[derive(Debug, thiserror::Error)]
pub enum StagecraftError {
    // === Execution ===
    #[error("Please add at least one block to the pipeline")]
    EmptyPipeline,

    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),

    // === Authoring ===
    #[error("Unknown block type '{0}'")]
    UnknownBlockKind(String),

    #[error("Block '{id}' not found")]
    BlockNotFound { id: String },

    #[error("No block is selected")]
    NoSelection,

    #[error("Invalid value for {kind} field '{field}': {message}")]
    ConfigField {
        kind: BlockKind,
        field: String,
        message: String,
    },

    #[error("Config for a {found} block cannot be applied to {expected} block '{id}'")]
    ConfigKindMismatch {
        id: String,
        expected: BlockKind,
        found: BlockKind,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StagecraftError {
    /// Returns `true` if the error was caused by user input rather than the
    /// environment, i.e. it should be surfaced as an alert and not a crash.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StagecraftError::EmptyPipeline
                | StagecraftError::UnknownBlockKind(_)
                | StagecraftError::BlockNotFound { .. }
                | StagecraftError::NoSelection
                | StagecraftError::ConfigField { .. }
                | StagecraftError::ConfigKindMismatch { .. }
        )
    }
}

/// A convenience alias for `Result<T, StagecraftError>`.
pub type Result<T> = std::result::Result<T, StagecraftError>;

// ---------------------------------------------------------------------------
// BlockKind: the six stage block kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Source,
    Build,
    Test,
    Deploy,
    Database,
    Monitoring,
}

impl BlockKind {
    /// Every kind, in palette order.
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Source,
        BlockKind::Build,
        BlockKind::Test,
        BlockKind::Deploy,
        BlockKind::Database,
        BlockKind::Monitoring,
    ];

    /// The key used in drag payloads, block ids and exported documents.
    pub fn key(self) -> &'static str {
        match self {
            BlockKind::Source => "source",
            BlockKind::Build => "build",
            BlockKind::Test => "test",
            BlockKind::Deploy => "deploy",
            BlockKind::Database => "database",
            BlockKind::Monitoring => "monitoring",
        }
    }

    /// Human-readable stage name shown on blocks and in execution logs.
    pub fn display_name(self) -> &'static str {
        match self {
            BlockKind::Source => "Source Control",
            BlockKind::Build => "Build",
            BlockKind::Test => "Test",
            BlockKind::Deploy => "Deploy",
            BlockKind::Database => "Database Migration",
            BlockKind::Monitoring => "Monitoring",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BlockKind {
    type Err = StagecraftError;

    fn from_str(s: &str) -> Result<Self> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| StagecraftError::UnknownBlockKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LogEntry: mock execution output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Running,
    Success,
    Error,
}

impl LogStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LogStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Wall-clock time in locale style, e.g. `3:04:05 PM`.
    pub time: String,
    pub stage: String,
    pub status: LogStatus,
    pub message: String,
}

impl LogEntry {
    /// Entry announcing that a stage has started.
    pub fn running(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        Self {
            time: local_time(),
            message: format!("Starting {stage}..."),
            stage,
            status: LogStatus::Running,
        }
    }

    /// Terminal entry for a stage, successful or failed.
    pub fn finished(stage: impl Into<String>, success: bool) -> Self {
        let stage = stage.into();
        let (status, message) = if success {
            (LogStatus::Success, format!("{stage} completed successfully"))
        } else {
            (LogStatus::Error, format!("{stage} failed"))
        };
        Self {
            time: local_time(),
            stage,
            status,
            message,
        }
    }
}

fn local_time() -> String {
    chrono::Local::now().format("%-I:%M:%S %p").to_string()
}
