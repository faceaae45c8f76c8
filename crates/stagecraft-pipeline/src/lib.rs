//! Pipeline authoring, mock execution, and template export.
//!
//! This crate implements the Stagecraft core: the block catalog, the owned
//! authoring state (blocks, connections, selection), the sequential mock
//! executor with its event stream, and CloudFormation/document export.

pub mod block;
pub mod catalog;
pub mod document;
pub mod driver;
pub mod events;
pub mod executor;
pub mod state;
pub mod template;

pub use block::{BlockInstance, Connection, Position};
pub use catalog::{catalog, entry, CatalogEntry};
pub use document::{export_document, load_document, save_document, write_document, PipelineDocument};
pub use driver::{MockStageDriver, ScriptedStageDriver, StageDriver, StageVerdict};
pub use events::{EventEmitter, ExecutionEvent};
pub use executor::{ExecutorConfig, MockExecutor, RunOutcome, RunPhase, RunReport};
pub use state::{PipelineState, DEFAULT_PIPELINE_NAME};
pub use template::{
    generate_template, render_template, slugify, ActionCategory, CloudFormationTemplate,
};

pub use tokio_util::sync::CancellationToken;
