use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use stagecraft_types::{BlockConfig, BlockKind, StagecraftError};

/// A point on the canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This point expressed relative to `origin`.
    pub fn relative_to(self, origin: Position) -> Position {
        Position {
            x: self.x - origin.x,
            y: self.y - origin.y,
        }
    }
}

/// A stage block placed on the canvas.
///
/// Only the configuration changes after placement; its kind always matches
/// the block's kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct BlockInstance {
    id: String,
    kind: BlockKind,
    position: Position,
    config: BlockConfig,
}

#[derive(Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    kind: BlockKind,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    config: Option<serde_json::Value>,
}

impl TryFrom<RawBlock> for BlockInstance {
    type Error = StagecraftError;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let config = match raw.config {
            Some(value) => BlockConfig::from_value(raw.kind, value)?,
            None => BlockConfig::default_for(raw.kind),
        };
        Ok(Self {
            id: raw.id,
            kind: raw.kind,
            position: Position::new(raw.x, raw.y),
            config,
        })
    }
}

impl Serialize for BlockInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BlockInstance", 5)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("type", &self.kind)?;
        s.serialize_field("x", &self.position.x)?;
        s.serialize_field("y", &self.position.y)?;
        s.serialize_field("config", &self.config)?;
        s.end()
    }
}

impl BlockInstance {
    pub(crate) fn new(id: String, kind: BlockKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            config: BlockConfig::default_for(kind),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    pub fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    /// The id prefix before the first `-`, shown under the block title.
    pub fn short_label(&self) -> &str {
        self.id.split('-').next().unwrap_or(&self.id)
    }

    pub(crate) fn replace_config(&mut self, config: BlockConfig) -> stagecraft_types::Result<()> {
        if config.kind() != self.kind {
            return Err(StagecraftError::ConfigKindMismatch {
                id: self.id.clone(),
                expected: self.kind,
                found: config.kind(),
            });
        }
        self.config = config;
        Ok(())
    }
}

/// A directed edge between two blocks. Authored and exported, never used to
/// order execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn touches(&self, block_id: &str) -> bool {
        self.from == block_id || self.to == block_id
    }
}
