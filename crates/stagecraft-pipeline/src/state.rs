//! Pipeline authoring state: placed blocks, connections, selection and name.

use stagecraft_types::{BlockConfig, BlockKind, Result, StagecraftError};

use crate::block::{BlockInstance, Connection, Position};

pub const DEFAULT_PIPELINE_NAME: &str = "My Pipeline";

/// Explicitly owned authoring state for one pipeline.
///
/// Blocks keep insertion order, which is also execution order.
#[derive(Debug, Clone)]
pub struct PipelineState {
    name: String,
    blocks: Vec<BlockInstance>,
    connections: Vec<Connection>,
    selected: Option<String>,
    /// Last millisecond stamp handed out, so ids stay unique within a burst.
    last_stamp: i64,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(DEFAULT_PIPELINE_NAME)
    }
}

impl PipelineState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            connections: Vec::new(),
            selected: None,
            last_stamp: 0,
        }
    }

    /// Rebuild state from previously exported parts. Selection starts empty.
    pub fn from_parts(
        name: impl Into<String>,
        blocks: Vec<BlockInstance>,
        connections: Vec<Connection>,
    ) -> Self {
        let last_stamp = blocks
            .iter()
            .filter_map(|b| b.id().rsplit('-').next()?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            name: name.into(),
            blocks,
            connections,
            selected: None,
            last_stamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn block(&self, id: &str) -> Option<&BlockInstance> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    /// Like [`block`](Self::block), but a missing id is an error.
    pub fn require_block(&self, id: &str) -> Result<&BlockInstance> {
        self.block(id)
            .ok_or_else(|| StagecraftError::BlockNotFound { id: id.to_string() })
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn fresh_id(&mut self, kind: BlockKind) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let stamp = now.max(self.last_stamp.saturating_add(1));
        self.last_stamp = stamp;

        // Imported ids can pin the stamp at i64::MAX; suffix until unique.
        let mut id = format!("{}-{}", kind.key(), stamp);
        let mut n = 1u32;
        while self.block(&id).is_some() {
            id = format!("{}-{}-{}", kind.key(), stamp, n);
            n += 1;
        }
        id
    }

    /// Append a new block of `kind` at `position` with the catalog default
    /// config.
    pub fn add_block(&mut self, kind: BlockKind, position: Position) -> &BlockInstance {
        let id = self.fresh_id(kind);
        tracing::debug!(block = %id, x = position.x, y = position.y, "Block added");
        self.blocks.push(BlockInstance::new(id, kind, position));
        let idx = self.blocks.len() - 1;
        &self.blocks[idx]
    }

    /// Handle a palette drop: `payload` is the kind key carried by the drag,
    /// `pointer` and `canvas_origin` are in the same (viewport) coordinates.
    pub fn drop_block(
        &mut self,
        payload: &str,
        pointer: Position,
        canvas_origin: Position,
    ) -> Result<&BlockInstance> {
        let kind: BlockKind = payload.parse()?;
        Ok(self.add_block(kind, pointer.relative_to(canvas_origin)))
    }

    /// Select a block by id, or clear the selection with `None`.
    ///
    /// Returns `false` (and clears the selection) when the id is unknown.
    pub fn select_block(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if self.block(id).is_some() => {
                self.selected = Some(id.to_string());
                true
            }
            Some(id) => {
                tracing::debug!(block = %id, "Cannot select unknown block");
                self.selected = None;
                false
            }
            None => {
                self.selected = None;
                true
            }
        }
    }

    pub fn selected_block(&self) -> Option<&BlockInstance> {
        self.selected.as_deref().and_then(|id| self.block(id))
    }

    /// Replace the whole config of block `id`.
    ///
    /// Returns `Ok(false)` when no block has that id.
    pub fn update_block_config(&mut self, id: &str, config: BlockConfig) -> Result<bool> {
        match self.blocks.iter_mut().find(|b| b.id() == id) {
            Some(block) => {
                block.replace_config(config)?;
                tracing::debug!(block = %id, "Block config updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply one configuration-form edit to the selected block.
    pub fn set_selected_field(&mut self, field: &str, input: &str) -> Result<()> {
        let block = self.selected_block().ok_or(StagecraftError::NoSelection)?;
        let id = block.id().to_string();
        let config = block.config().with_input(field, input)?;
        self.update_block_config(&id, config)?;
        Ok(())
    }

    /// Remove a block and every connection touching it. Clears the selection
    /// if it pointed at the removed block. Returns `false` if nothing was
    /// removed.
    pub fn delete_block(&mut self, id: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b.id() != id);
        if self.blocks.len() == before {
            return false;
        }
        self.connections.retain(|c| !c.touches(id));
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        tracing::debug!(block = %id, "Block deleted");
        true
    }

    /// Add a directed connection. Self-loops and exact duplicates are ignored.
    ///
    /// Endpoints are not checked against the block list.
    pub fn connect_blocks(&mut self, from: &str, to: &str) -> bool {
        if from == to
            || self
                .connections
                .iter()
                .any(|c| c.from == from && c.to == to)
        {
            return false;
        }
        self.connections.push(Connection::new(from, to));
        true
    }

    /// Connections whose endpoints both exist, paired with their blocks.
    pub fn resolved_connections(
        &self,
    ) -> impl Iterator<Item = (&BlockInstance, &BlockInstance)> + '_ {
        self.connections
            .iter()
            .filter_map(|c| Some((self.block(&c.from)?, self.block(&c.to)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn state_with(kinds: &[BlockKind]) -> PipelineState {
        let mut state = PipelineState::default();
        for (i, kind) in kinds.iter().enumerate() {
            state.add_block(*kind, Position::new(i as f64 * 100.0, 50.0));
        }
        state
    }

    fn ids(state: &PipelineState) -> Vec<String> {
        state.blocks().iter().map(|b| b.id().to_string()).collect()
    }

    #[test]
    fn default_name() {
        assert_eq!(PipelineState::default().name(), "My Pipeline");
    }

    #[test]
    fn add_block_uses_default_config_and_unique_ids() {
        let state = state_with(&[BlockKind::Build; 25]);
        assert_eq!(state.blocks().len(), 25);
        let unique: HashSet<_> = ids(&state).into_iter().collect();
        assert_eq!(unique.len(), 25);
        for block in state.blocks() {
            assert!(block.id().starts_with("build-"));
            assert_eq!(block.config(), &BlockConfig::default_for(BlockKind::Build));
        }
    }

    #[test]
    fn drop_block_places_relative_to_canvas() {
        let mut state = PipelineState::default();
        let block = state
            .drop_block("test", Position::new(420.0, 310.0), Position::new(320.0, 73.0))
            .unwrap();
        assert_eq!(block.kind(), BlockKind::Test);
        assert_eq!(block.position(), Position::new(100.0, 237.0));
    }

    #[test]
    fn drop_block_rejects_unknown_payload() {
        let mut state = PipelineState::default();
        let err = state
            .drop_block("lint", Position::default(), Position::default())
            .unwrap_err();
        assert!(matches!(err, StagecraftError::UnknownBlockKind(_)));
        assert!(state.is_empty());
    }

    #[test]
    fn selection_is_exclusive() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build]);
        let ids = ids(&state);
        assert!(state.select_block(Some(&ids[0])));
        assert!(state.select_block(Some(&ids[1])));
        assert_eq!(state.selected_block().unwrap().id(), ids[1]);
        assert!(state.select_block(None));
        assert!(state.selected_block().is_none());
    }

    #[test]
    fn selecting_unknown_block_clears_selection() {
        let mut state = state_with(&[BlockKind::Source]);
        let id = ids(&state).remove(0);
        state.select_block(Some(&id));
        assert!(!state.select_block(Some("missing-1")));
        assert!(state.selected_block().is_none());
    }

    #[test]
    fn update_block_config_replaces_whole_config() {
        let mut state = state_with(&[BlockKind::Deploy]);
        let id = ids(&state).remove(0);
        let config = BlockConfig::default_for(BlockKind::Deploy)
            .with_input("region", "eu-west-1")
            .unwrap();
        assert!(state.update_block_config(&id, config.clone()).unwrap());
        assert_eq!(state.block(&id).unwrap().config(), &config);
    }

    #[test]
    fn update_block_config_missing_id_is_noop() {
        let mut state = state_with(&[BlockKind::Deploy]);
        let before = state.blocks().to_vec();
        let updated = state
            .update_block_config("nope", BlockConfig::default_for(BlockKind::Deploy))
            .unwrap();
        assert!(!updated);
        assert_eq!(state.blocks(), before.as_slice());
    }

    #[test]
    fn update_block_config_rejects_other_kind() {
        let mut state = state_with(&[BlockKind::Deploy]);
        let id = ids(&state).remove(0);
        let err = state
            .update_block_config(&id, BlockConfig::default_for(BlockKind::Source))
            .unwrap_err();
        assert!(matches!(err, StagecraftError::ConfigKindMismatch { .. }));
    }

    #[test]
    fn successive_field_edits_accumulate() {
        let mut state = state_with(&[BlockKind::Source]);
        let id = ids(&state).remove(0);
        state.select_block(Some(&id));
        state.set_selected_field("repo", "acme/app").unwrap();
        state.set_selected_field("branch", "release").unwrap();

        let config = state.block(&id).unwrap().config();
        assert_eq!(config.get("repo").unwrap().to_string(), "acme/app");
        assert_eq!(config.get("branch").unwrap().to_string(), "release");
    }

    #[test]
    fn require_block_reports_missing_id() {
        let state = state_with(&[BlockKind::Test]);
        let id = ids(&state).remove(0);
        assert_eq!(state.require_block(&id).unwrap().id(), id);

        let err = state.require_block("missing-1").unwrap_err();
        assert!(matches!(err, StagecraftError::BlockNotFound { ref id } if id == "missing-1"));
        assert_eq!(err.to_string(), "Block 'missing-1' not found");
    }

    #[test]
    fn set_selected_field_without_selection_fails() {
        let mut state = state_with(&[BlockKind::Source]);
        let err = state.set_selected_field("repo", "x").unwrap_err();
        assert!(matches!(err, StagecraftError::NoSelection));
    }

    #[test]
    fn delete_block_cascades_connections_and_selection() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build, BlockKind::Deploy]);
        let ids = ids(&state);
        state.connect_blocks(&ids[0], &ids[1]);
        state.connect_blocks(&ids[1], &ids[2]);
        state.connect_blocks(&ids[0], &ids[2]);
        state.select_block(Some(&ids[1]));

        assert!(state.delete_block(&ids[1]));

        assert_eq!(state.blocks().len(), 2);
        assert!(state.block(&ids[1]).is_none());
        assert_eq!(state.connections(), &[Connection::new(&ids[0], &ids[2])]);
        assert!(state.selected_block().is_none());
    }

    #[test]
    fn delete_block_keeps_other_selection() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build]);
        let ids = ids(&state);
        state.select_block(Some(&ids[0]));
        state.delete_block(&ids[1]);
        assert_eq!(state.selected_block().unwrap().id(), ids[0]);
    }

    #[test]
    fn delete_unknown_block_changes_nothing() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build]);
        let ids = ids(&state);
        state.connect_blocks(&ids[0], &ids[1]);
        assert!(!state.delete_block("missing-1"));
        assert_eq!(state.blocks().len(), 2);
        assert_eq!(state.connections().len(), 1);
    }

    #[test]
    fn connect_ignores_self_loops_and_duplicates() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build]);
        let ids = ids(&state);
        assert!(!state.connect_blocks(&ids[0], &ids[0]));
        assert!(state.connections().is_empty());

        assert!(state.connect_blocks(&ids[0], &ids[1]));
        assert!(!state.connect_blocks(&ids[0], &ids[1]));
        assert_eq!(state.connections().len(), 1);

        // Reverse direction is a different edge.
        assert!(state.connect_blocks(&ids[1], &ids[0]));
        assert_eq!(state.connections().len(), 2);
    }

    #[test]
    fn resolved_connections_skip_dangling_edges() {
        let mut state = state_with(&[BlockKind::Source, BlockKind::Build]);
        let ids = ids(&state);
        state.connect_blocks(&ids[0], &ids[1]);
        state.connect_blocks(&ids[0], "ghost-1");

        let resolved: Vec<_> = state
            .resolved_connections()
            .map(|(a, b)| (a.id().to_string(), b.id().to_string()))
            .collect();
        assert_eq!(resolved, vec![(ids[0].clone(), ids[1].clone())]);
    }

    #[test]
    fn saturated_imported_stamp_still_yields_unique_ids() {
        let imported: BlockInstance = serde_json::from_value(serde_json::json!({
            "id": "build-9223372036854775807", "type": "build", "x": 0, "y": 0
        }))
        .unwrap();
        let mut state = PipelineState::from_parts("Imported", vec![imported], Vec::new());

        let first = state
            .add_block(BlockKind::Build, Position::default())
            .id()
            .to_string();
        let second = state
            .add_block(BlockKind::Build, Position::default())
            .id()
            .to_string();

        let unique: HashSet<_> = ids(&state).into_iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(first, "build-9223372036854775807-1");
        assert_eq!(second, "build-9223372036854775807-2");
    }

    #[test]
    fn from_parts_continues_id_sequence() {
        let mut original = state_with(&[BlockKind::Source]);
        let first = ids(&original).remove(0);
        original.connect_blocks(&first, "other-1");

        let mut restored = PipelineState::from_parts(
            "Restored",
            original.blocks().to_vec(),
            original.connections().to_vec(),
        );
        let new_id = restored
            .add_block(BlockKind::Source, Position::default())
            .id()
            .to_string();
        assert_ne!(new_id, first);
        assert_eq!(restored.connections().len(), 1);
        assert!(restored.selected_block().is_none());
    }
}
