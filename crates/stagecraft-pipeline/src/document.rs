//! Pipeline document export and import.
//!
//! A [`PipelineDocument`] bundles the authoring state with its generated
//! CloudFormation template. Export writes it as pretty-printed JSON to
//! `<slug>-pipeline.json`; import rebuilds a [`PipelineState`] from it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use stagecraft_types::Result;

use crate::block::{BlockInstance, Connection};
use crate::state::PipelineState;
use crate::template::{render_template, slugify};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub name: String,
    pub blocks: Vec<BlockInstance>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Pretty-printed template JSON, regenerated on every export.
    #[serde(rename = "cloudFormation", default)]
    pub cloud_formation: String,
}

/// Bundle name, blocks and connections with a freshly generated template.
pub fn export_document(
    name: &str,
    blocks: &[BlockInstance],
    connections: &[Connection],
) -> Result<PipelineDocument> {
    Ok(PipelineDocument {
        name: name.to_string(),
        blocks: blocks.to_vec(),
        connections: connections.to_vec(),
        cloud_formation: render_template(name, blocks)?,
    })
}

impl PipelineDocument {
    pub fn from_state(state: &PipelineState) -> Result<Self> {
        export_document(state.name(), state.blocks(), state.connections())
    }

    /// Export file name: `<slugified name>-pipeline.json`.
    ///
    /// Always a single path component: separators and leading dots in the
    /// name become `-`.
    pub fn file_name(&self) -> String {
        let slug = slugify(&self.name).replace(['/', '\\'], "-");
        let stem = slug.trim_start_matches('.');
        let dots = slug.len() - stem.len();
        format!("{}{}-pipeline.json", "-".repeat(dots), stem)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn into_state(self) -> PipelineState {
        PipelineState::from_parts(self.name, self.blocks, self.connections)
    }
}

/// Write `document` to `path`, creating parent directories as needed.
pub async fn write_document(document: &PipelineDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, document.to_json()?).await?;
    tracing::debug!(path = %path.display(), blocks = document.blocks.len(), "Document written");
    Ok(())
}

/// Save `document` into `dir` under its export file name.
pub async fn save_document(document: &PipelineDocument, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(document.file_name());
    write_document(document, &path).await?;
    tracing::info!(path = %path.display(), "Pipeline exported");
    Ok(path)
}

/// Read a document previously written by [`write_document`] or
/// [`save_document`].
pub async fn load_document(path: &Path) -> Result<PipelineDocument> {
    let json = tokio::fs::read_to_string(path).await?;
    let document: PipelineDocument = serde_json::from_str(&json)?;
    Ok(document)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Position;
    use stagecraft_types::{BlockKind, StagecraftError};

    fn sample_state() -> PipelineState {
        let mut state = PipelineState::new("Web App");
        state.add_block(BlockKind::Source, Position::new(100.0, 100.0));
        state.add_block(BlockKind::Build, Position::new(300.0, 100.0));
        let ids: Vec<String> = state.blocks().iter().map(|b| b.id().to_string()).collect();
        state.connect_blocks(&ids[0], &ids[1]);
        state
    }

    #[test]
    fn export_embeds_template_string() {
        let doc = PipelineDocument::from_state(&sample_state()).unwrap();
        assert_eq!(doc.name, "Web App");
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.connections.len(), 1);

        let template: serde_json::Value = serde_json::from_str(&doc.cloud_formation).unwrap();
        assert_eq!(
            template["Resources"]["CodePipeline"]["Properties"]["Name"],
            "Web-App"
        );
    }

    #[test]
    fn json_uses_original_keys() {
        let doc = PipelineDocument::from_state(&sample_state()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert!(value.get("cloudFormation").is_some());
        assert_eq!(value["blocks"][0]["type"], "source");
        assert_eq!(value["blocks"][1]["config"]["runtime"], "node18");
        assert!(value["connections"][0].get("from").is_some());
    }

    #[test]
    fn file_name_is_slugified() {
        let doc = PipelineDocument::from_state(&PipelineState::new("My  Big Pipeline")).unwrap();
        assert_eq!(doc.file_name(), "My-Big-Pipeline-pipeline.json");
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let doc = PipelineDocument::from_state(&sample_state()).unwrap();

        let path = save_document(&doc, dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("Web-App-pipeline.json"));

        let loaded = load_document(&path).await.unwrap();
        assert_eq!(loaded, doc);

        let state = loaded.into_state();
        assert_eq!(state.name(), "Web App");
        assert_eq!(state.blocks().len(), 2);
        assert_eq!(state.connections().len(), 1);
    }

    #[test]
    fn file_name_strips_path_components() {
        let name_of = |name: &str| {
            PipelineDocument::from_state(&PipelineState::new(name))
                .unwrap()
                .file_name()
        };
        assert_eq!(name_of("../escaped"), "---escaped-pipeline.json");
        assert_eq!(name_of("/etc/passwd"), "-etc-passwd-pipeline.json");
        assert_eq!(name_of("a\\b"), "a-b-pipeline.json");
        assert_eq!(name_of(".hidden"), "-hidden-pipeline.json");
    }

    #[tokio::test]
    async fn save_stays_inside_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sub");
        for name in ["../escaped", "/abs/path", "..", "a/../../b", "C:\\x"] {
            let doc = PipelineDocument::from_state(&PipelineState::new(name)).unwrap();
            let path = save_document(&doc, &out).await.unwrap();
            assert_eq!(path.parent(), Some(out.as_path()), "name {name:?}");
            assert_eq!(path.components().count(), out.components().count() + 1);
            assert!(path.exists());
        }
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.json");
        let doc = PipelineDocument::from_state(&sample_state()).unwrap();

        write_document(&doc, &path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, StagecraftError::Io(_)));
    }

    #[test]
    fn import_tolerates_missing_optional_keys() {
        let doc: PipelineDocument = serde_json::from_str(
            r#"{ "name": "Bare", "blocks": [{ "id": "test-5", "type": "test", "x": 0, "y": 0 }] }"#,
        )
        .unwrap();
        assert!(doc.connections.is_empty());
        assert!(doc.cloud_formation.is_empty());
        assert_eq!(doc.blocks[0].config().get("testCommand").unwrap().to_string(), "npm test");
    }
}
