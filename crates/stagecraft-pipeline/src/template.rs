//! CloudFormation template generation.
//!
//! The template has a fixed shape: one `AWS::CodePipeline::Pipeline` resource
//! with one single-action stage per block, in block order.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use stagecraft_types::{BlockKind, Result};

use crate::block::BlockInstance;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// Replace every whitespace run in `name` with a single `-`.
pub fn slugify(name: &str) -> String {
    WHITESPACE.replace_all(name, "-").into_owned()
}

fn compact(name: &str) -> String {
    WHITESPACE.replace_all(name, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFormationTemplate {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Resources")]
    pub resources: Resources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resources {
    pub code_pipeline: PipelineResource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: PipelineProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PipelineProperties {
    pub name: String,
    pub role_arn: RoleRef,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    #[serde(rename = "Ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stage {
    pub name: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Action {
    pub name: String,
    pub action_type_id: ActionTypeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTypeId {
    pub category: ActionCategory,
    pub owner: String,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Source,
    Build,
    Deploy,
}

impl ActionCategory {
    /// Source and build map to their own category; every other kind is
    /// treated as a deploy action.
    pub fn for_kind(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Source => ActionCategory::Source,
            BlockKind::Build => ActionCategory::Build,
            _ => ActionCategory::Deploy,
        }
    }
}

fn provider_for(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Source => "GitHub",
        _ => "CodeBuild",
    }
}

/// Build the template for `blocks` under `pipeline_name`.
pub fn generate_template(pipeline_name: &str, blocks: &[BlockInstance]) -> CloudFormationTemplate {
    let stages = blocks
        .iter()
        .enumerate()
        .map(|(index, block)| Stage {
            name: format!("Stage{}", index + 1),
            actions: vec![Action {
                name: compact(block.display_name()),
                action_type_id: ActionTypeId {
                    category: ActionCategory::for_kind(block.kind()),
                    owner: "AWS".into(),
                    provider: provider_for(block.kind()).into(),
                },
            }],
        })
        .collect();

    CloudFormationTemplate {
        format_version: "2010-09-09".into(),
        description: format!("CI/CD Pipeline for {pipeline_name}"),
        resources: Resources {
            code_pipeline: PipelineResource {
                resource_type: "AWS::CodePipeline::Pipeline".into(),
                properties: PipelineProperties {
                    name: slugify(pipeline_name),
                    role_arn: RoleRef {
                        reference: "CodePipelineRole".into(),
                    },
                    stages,
                },
            },
        },
    }
}

/// The template as pretty-printed JSON.
pub fn render_template(pipeline_name: &str, blocks: &[BlockInstance]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&generate_template(
        pipeline_name,
        blocks,
    ))?)
}
