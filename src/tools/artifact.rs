//! `CreateArtifactTool`: mints an artifact for the side panel.
//!
//! Pure by itself; the observable side effect happens when the reconciled
//! result part reaches [`crate::artifact::ArtifactSlot::observe_part`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::artifact::{ArtifactData, ArtifactType};

use super::{Tool, ToolError};

/// Creates an artifact (image, mermaid diagram, code, or text) to display
/// beside the conversation.
#[derive(Debug, Clone, Default)]
pub struct CreateArtifactTool;

#[derive(Debug, Deserialize)]
struct ArtifactArgs {
    title: String,
    #[serde(rename = "type")]
    artifact_type: ArtifactType,
    template: Option<String>,
    content: String,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl CreateArtifactTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CreateArtifactTool {
    fn name(&self) -> &'static str {
        "CreateArtifactTool"
    }

    fn description(&self) -> &'static str {
        "Create an artifact to display in the sidebar"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Title of the artifact"
                },
                "type": {
                    "type": "string",
                    "enum": ["image", "mermaid", "code", "text"],
                    "description": "Type of artifact to create"
                },
                "template": {
                    "type": "string",
                    "description": "Template for code artifacts only, like \"react\" or \"node\""
                },
                "content": {
                    "type": "string",
                    "description": "Content of the artifact. A URL for images, mermaid syntax for diagrams, source for code, plain text otherwise."
                },
                "metadata": {
                    "type": "object",
                    "description": "Additional metadata for the artifact"
                }
            },
            "required": ["title", "type", "content"]
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ArtifactArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if args.title.trim().is_empty() {
            return Err(ToolError::InvalidArgs("Title is required".into()));
        }
        if args.content.is_empty() {
            return Err(ToolError::InvalidArgs("Content is required".into()));
        }

        let artifact = ArtifactData {
            id: uuid::Uuid::new_v4().to_string(),
            title: args.title.clone(),
            artifact_type: args.artifact_type,
            template: args.template,
            content: args.content,
            metadata: args.metadata,
        };

        Ok(json!({
            "success": true,
            "message": format!("Artifact \"{}\" created successfully", args.title),
            "artifact": artifact,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_mermaid_artifact() {
        let tool = CreateArtifactTool::new();
        let result = tool
            .call(json!({
                "title": "Flow",
                "type": "mermaid",
                "content": "graph TD\nA-->B"
            }))
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(result["artifact"]["title"], "Flow");
        assert_eq!(result["artifact"]["type"], "mermaid");
        assert!(!result["artifact"]["id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_artifact_gets_a_fresh_id() {
        let tool = CreateArtifactTool::new();
        let args = json!({"title": "T", "type": "text", "content": "body"});
        let a = tool.call(args.clone()).await.unwrap();
        let b = tool.call(args).await.unwrap();
        assert_ne!(a["artifact"]["id"], b["artifact"]["id"]);
    }

    #[tokio::test]
    async fn rejects_blank_title() {
        let tool = CreateArtifactTool::new();
        let result = tool
            .call(json!({"title": "  ", "type": "text", "content": "body"}))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
    }

    #[tokio::test]
    async fn rejects_unknown_type() {
        let tool = CreateArtifactTool::new();
        let result = tool
            .call(json!({"title": "T", "type": "video", "content": "x"}))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
    }

    #[tokio::test]
    async fn template_is_passed_through() {
        let tool = CreateArtifactTool::new();
        let result = tool
            .call(json!({
                "title": "App",
                "type": "code",
                "template": "react",
                "content": "export default () => null"
            }))
            .await
            .unwrap();
        assert_eq!(result["artifact"]["template"], "react");
    }
}
