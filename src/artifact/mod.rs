//! Single-slot artifact view state.
//!
//! At most one artifact is open beside the conversation. A new
//! artifact-producing event replaces the current one wholesale (last write
//! wins); only an explicit user dismissal closes the slot. New chat activity
//! never closes it.

use serde::{Deserialize, Serialize};

use crate::message::Part;

/// Kinds of rich content an artifact can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Image,
    Mermaid,
    Code,
    Text,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Image => "image",
            ArtifactType::Mermaid => "mermaid",
            ArtifactType::Code => "code",
            ArtifactType::Text => "text",
        }
    }
}

/// One piece of rich content displayed in the artifact panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactData {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Sandbox template hint for code artifacts ("react", "node", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// The single artifact slot: `closed` or `open(artifact)`.
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: Option<ArtifactData>,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the slot with an artifact, replacing whatever was there.
    pub fn open(&mut self, artifact: ArtifactData) {
        self.current = Some(artifact);
    }

    /// Explicit user dismissal. The only transition back to `closed`.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&ArtifactData> {
        self.current.as_ref()
    }

    /// Inspect a reconciled part and open the slot if it carries a
    /// successful `CreateArtifactTool` result. Returns whether the slot
    /// changed. Any other part leaves the slot untouched.
    pub fn observe_part(&mut self, part: &Part) -> bool {
        let Some(invocation) = part.as_tool_invocation() else {
            return false;
        };
        if invocation.tool_name != "CreateArtifactTool" {
            return false;
        }
        let Some(result) = invocation.result.as_ref() else {
            return false;
        };
        match serde_json::from_value::<ArtifactData>(result["artifact"].clone()) {
            Ok(artifact) => {
                self.open(artifact);
                true
            }
            Err(_) => false,
        }
    }
}

/// Device-dependent presentation of the open artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactLayout {
    /// Full side panel next to the conversation.
    SidePanel,
    /// Overlay drawer on compact viewports.
    Overlay,
}

/// Presentation is a pure function of the compact-viewport signal; it never
/// affects the slot's state.
pub fn layout_for(compact_viewport: bool) -> ArtifactLayout {
    if compact_viewport {
        ArtifactLayout::Overlay
    } else {
        ArtifactLayout::SidePanel
    }
}

/// What the renderer should do with the open artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPlan {
    /// Render the content as an image URL.
    Image { url: String },
    /// Validated mermaid source, ready to compile to a diagram.
    Diagram { source: String },
    /// Mermaid pre-check failed; show this placeholder instead of raising.
    DiagramError { message: String },
    /// Code is displayed; execution only happens on explicit user opt-in,
    /// never automatically.
    Code {
        source: String,
        template: Option<String>,
    },
    /// Formatted rich text.
    RichText { source: String },
}

/// Plan rendering for an artifact, containing failures to the panel.
pub fn render_plan(artifact: &ArtifactData) -> RenderPlan {
    match artifact.artifact_type {
        ArtifactType::Image => RenderPlan::Image {
            url: artifact.content.clone(),
        },
        ArtifactType::Mermaid => match check_mermaid(&artifact.content) {
            Ok(()) => RenderPlan::Diagram {
                source: artifact.content.clone(),
            },
            Err(message) => RenderPlan::DiagramError { message },
        },
        ArtifactType::Code => RenderPlan::Code {
            source: artifact.content.clone(),
            template: artifact.template.clone(),
        },
        ArtifactType::Text => RenderPlan::RichText {
            source: artifact.content.clone(),
        },
    }
}

const MERMAID_DIAGRAM_KINDS: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "mindmap",
    "timeline",
    "gitGraph",
];

/// Cheap syntax pre-check before handing source to the diagram compiler.
fn check_mermaid(source: &str) -> Result<(), String> {
    let first_line = source
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("%%"))
        .ok_or_else(|| "Diagram source is empty".to_string())?;

    let kind = first_line.split_whitespace().next().unwrap_or_default();
    if MERMAID_DIAGRAM_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(format!("Unrecognized diagram type: \"{kind}\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolInvocation;
    use serde_json::json;

    fn artifact(artifact_type: ArtifactType, content: &str) -> ArtifactData {
        ArtifactData {
            id: uuid::Uuid::new_v4().to_string(),
            title: "test artifact".into(),
            artifact_type,
            template: None,
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn slot_starts_closed() {
        let slot = ArtifactSlot::new();
        assert!(!slot.is_open());
        assert!(slot.current().is_none());
    }

    #[test]
    fn open_then_replace_is_last_write_wins() {
        let mut slot = ArtifactSlot::new();
        slot.open(artifact(ArtifactType::Text, "first"));
        slot.open(artifact(ArtifactType::Code, "second"));

        assert!(slot.is_open());
        let current = slot.current().unwrap();
        assert_eq!(current.content, "second");
        assert_eq!(current.artifact_type, ArtifactType::Code);
    }

    #[test]
    fn only_explicit_dismissal_closes() {
        let mut slot = ArtifactSlot::new();
        slot.open(artifact(ArtifactType::Mermaid, "graph TD\nA-->B"));

        // Unrelated chat activity: text parts do not close the slot.
        let changed = slot.observe_part(&Part::text("a text-only reply"));
        assert!(!changed);
        assert!(slot.is_open());

        slot.dismiss();
        assert!(!slot.is_open());
    }

    #[test]
    fn create_artifact_result_opens_slot() {
        let mut slot = ArtifactSlot::new();
        let mut invocation = ToolInvocation::call(
            "call_1",
            "CreateArtifactTool",
            json!({"title": "Flow", "type": "mermaid", "content": "graph TD\nA-->B"}),
        );
        invocation.resolve(json!({
            "success": true,
            "message": "Artifact \"Flow\" created successfully",
            "artifact": {
                "id": "a1",
                "title": "Flow",
                "type": "mermaid",
                "content": "graph TD\nA-->B",
                "metadata": {}
            }
        }));

        let changed = slot.observe_part(&Part::tool_invocation(invocation));
        assert!(changed);
        assert_eq!(slot.current().unwrap().id, "a1");
        assert_eq!(slot.current().unwrap().artifact_type, ArtifactType::Mermaid);
    }

    #[test]
    fn unresolved_or_foreign_invocations_do_not_open_slot() {
        let mut slot = ArtifactSlot::new();

        // Still in call state.
        let pending = ToolInvocation::call("call_2", "CreateArtifactTool", json!({}));
        assert!(!slot.observe_part(&Part::tool_invocation(pending)));

        // A different tool entirely.
        let mut weather = ToolInvocation::call("call_3", "displayWeather", json!({}));
        weather.resolve(json!({"current": {"temp_c": 20.0}}));
        assert!(!slot.observe_part(&Part::tool_invocation(weather)));

        assert!(!slot.is_open());
    }

    #[test]
    fn type_names_match_wire_values() {
        for artifact_type in [
            ArtifactType::Image,
            ArtifactType::Mermaid,
            ArtifactType::Code,
            ArtifactType::Text,
        ] {
            let wire = serde_json::to_value(artifact_type).unwrap();
            assert_eq!(wire, artifact_type.as_str());
        }
    }

    #[test]
    fn layout_follows_viewport_signal() {
        assert_eq!(layout_for(true), ArtifactLayout::Overlay);
        assert_eq!(layout_for(false), ArtifactLayout::SidePanel);
    }

    #[test]
    fn mermaid_plan_validates_source() {
        let good = artifact(ArtifactType::Mermaid, "graph TD\nA-->B");
        assert!(matches!(render_plan(&good), RenderPlan::Diagram { .. }));

        let bad = artifact(ArtifactType::Mermaid, "not a diagram at all");
        match render_plan(&bad) {
            RenderPlan::DiagramError { message } => {
                assert!(message.contains("Unrecognized diagram type"));
            }
            other => panic!("expected diagram error, got {other:?}"),
        }

        let empty = artifact(ArtifactType::Mermaid, "  \n%% comment only\n");
        assert!(matches!(
            render_plan(&empty),
            RenderPlan::DiagramError { .. }
        ));
    }

    #[test]
    fn image_and_text_plans_pass_content_through() {
        let image = artifact(ArtifactType::Image, "https://cdn/img.png");
        assert_eq!(
            render_plan(&image),
            RenderPlan::Image {
                url: "https://cdn/img.png".into()
            }
        );

        let text = artifact(ArtifactType::Text, "# Title");
        assert_eq!(
            render_plan(&text),
            RenderPlan::RichText {
                source: "# Title".into()
            }
        );
    }

    #[test]
    fn code_plan_carries_template() {
        let mut code = artifact(ArtifactType::Code, "console.log(1)");
        code.template = Some("node".into());
        match render_plan(&code) {
            RenderPlan::Code { source, template } => {
                assert_eq!(source, "console.log(1)");
                assert_eq!(template.as_deref(), Some("node"));
            }
            other => panic!("expected code plan, got {other:?}"),
        }
    }
}
