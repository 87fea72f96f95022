//! Registry holding all available tools.

use std::sync::Arc;

use crate::modes::ChatMode;

use super::artifact::CreateArtifactTool;
use super::image::ImageTool;
use super::search::WebSearchTool;
use super::transcription::TranscriptionTool;
use super::weather::WeatherTool;
use super::{ArcTool, ToolDefinition};

/// Credentials and endpoints for the remote tools.
#[derive(Debug, Clone, Default)]
pub struct ToolSecrets {
    pub weather_api_key: String,
    pub search_api_key: String,
    pub transcription_url: String,
}

/// Registry of every tool the assistant can expose.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    pub weather: WeatherTool,
    pub image: ImageTool,
    pub search: WebSearchTool,
    pub transcription: TranscriptionTool,
    pub artifact: CreateArtifactTool,
}

impl ToolRegistry {
    pub fn new(secrets: ToolSecrets) -> Self {
        Self {
            weather: WeatherTool::new(secrets.weather_api_key),
            image: ImageTool::new(),
            search: WebSearchTool::new(secrets.search_api_key),
            transcription: TranscriptionTool::new(secrets.transcription_url),
            artifact: CreateArtifactTool::new(),
        }
    }

    /// Get all tools as Arc-wrapped trait objects for shared ownership.
    pub fn all_tools(&self) -> Vec<ArcTool> {
        vec![
            Arc::new(self.weather.clone()),
            Arc::new(self.image.clone()),
            Arc::new(self.search.clone()),
            Arc::new(self.transcription.clone()),
            Arc::new(self.artifact.clone()),
        ]
    }

    /// Get a subset of tools by wire name. Unknown names are skipped.
    pub fn tools_by_name(&self, names: &[&str]) -> Vec<ArcTool> {
        let mut tools: Vec<ArcTool> = Vec::new();
        for name in names {
            match *name {
                "displayWeather" => tools.push(Arc::new(self.weather.clone())),
                "ImageTool" => tools.push(Arc::new(self.image.clone())),
                "webSearchTool" => tools.push(Arc::new(self.search.clone())),
                "youtubeTranscription" => tools.push(Arc::new(self.transcription.clone())),
                "CreateArtifactTool" => tools.push(Arc::new(self.artifact.clone())),
                _ => {}
            }
        }
        tools
    }

    /// Find one tool by wire name.
    pub fn get(&self, name: &str) -> Option<ArcTool> {
        self.tools_by_name(&[name]).into_iter().next()
    }

    /// The tools callable in a given mode.
    pub fn tools_for_mode(&self, mode: ChatMode) -> Vec<ArcTool> {
        self.tools_by_name(mode.enabled_tools())
    }

    /// Definitions for the model request, filtered by mode.
    pub fn definitions_for_mode(&self, mode: ChatMode) -> Vec<ToolDefinition> {
        self.tools_for_mode(mode)
            .iter()
            .map(|t| t.definition())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolSecrets::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_five_tools() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.all_tools().len(), 5);
    }

    #[test]
    fn tools_by_name_unknown_is_skipped() {
        let registry = ToolRegistry::default();
        let tools = registry.tools_by_name(&["displayWeather", "nonexistent", "ImageTool"]);
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn tool_names_are_unique() {
        let registry = ToolRegistry::default();
        let mut names: Vec<String> = registry
            .all_tools()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        let original_len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), original_len);
    }

    #[test]
    fn mode_filtering_matches_mode_table() {
        let registry = ToolRegistry::default();

        assert_eq!(registry.tools_for_mode(ChatMode::Chat).len(), 3);
        assert_eq!(registry.tools_for_mode(ChatMode::Artifact).len(), 4);
        assert_eq!(registry.tools_for_mode(ChatMode::Search).len(), 1);
        assert!(registry.tools_for_mode(ChatMode::Reasoning).is_empty());
    }

    #[test]
    fn definitions_carry_schemas() {
        let registry = ToolRegistry::default();
        for def in registry.definitions_for_mode(ChatMode::Artifact) {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert_eq!(def.parameters["type"], "object");
        }
    }

    #[test]
    fn get_finds_single_tool() {
        let registry = ToolRegistry::default();
        assert!(registry.get("CreateArtifactTool").is_some());
        assert!(registry.get("no_such_tool").is_none());
    }
}
