//! Assistant modes and the tools each one may call.
//!
//! The mode is part of the generation request; it selects the system prompt
//! and the subset of tools the model is allowed to call. The reasoning mode
//! disables tool calls entirely.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Active assistant mode for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChatMode {
    /// General chat with the standard tool set.
    #[default]
    #[serde(rename = "chat-model")]
    Chat,
    /// Extended reasoning; no tools, reasoning channel surfaced.
    #[serde(rename = "chat-model-reasoning")]
    Reasoning,
    /// Web-search-first answering.
    #[serde(rename = "search-model")]
    Search,
    /// Chat plus artifact creation in the side panel.
    #[serde(rename = "artifact-model")]
    Artifact,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat-model",
            ChatMode::Reasoning => "chat-model-reasoning",
            ChatMode::Search => "search-model",
            ChatMode::Artifact => "artifact-model",
        }
    }

    /// Wire names of the tools callable in this mode.
    pub fn enabled_tools(&self) -> &'static [&'static str] {
        match self {
            ChatMode::Chat => &["ImageTool", "displayWeather", "youtubeTranscription"],
            ChatMode::Reasoning => &[],
            ChatMode::Search => &["webSearchTool"],
            ChatMode::Artifact => &[
                "ImageTool",
                "displayWeather",
                "youtubeTranscription",
                "CreateArtifactTool",
            ],
        }
    }

    pub fn allows_tools(&self) -> bool {
        !self.enabled_tools().is_empty()
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ChatMode::Chat => {
                "You are a friendly, knowledgeable assistant. Keep responses \
                 concise and helpful. Use the available tools when a request \
                 calls for live data, images, or video transcripts."
            }
            ChatMode::Reasoning => {
                "You are a careful assistant. Think through the problem step \
                 by step before answering. Do not call tools; reason from \
                 what you know."
            }
            ChatMode::Search => {
                "You are a research assistant. For recent events, changing \
                 data, or unknown facts, search the web rather than answering \
                 from static knowledge, and cite your sources."
            }
            ChatMode::Artifact => {
                "You are a creative assistant. When the user asks for code, \
                 diagrams, documents, or images worth keeping, create an \
                 artifact so it appears in the side panel, and summarize it \
                 in your reply."
            }
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat-model" | "chat" => Ok(ChatMode::Chat),
            "chat-model-reasoning" | "reasoning" => Ok(ChatMode::Reasoning),
            "search-model" | "search" => Ok(ChatMode::Search),
            "artifact-model" | "artifact" => Ok(ChatMode::Artifact),
            other => Err(format!("unknown chat mode: {other}")),
        }
    }
}
