//! `youtubeTranscription`: fetches a transcript for a video URL.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Tool, ToolError};

/// Retrieves a transcript from a transcription service.
#[derive(Debug, Clone)]
pub struct TranscriptionTool {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionArgs {
    #[serde(alias = "videoUrl", alias = "url")]
    video_url: String,
}

impl TranscriptionTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for TranscriptionTool {
    fn name(&self) -> &'static str {
        "youtubeTranscription"
    }

    fn description(&self) -> &'static str {
        "Transcribe the audio of a YouTube video given its URL"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "video_url": {
                    "type": "string",
                    "description": "Full URL of the video to transcribe"
                }
            },
            "required": ["video_url"]
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: TranscriptionArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if !args.video_url.starts_with("http") {
            return Err(ToolError::InvalidArgs(format!(
                "not a valid video URL: {}",
                args.video_url
            )));
        }

        debug!(video_url = %args.video_url, "requesting transcription");

        let response = self
            .client
            .post(&self.base_url)
            .json(&json!({"video_url": args.video_url}))
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Transcription failed: {status} {body}"
            )));
        }

        let data: serde_json::Value = response.json().await?;
        Ok(json!({
            "video_url": args.video_url,
            "transcript": data.get("transcript").cloned().unwrap_or(json!(null)),
            "language": data.get("language").cloned().unwrap_or(json!(null)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_url_input() {
        let tool = TranscriptionTool::new("https://localhost/transcribe");
        let result = tool.call(json!({"video_url": "not a url"})).await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
    }

    #[tokio::test]
    async fn accepts_camel_case_alias() {
        // Args arrive model-shaped; both `video_url` and `videoUrl` parse.
        let tool = TranscriptionTool::new("https://localhost/transcribe");
        let result = tool.call(json!({"videoUrl": "nope"})).await;
        // Parsed fine, rejected on URL validation rather than arg shape.
        assert!(matches!(result, Err(ToolError::InvalidArgs(msg)) if msg.contains("valid video URL")));
    }

    #[test]
    fn schema_names_video_url() {
        let tool = TranscriptionTool::new("https://localhost/transcribe");
        assert_eq!(tool.parameters()["required"][0], "video_url");
    }
}
