//! `webSearchTool`: real-time web search through a sonar-style
//! chat-completions API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Tool, ToolError};

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai/chat/completions";

const SEARCH_SYSTEM_PROMPT: &str = "You are a web search assistant. Answer the \
user's query using up-to-date information from the web. Be concise and cite \
your sources.";

/// Performs a real-time web search and returns a summarized answer plus
/// citations.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "webSearchTool"
    }

    fn description(&self) -> &'static str {
        "Search the web for recent events, current data, or anything the \
         assistant may not have reliable knowledge of"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question or topic to search the web for"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: SearchArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        debug!(query = %args.query, "dispatching web search");

        let body = json!({
            "model": "sonar",
            "return_images": true,
            "messages": [
                {"role": "system", "content": SEARCH_SYSTEM_PROMPT},
                {"role": "user", "content": args.query},
            ],
            "temperature": 0.2,
            "top_p": 0.9,
            "frequency_penalty": 1,
            "max_tokens": 1000,
        });

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!(
                "Something went wrong while performing the web search: {e}"
            )))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Web search failed: {status} {body}"
            )));
        }

        let data: serde_json::Value = response.json().await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(json!({
            "content": content,
            "citations": data.get("citations").cloned().unwrap_or(json!([])),
            "model": data.get("model").cloned().unwrap_or(json!(null)),
            "usage": data.get("usage").cloned().unwrap_or(json!(null)),
            "search_results": data.get("search_results").cloned().unwrap_or(json!(null)),
        }))
    }
}
