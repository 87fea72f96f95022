//! `displayWeather`: current conditions for a location.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Tool, ToolError};

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Looks up current weather via a weatherapi.com-compatible endpoint.
///
/// The result payload is passed through untouched so the renderer sees the
/// full `location`/`current` structure.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    location: String,
}

impl WeatherTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the API endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "displayWeather"
    }

    fn description(&self) -> &'static str {
        "Display the current weather conditions for a given location"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name to get the weather for"
                }
            },
            "required": ["location"]
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: WeatherArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
        if args.location.trim().is_empty() {
            return Err(ToolError::InvalidArgs("location is required".into()));
        }

        debug!(location = %args.location, "fetching current weather");

        let url = format!("{}/current.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", args.location.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Weather lookup failed for \"{}\": {} {}",
                args.location, status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_missing_location() {
        let tool = WeatherTool::new("test-key");
        let result = tool.call(json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
    }

    #[tokio::test]
    async fn rejects_blank_location() {
        let tool = WeatherTool::new("test-key");
        let result = tool.call(json!({"location": "   "})).await;
        assert!(matches!(result, Err(ToolError::InvalidArgs(_))));
    }

    #[test]
    fn schema_requires_location() {
        let tool = WeatherTool::new("test-key");
        let schema = tool.parameters();
        assert_eq!(schema["required"][0], "location");
        assert_eq!(tool.name(), "displayWeather");
    }
}
