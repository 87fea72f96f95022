//! `ImageTool`: builds image generation URLs.
//!
//! No network traffic happens here; the tool returns URLs that the image
//! endpoint resolves lazily when the renderer requests them.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolError};

const DEFAULT_ENDPOINT: &str = "https://localhost/api/image";
const MIN_PROMPT_LEN: usize = 5;
const MAX_IMAGES: u32 = 10;

/// Generates one or more image URLs for a prompt.
#[derive(Debug, Clone)]
pub struct ImageTool {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ImageArgs {
    prompt: String,
    #[serde(default = "default_count")]
    n: u32,
    #[serde(default = "default_size")]
    size: String,
}

fn default_count() -> u32 {
    1
}

fn default_size() -> String {
    "512x512".to_string()
}

impl ImageTool {
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn parse_size(size: &str) -> Option<(u32, u32)> {
        let (w, h) = size.split_once('x')?;
        Some((w.parse().ok()?, h.parse().ok()?))
    }

    fn seed() -> u128 {
        uuid::Uuid::new_v4().as_u128() % 1000
    }
}

impl Default for ImageTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ImageTool {
    fn name(&self) -> &'static str {
        "ImageTool"
    }

    fn description(&self) -> &'static str {
        "Generate one or more images based on a given prompt"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "A detailed prompt for image generation"
                },
                "n": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_IMAGES,
                    "default": 1,
                    "description": "Number of images to generate"
                },
                "size": {
                    "type": "string",
                    "enum": ["256x256", "512x512", "1024x1024"],
                    "default": "512x512",
                    "description": "Size of the generated image"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ImageArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if args.prompt.trim().len() < MIN_PROMPT_LEN {
            return Err(ToolError::InvalidArgs(format!(
                "Prompt should be descriptive (at least {MIN_PROMPT_LEN} characters)"
            )));
        }
        if args.n < 1 || args.n > MAX_IMAGES {
            return Err(ToolError::InvalidArgs(format!(
                "n must be between 1 and {MAX_IMAGES}"
            )));
        }
        let (width, height) = Self::parse_size(&args.size).ok_or_else(|| {
            ToolError::InvalidArgs(format!("unsupported image size: {}", args.size))
        })?;

        let mut image_urls = Vec::with_capacity(args.n as usize);
        for _ in 0..args.n {
            let url = reqwest::Url::parse_with_params(
                &self.endpoint,
                &[
                    ("prompt", args.prompt.as_str()),
                    ("seed", &Self::seed().to_string()),
                    ("width", &width.to_string()),
                    ("height", &height.to_string()),
                    ("model", "dall-e-2"),
                ],
            )
            .map_err(|e| ToolError::Execution(format!("invalid image endpoint: {e}")))?;
            image_urls.push(url.to_string());
        }

        Ok(json!({
            "prompt": args.prompt,
            "message": "Images generated successfully",
            "imageUrls": image_urls,
        }))
    }
}
