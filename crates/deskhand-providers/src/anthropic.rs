//! Anthropic Messages API provider.
//!
//! Only the non-streaming `/v1/messages` call is used: the reasoning loop needs
//! the complete response (stop reason plus every content block) before it can
//! decide whether to run tools.
//!
//! Tool results are packaged the way the API expects them:
//! - text results become `{"type": "tool_result", "tool_use_id", "content": "<text>"}`
//! - image results become `{"type": "tool_result", "tool_use_id", "content": [{"type": "image", "source": {"type": "base64", ...}}]}`

use anyhow::{anyhow, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, MessageRole,
    StopReason, Tool, ToolResultContent, Usage,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!(
                "Anthropic API key is missing. Set ANTHROPIC_API_KEY or provider.api_key in the config file."
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        debug!("Initialized Anthropic provider with model: {}", model);

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            max_tokens: max_tokens.unwrap_or(1024),
            temperature,
        })
    }

    fn create_request_builder(&self) -> RequestBuilder {
        self.client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    fn convert_tools(tools: &[Tool]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|tool| AnthropicTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect()
    }

    fn convert_block(block: &ContentBlock) -> AnthropicContent {
        match block {
            ContentBlock::Text { text } => AnthropicContent::Text { text: text.clone() },
            ContentBlock::ToolUse { id, name, input } => AnthropicContent::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                let content = match content {
                    ToolResultContent::Text { text } => {
                        AnthropicToolResultContent::Text(text.clone())
                    }
                    ToolResultContent::Image { image } => {
                        AnthropicToolResultContent::Blocks(vec![AnthropicImageBlock {
                            block_type: "image".to_string(),
                            source: AnthropicImageSource {
                                source_type: "base64".to_string(),
                                media_type: image.media_type.clone(),
                                data: image.data.clone(),
                            },
                        }])
                    }
                };
                AnthropicContent::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content,
                }
            }
        }
    }

    fn convert_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .map(|message| AnthropicMessage {
                role: match message.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                },
                content: message.content.iter().map(Self::convert_block).collect(),
            })
            .collect()
    }

    fn create_request_body(&self, request: &CompletionRequest) -> Result<AnthropicRequest> {
        let messages = Self::convert_messages(&request.messages);

        if messages.is_empty() {
            return Err(anyhow!("At least one user message is required"));
        }
        if messages[0].role != "user" {
            return Err(anyhow!("Conversation must start with a user message"));
        }

        Ok(AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.or(self.temperature),
            system: request.system.clone(),
            messages,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(&request.tools))
            },
        })
    }

    fn convert_response(response: AnthropicResponse) -> CompletionResponse {
        let content = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseContent::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicResponseContent::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicResponseContent::Unsupported => None,
            })
            .collect();

        let stop_reason = response
            .stop_reason
            .as_deref()
            .map(StopReason::from_api)
            .unwrap_or_else(|| StopReason::Other("missing".to_string()));

        CompletionResponse {
            content,
            stop_reason,
            usage: Usage {
                prompt_tokens: response.usage.input_tokens,
                completion_tokens: response.usage.output_tokens,
                total_tokens: response.usage.input_tokens + response.usage.output_tokens,
            },
            model: response.model,
        }
    }
}

#[async_trait::async_trait]
impl LLMProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            "Processing Anthropic completion request with {} messages",
            request.messages.len()
        );

        let request_body = self.create_request_body(&request)?;

        let response = self
            .create_request_builder()
            .json(&request_body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request to Anthropic API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Anthropic API error {}: {}", status, error_text));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;

        let completion = Self::convert_response(anthropic_response);

        debug!(
            "Anthropic completion: stop_reason={}, {} blocks, {} output tokens",
            completion.stop_reason,
            completion.content.len(),
            completion.usage.completion_tokens
        );

        Ok(completion)
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: AnthropicToolResultContent,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicToolResultContent {
    Text(String),
    Blocks(Vec<AnthropicImageBlock>),
}

#[derive(Debug, Serialize)]
struct AnthropicImageBlock {
    #[serde(rename = "type")]
    block_type: String,
    source: AnthropicImageSource,
}

#[derive(Debug, Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
