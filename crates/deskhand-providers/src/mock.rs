//! Mock LLM Provider for Testing
//!
//! A scripted provider that returns queued responses in order and records
//! every request it receives, so tests can drive the reasoning loop without
//! a real model.
//!
//! # Example
//!
//! ```rust,ignore
//! use deskhand_providers::mock::{MockProvider, MockResponse};
//!
//! let provider = MockProvider::new().with_responses(vec![
//!     MockResponse::tool_call("click", json!({"x": 10, "y": 20})),
//!     MockResponse::text("Done!"),
//! ]);
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, StopReason, Usage,
};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Global counter for generating unique tool call IDs
static TOOL_CALL_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_tool_call_id() -> String {
    format!(
        "toolu_mock_{}",
        TOOL_CALL_COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

/// A mock response that can be configured for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    /// When set, `complete` fails with this message instead of answering
    pub error: Option<String>,
}

impl MockResponse {
    /// Terminal text response
    pub fn text(content: &str) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.to_string(),
            }],
            stop_reason: StopReason::EndTurn,
            error: None,
        }
    }

    /// Terminal response with no content at all
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            stop_reason: StopReason::EndTurn,
            error: None,
        }
    }

    /// Response requesting a single tool call
    pub fn tool_call(tool: &str, args: serde_json::Value) -> Self {
        Self::tool_calls(vec![(tool, args)])
    }

    /// Response requesting several tool calls in one batch
    pub fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> Self {
        Self {
            content: calls
                .into_iter()
                .map(|(tool, args)| ContentBlock::ToolUse {
                    id: next_tool_call_id(),
                    name: tool.to_string(),
                    input: args,
                })
                .collect(),
            stop_reason: StopReason::ToolUse,
            error: None,
        }
    }

    /// Text followed by tool calls, as models commonly answer
    pub fn text_then_tools(text: &str, calls: Vec<(&str, serde_json::Value)>) -> Self {
        let mut response = Self::tool_calls(calls);
        response.content.insert(
            0,
            ContentBlock::Text {
                text: text.to_string(),
            },
        );
        response
    }

    /// A transport failure
    pub fn error(message: &str) -> Self {
        Self {
            content: Vec::new(),
            stop_reason: StopReason::EndTurn,
            error: Some(message.to_string()),
        }
    }

    /// Builder: override the stop reason
    pub fn with_stop_reason(mut self, stop_reason: StopReason) -> Self {
        self.stop_reason = stop_reason;
        self
    }
}

/// A mock LLM provider for testing
///
/// The provider maintains a queue of responses that are returned in order.
/// It also tracks all requests made for verification in tests.
pub struct MockProvider {
    name: String,
    model: String,
    max_tokens: u32,
    /// Queue of responses to return (FIFO)
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// All requests received (for verification)
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Default response when queue is empty
    default_response: Option<MockResponse>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            max_tokens: 1024,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Add a response to the queue
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Add multiple responses to the queue
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.responses.lock().unwrap().extend(responses);
        self
    }

    /// Set a default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get all requests that were made to this provider
    pub fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the number of requests made
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Shared view of the request log, usable after the provider has been moved
    pub fn request_log(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(response) => response,
            None => self
                .default_response
                .clone()
                .unwrap_or_else(|| MockResponse::text("Mock response (no responses configured)")),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);

        let response = self.next_response();
        if let Some(message) = response.error {
            anyhow::bail!("{}", message);
        }

        // Fresh ids for default responses replayed more than once
        let content = response
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::ToolUse { name, input, .. } if self.default_response.is_some() => {
                    ContentBlock::ToolUse {
                        id: next_tool_call_id(),
                        name,
                        input,
                    }
                }
                other => other,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            stop_reason: response.stop_reason,
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use serde_json::json;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            system: None,
            messages: vec![Message::user_text(text)],
            tools: vec![],
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_mock_provider_multi_turn() {
        let provider = MockProvider::new().with_responses(vec![
            MockResponse::tool_call("wait", json!({"seconds": 1})),
            MockResponse::text("All done"),
        ]);

        let first = provider.complete(request("go")).await.unwrap();
        assert_eq!(first.stop_reason, StopReason::ToolUse);
        assert_eq!(first.tool_calls()[0].tool, "wait");

        let second = provider.complete(request("go")).await.unwrap();
        assert_eq!(second.stop_reason, StopReason::EndTurn);
        assert_eq!(second.text(), "All done");
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_provider_error_response() {
        let provider = MockProvider::new().with_response(MockResponse::error("connection reset"));
        let err = provider.complete(request("go")).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_default_response_gets_fresh_tool_ids() {
        let provider = MockProvider::new()
            .with_default_response(MockResponse::tool_call("wait", json!({"seconds": 0})));

        let first = provider.complete(request("a")).await.unwrap();
        let second = provider.complete(request("b")).await.unwrap();
        assert_ne!(first.tool_calls()[0].id, second.tool_calls()[0].id);
    }

    #[tokio::test]
    async fn test_batch_ids_are_unique() {
        let response = MockResponse::tool_calls(vec![
            ("click", json!({"x": 1, "y": 1})),
            ("click", json!({"x": 2, "y": 2})),
        ]);
        let ids: Vec<_> = response
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
