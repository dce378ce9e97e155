//! Conversation transcript owned by one agent.
//!
//! Turns alternate user/assistant. A tool-result turn always answers the tool
//! calls of the assistant turn right before it. When a task ends with calls
//! left unanswered (abort), the next user message carries "not executed"
//! results for them so the alternation never breaks.

use deskhand_providers::{ContentBlock, Message, MessageRole, ToolResultContent};
use tracing::debug;

pub const NOT_EXECUTED: &str = "Not executed: the task was stopped before this tool ran.";

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Start a new chat.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Append a user text message, answering dangling tool calls or merging
    /// into a trailing user turn as needed.
    pub fn push_user_text(&mut self, text: &str) {
        let text_block = ContentBlock::Text {
            text: text.to_string(),
        };

        match self.messages.last_mut() {
            Some(last) if last.role == MessageRole::User => {
                debug!("Merging user message into trailing user turn");
                last.content.push(text_block);
            }
            Some(last) if last.role == MessageRole::Assistant => {
                let mut content: Vec<ContentBlock> = last
                    .tool_calls()
                    .into_iter()
                    .map(|call| ContentBlock::ToolResult {
                        tool_use_id: call.id,
                        content: ToolResultContent::Text {
                            text: NOT_EXECUTED.to_string(),
                        },
                    })
                    .collect();
                if !content.is_empty() {
                    debug!("Answering {} dangling tool call(s)", content.len());
                }
                content.push(text_block);
                self.messages.push(Message::new(MessageRole::User, content));
            }
            _ => self.messages.push(Message::user_text(text)),
        }
    }

    /// Append an assistant turn. Empty content is not recorded.
    pub fn push_assistant(&mut self, content: Vec<ContentBlock>) -> bool {
        if content.is_empty() {
            return false;
        }
        self.messages.push(Message::assistant(content));
        true
    }

    /// Append the combined results of one tool batch as a single user turn.
    pub fn push_tool_results(&mut self, results: Vec<(String, ToolResultContent)>) {
        let content = results
            .into_iter()
            .map(|(tool_use_id, content)| ContentBlock::ToolResult {
                tool_use_id,
                content,
            })
            .collect();
        self.messages.push(Message::new(MessageRole::User, content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_use(id: &str) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: "click".to_string(),
            input: json!({"x": 1, "y": 1}),
        }
    }

    fn assert_alternates(transcript: &Transcript) {
        for pair in transcript.messages().windows(2) {
            assert_ne!(pair[0].role, pair[1].role);
        }
    }

    #[test]
    fn test_first_message() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("open the editor");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, MessageRole::User);
    }

    #[test]
    fn test_dangling_calls_answered_with_new_message() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("task one");
        transcript.push_assistant(vec![tool_use("a"), tool_use("b")]);
        transcript.push_user_text("task two");

        assert_eq!(transcript.len(), 3);
        let last = transcript.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(last.tool_result_ids(), vec!["a", "b"]);
        assert_eq!(
            last.content.last(),
            Some(&ContentBlock::Text {
                text: "task two".to_string()
            })
        );
        assert_alternates(&transcript);
    }

    #[test]
    fn test_trailing_user_turn_is_merged() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("task one");
        assert!(!transcript.push_assistant(vec![]));
        transcript.push_user_text("task two");

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].content.len(), 2);
    }

    #[test]
    fn test_tool_results_follow_assistant() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("go");
        transcript.push_assistant(vec![tool_use("a")]);
        transcript.push_tool_results(vec![(
            "a".to_string(),
            ToolResultContent::Text {
                text: "Clicked at (1, 1)".to_string(),
            },
        )]);
        transcript.push_assistant(vec![ContentBlock::Text {
            text: "done".to_string(),
        }]);
        transcript.push_user_text("next");

        assert_eq!(transcript.len(), 5);
        assert!(!transcript.last().unwrap().has_tool_results());
        assert_alternates(&transcript);
    }

    #[test]
    fn test_reset() {
        let mut transcript = Transcript::new();
        transcript.push_user_text("go");
        transcript.reset();
        assert!(transcript.is_empty());
    }
}
