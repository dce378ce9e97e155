//! Reasoning loop tests driven by MockProvider and a recording controller.

mod common;

use std::sync::Arc;

use common::{create_agent, fast_config, RecordingController, RecordingUiWriter, FAKE_PNG};
use deskhand_computer_control::AbortSignal;
use deskhand_core::transcript::NOT_EXECUTED;
use deskhand_core::{Agent, TaskFailure, TaskOutcome};
use deskhand_providers::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, MessageRole, MockProvider,
    MockResponse, StopReason, ToolResultContent,
};
use serde_json::json;

fn click(x: i64, y: i64) -> (&'static str, serde_json::Value) {
    ("click", json!({"x": x, "y": y}))
}

#[tokio::test]
async fn test_empty_terminal_text_is_done_after_one_turn() {
    let provider = MockProvider::new().with_default_response(MockResponse::empty());
    let requests = provider.request_log();
    let controller = RecordingController::new();
    let (mut agent, ui) = create_agent(
        &fast_config(25),
        provider,
        controller.clone(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("do nothing").await;

    assert_eq!(
        outcome,
        TaskOutcome::Done {
            text: String::new(),
            turns: 1
        }
    );
    assert_eq!(outcome.message(), None);
    assert_eq!(requests.lock().unwrap().len(), 1);
    assert!(controller.actions().is_empty());
    assert!(ui.descriptions().is_empty());
    assert_eq!(ui.finished(), vec![outcome]);
}

#[tokio::test]
async fn test_terminal_text_is_reported() {
    let provider = MockProvider::new().with_response(MockResponse::text("The editor is open."));
    let (mut agent, ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("open the editor").await;

    assert_eq!(outcome.message().as_deref(), Some("The editor is open."));
    assert_eq!(ui.finished().len(), 1);
    let last = agent.transcript().last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_always_tool_calls_exhausts_turn_budget() {
    let provider = MockProvider::new()
        .with_default_response(MockResponse::tool_call("move_mouse", json!({"x": 100, "y": 200})));
    let requests = provider.request_log();
    let controller = RecordingController::new();
    let (mut agent, ui) = create_agent(
        &fast_config(3),
        provider,
        controller.clone(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("keep moving").await;

    assert_eq!(outcome, TaskOutcome::Exhausted { max_turns: 3 });
    assert_eq!(requests.lock().unwrap().len(), 3);
    assert_eq!(controller.actions(), vec!["move 100 200"; 3]);
    // user, then (assistant, results) per turn
    assert_eq!(agent.transcript().len(), 7);
    assert_eq!(ui.finished().len(), 1);
}

#[tokio::test]
async fn test_batch_results_share_one_turn_in_order() {
    let batch = MockResponse::text_then_tools(
        "Clicking three buttons.",
        vec![click(10, 10), click(20, 20), click(30, 30)],
    );
    let provider = MockProvider::new().with_responses(vec![batch, MockResponse::text("Done")]);
    let controller = RecordingController::new();
    let (mut agent, ui) = create_agent(
        &fast_config(25),
        provider,
        controller.clone(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("click the buttons").await;
    assert_eq!(
        outcome,
        TaskOutcome::Done {
            text: "Done".to_string(),
            turns: 2
        }
    );

    let messages = agent.transcript().messages();
    assert_eq!(messages.len(), 4);

    let call_ids: Vec<String> = messages[1].tool_calls().into_iter().map(|c| c.id).collect();
    assert_eq!(call_ids.len(), 3);
    assert_eq!(messages[2].role, MessageRole::User);
    assert_eq!(messages[2].tool_result_ids(), call_ids);

    let texts: Vec<&str> = messages[2]
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                content: ToolResultContent::Text { text },
                ..
            } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        texts,
        vec!["Clicked at (10, 10)", "Clicked at (20, 20)", "Clicked at (30, 30)"]
    );

    assert_eq!(ui.responses(), vec!["Clicking three buttons."]);
    assert_eq!(
        ui.descriptions(),
        vec![
            "Clicking at (10, 10)",
            "Clicking at (20, 20)",
            "Clicking at (30, 30)"
        ]
    );
}

#[tokio::test]
async fn test_abort_mid_batch_skips_remaining_calls() {
    let abort = Arc::new(AbortSignal::new());
    let batch = MockResponse::tool_calls(vec![click(10, 10), click(20, 20), click(30, 30)]);
    let provider = MockProvider::new().with_responses(vec![batch, MockResponse::text("unused")]);
    let requests = provider.request_log();
    // The third action is the pointer move of the second click.
    let controller = RecordingController::new().abort_on_action(3, abort.clone());
    let (mut agent, ui) = create_agent(&fast_config(25), provider, controller.clone(), abort);

    let outcome = agent.run("click the buttons").await;

    assert_eq!(outcome, TaskOutcome::Aborted { turn: 1 });
    assert_eq!(
        controller.actions(),
        vec!["move 10 10", "click Left x1", "move 20 20"]
    );
    assert_eq!(ui.descriptions().len(), 2);
    assert_eq!(requests.lock().unwrap().len(), 1);

    // No tool-result turn for the aborted batch
    assert_eq!(agent.transcript().len(), 2);
    assert_eq!(
        agent.transcript().last().unwrap().role,
        MessageRole::Assistant
    );
    assert_eq!(ui.finished(), vec![TaskOutcome::Aborted { turn: 1 }]);
}

/// Fires the fail-safe while the decision-maker is thinking.
struct AbortingProvider {
    inner: MockProvider,
    abort: Arc<AbortSignal>,
}

#[async_trait::async_trait]
impl LLMProvider for AbortingProvider {
    async fn complete(&self, request: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        self.abort.set();
        self.inner.complete(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn max_tokens(&self) -> u32 {
        self.inner.max_tokens()
    }
}

#[tokio::test]
async fn test_abort_during_completion_runs_nothing() {
    let abort = Arc::new(AbortSignal::new());
    let provider = AbortingProvider {
        inner: MockProvider::new()
            .with_response(MockResponse::tool_calls(vec![click(1, 1), click(2, 2)])),
        abort: abort.clone(),
    };
    let controller = RecordingController::new();
    let ui = RecordingUiWriter::new();
    let mut agent = Agent::new(
        &fast_config(25),
        Box::new(provider),
        Box::new(controller.clone()),
        abort,
        ui.clone(),
    )
    .unwrap();

    let outcome = agent.run("click").await;

    assert_eq!(outcome, TaskOutcome::Aborted { turn: 1 });
    assert!(controller.actions().is_empty());
    assert_eq!(ui.finished().len(), 1);
}

#[tokio::test]
async fn test_next_task_answers_dangling_calls() {
    let abort = Arc::new(AbortSignal::new());
    let batch = MockResponse::tool_calls(vec![click(10, 10), click(20, 20)]);
    let provider =
        MockProvider::new().with_responses(vec![batch, MockResponse::text("Resumed")]);
    let requests = provider.request_log();
    let controller = RecordingController::new().abort_on_action(1, abort.clone());
    let (mut agent, ui) = create_agent(&fast_config(25), provider, controller, abort.clone());

    assert_eq!(
        agent.run("first").await,
        TaskOutcome::Aborted { turn: 1 }
    );
    let dangling: Vec<String> = agent
        .transcript()
        .last()
        .unwrap()
        .tool_calls()
        .into_iter()
        .map(|c| c.id)
        .collect();

    let outcome = agent.run("second").await;
    assert!(outcome.is_success(), "{:?}", outcome);
    assert!(!abort.is_set());

    let requests = requests.lock().unwrap();
    let sent = requests[1].messages.last().unwrap();
    assert_eq!(sent.role, MessageRole::User);
    assert_eq!(sent.tool_result_ids(), dangling);
    assert!(sent.content.iter().any(|block| matches!(
        block,
        ContentBlock::ToolResult { content: ToolResultContent::Text { text }, .. } if text == NOT_EXECUTED
    )));
    assert_eq!(ui.finished().len(), 2);
}

#[tokio::test]
async fn test_transport_error_fails_task() {
    let provider = MockProvider::new().with_response(MockResponse::error("connection reset"));
    let (mut agent, ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("anything").await;

    assert_eq!(
        outcome,
        TaskOutcome::Failed(TaskFailure::Transport("connection reset".to_string()))
    );
    assert_eq!(
        outcome.message().as_deref(),
        Some("Agent error: connection reset")
    );
    assert_eq!(ui.finished().len(), 1);
}

#[tokio::test]
async fn test_unexpected_stop_reason_fails_task() {
    let provider = MockProvider::new()
        .with_response(MockResponse::text("cut off").with_stop_reason(StopReason::MaxTokens));
    let (mut agent, _ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    assert_eq!(
        agent.run("anything").await,
        TaskOutcome::Failed(TaskFailure::UnexpectedStopReason(
            "max_tokens".to_string()
        ))
    );
}

#[tokio::test]
async fn test_tool_use_without_calls_is_malformed() {
    let provider = MockProvider::new()
        .with_response(MockResponse::empty().with_stop_reason(StopReason::ToolUse));
    let (mut agent, _ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("anything").await;
    assert!(matches!(
        outcome,
        TaskOutcome::Failed(TaskFailure::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_tool_failures_become_results_and_loop_continues() {
    let provider = MockProvider::new().with_responses(vec![
        MockResponse::tool_calls(vec![
            ("teleport", json!({})),
            ("click", json!({"x": 5})),
        ]),
        MockResponse::text("Gave up"),
    ]);
    let controller = RecordingController::new();
    let (mut agent, _ui) = create_agent(
        &fast_config(25),
        provider,
        controller.clone(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("try things").await;
    assert_eq!(
        outcome,
        TaskOutcome::Done {
            text: "Gave up".to_string(),
            turns: 2
        }
    );
    assert!(controller.actions().is_empty());

    let results = &agent.transcript().messages()[2];
    let texts: Vec<&str> = results
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                content: ToolResultContent::Text { text },
                ..
            } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        texts,
        vec![
            "❓ Unknown tool: teleport",
            "❌ Missing required argument(s) for click: y"
        ]
    );
}

#[tokio::test]
async fn test_screenshot_result_is_an_image() {
    let provider = MockProvider::new().with_responses(vec![
        MockResponse::tool_calls(vec![
            ("take_screenshot", json!({})),
            ("get_screen_size", json!({})),
        ]),
        MockResponse::text("Seen"),
    ]);
    let (mut agent, _ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    agent.run("look").await;

    let results = &agent.transcript().messages()[2].content;
    assert_eq!(results.len(), 2);
    match &results[0] {
        ContentBlock::ToolResult {
            content: ToolResultContent::Image { image },
            ..
        } => {
            use base64::Engine;
            assert_eq!(image.media_type, "image/png");
            assert_eq!(
                base64::engine::general_purpose::STANDARD
                    .decode(&image.data)
                    .unwrap(),
                FAKE_PNG
            );
        }
        other => panic!("expected image result, got {:?}", other),
    }
    match &results[1] {
        ContentBlock::ToolResult {
            content: ToolResultContent::Text { text },
            ..
        } => {
            let size: serde_json::Value = serde_json::from_str(text).unwrap();
            assert_eq!(size, json!({"width": 1920, "height": 1080}));
        }
        other => panic!("expected text result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reset_starts_new_chat() {
    let provider = MockProvider::new().with_default_response(MockResponse::text("ok"));
    let (mut agent, _ui) = create_agent(
        &fast_config(25),
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    agent.run("one").await;
    agent.run("two").await;
    assert_eq!(agent.transcript().len(), 4);

    agent.reset();
    assert!(agent.transcript().is_empty());
    agent.run("three").await;
    assert_eq!(agent.transcript().len(), 2);
}

#[tokio::test]
async fn test_negative_wait_limit_is_rejected_before_any_task() {
    let mut config = fast_config(5);
    config.computer_control.max_wait_seconds = -1.0;

    let result = Agent::new(
        &config,
        Box::new(MockProvider::new()),
        Box::new(RecordingController::new()),
        Arc::new(AbortSignal::new()),
        RecordingUiWriter::new(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_zero_wait_limit_still_finishes_once() {
    let mut config = fast_config(5);
    config.computer_control.max_wait_seconds = 0.0;
    let provider = MockProvider::new().with_responses(vec![
        MockResponse::tool_call("wait", json!({"seconds": 1})),
        MockResponse::text("Waited."),
    ]);
    let (mut agent, ui) = create_agent(
        &config,
        provider,
        RecordingController::new(),
        Arc::new(AbortSignal::new()),
    );

    let outcome = agent.run("wait").await;

    assert_eq!(
        outcome,
        TaskOutcome::Done {
            text: "Waited.".to_string(),
            turns: 2
        }
    );
    assert_eq!(ui.finished(), vec![outcome]);
}
