pub mod prompts;
pub mod task_result;
pub mod tool_definitions;
pub mod tool_dispatch;
pub mod tools;
pub mod transcript;
pub mod ui_writer;
pub mod utils;
pub mod window_dedup;

pub use task_result::{TaskFailure, TaskOutcome};
pub use tool_dispatch::{ToolDispatcher, ToolKind, ToolOutput};
pub use tools::ToolSettings;
pub use transcript::Transcript;
pub use ui_writer::{NullUiWriter, UiWriter};

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

use deskhand_computer_control::{AbortSignal, ComputerController};
use deskhand_config::Config;
use deskhand_execution::CommandExecutor;
use deskhand_providers::{AnthropicProvider, CompletionRequest, LLMProvider, StopReason, Tool};

use crate::prompts::SYSTEM_PROMPT;
use crate::tool_definitions::create_tool_definitions;

/// Runs tasks against a decision-maker, one at a time, over a persistent transcript.
///
/// The agent never reads the pointer itself. It only observes the shared
/// [`AbortSignal`] through the dispatcher, which the fail-safe monitor sets.
pub struct Agent<W: UiWriter> {
    provider: Box<dyn LLMProvider>,
    dispatcher: ToolDispatcher,
    abort: Arc<AbortSignal>,
    transcript: Transcript,
    tools: Vec<Tool>,
    system_prompt: String,
    max_turns: u32,
    ui_writer: W,
}

impl<W: UiWriter> Agent<W> {
    pub fn new(
        config: &Config,
        provider: Box<dyn LLMProvider>,
        controller: Box<dyn ComputerController>,
        abort: Arc<AbortSignal>,
        ui_writer: W,
    ) -> Result<Self> {
        config.validate()?;

        let tools = create_tool_definitions();
        let shell = CommandExecutor::new(Duration::from_secs(config.shell.timeout_seconds));
        let dispatcher = ToolDispatcher::new(
            controller,
            abort.clone(),
            shell,
            ToolSettings::from_config(config),
            &tools,
        )?;

        let system_prompt = config
            .agent
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

        debug!(
            "Agent ready: provider={} model={} max_turns={}",
            provider.name(),
            provider.model(),
            config.agent.max_turns
        );

        Ok(Self {
            provider,
            dispatcher,
            abort,
            transcript: Transcript::new(),
            tools,
            system_prompt,
            max_turns: config.agent.max_turns,
            ui_writer,
        })
    }

    /// Run one task to a terminal state.
    ///
    /// The UI writer's `on_task_finished` fires exactly once per call,
    /// whichever state the task ends in.
    pub async fn run(&mut self, task: &str) -> TaskOutcome {
        let span = info_span!("task", id = %uuid::Uuid::new_v4());
        let outcome = self.run_task(task).instrument(span.clone()).await;

        span.in_scope(|| match &outcome {
            TaskOutcome::Done { turns, .. } => info!("Task done after {} turn(s)", turns),
            TaskOutcome::Aborted { turn } => warn!("Task aborted by fail-safe on turn {}", turn),
            TaskOutcome::Exhausted { max_turns } => {
                warn!("Task stopped after reaching {} turns", max_turns)
            }
            TaskOutcome::Failed(failure) => error!("Task failed: {}", failure),
        });

        self.ui_writer.on_task_finished(&outcome);
        self.ui_writer.flush();
        outcome
    }

    async fn run_task(&mut self, task: &str) -> TaskOutcome {
        // A stale abort from the previous task must not leak into this one.
        self.abort.clear();
        self.transcript.push_user_text(task);

        for turn in 1..=self.max_turns {
            debug!("Turn {}/{}", turn, self.max_turns);

            let request = CompletionRequest {
                system: Some(self.system_prompt.clone()),
                messages: self.transcript.messages().to_vec(),
                tools: self.tools.clone(),
                max_tokens: Some(self.provider.max_tokens()),
                temperature: None,
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => return TaskOutcome::Failed(TaskFailure::Transport(format!("{:#}", e))),
            };
            debug!(
                "Response: stop_reason={} tokens={}",
                response.stop_reason, response.usage.total_tokens
            );

            let text = response.text();
            let calls = response.tool_calls();

            match response.stop_reason {
                StopReason::EndTurn => {
                    self.transcript.push_assistant(response.content);
                    return TaskOutcome::Done { text, turns: turn };
                }
                StopReason::ToolUse if calls.is_empty() => {
                    return TaskOutcome::Failed(TaskFailure::MalformedResponse(
                        "tool_use response carried no tool calls".to_string(),
                    ));
                }
                StopReason::ToolUse => {
                    self.transcript.push_assistant(response.content);
                    if !text.is_empty() {
                        self.ui_writer.print_agent_response(&text);
                    }

                    let mut results = Vec::with_capacity(calls.len());
                    for call in calls {
                        self.ui_writer
                            .print_tool_description(&ToolDispatcher::describe(&call.tool, &call.args));

                        match self.dispatcher.execute(&call.tool, &call.args).await {
                            Ok(output) => results.push((call.id, output.into_result_content())),
                            Err(_) => return TaskOutcome::Aborted { turn },
                        }
                    }
                    self.transcript.push_tool_results(results);
                }
                other => {
                    return TaskOutcome::Failed(TaskFailure::UnexpectedStopReason(
                        other.as_str().to_string(),
                    ));
                }
            }
        }

        TaskOutcome::Exhausted {
            max_turns: self.max_turns,
        }
    }

    /// Forget the conversation so the next task starts a new chat.
    pub fn reset(&mut self) {
        debug!("Transcript reset");
        self.transcript.reset();
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn abort_signal(&self) -> &Arc<AbortSignal> {
        &self.abort
    }

    pub fn ui_writer(&self) -> &W {
        &self.ui_writer
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }
}

/// Build the configured decision-maker.
pub fn build_provider(config: &Config) -> Result<Box<dyn LLMProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow!(
            "No API key configured. Set {} or provider.api_key in the config file.",
            deskhand_config::API_KEY_ENV
        )
    })?;

    let provider = AnthropicProvider::new(
        api_key,
        Some(config.provider.model.clone()),
        Some(config.provider.max_tokens),
        config.provider.temperature,
        config.provider.base_url.clone(),
        Duration::from_secs(config.provider.timeout_seconds),
    )?;
    Ok(Box::new(provider))
}
