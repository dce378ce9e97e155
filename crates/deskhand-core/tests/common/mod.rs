//! Shared fakes for agent integration tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use deskhand_computer_control::{
    AbortSignal, ComputerController, MouseButton, Point, PointerProbe, ScreenSize, WindowInfo,
};
use deskhand_config::Config;
use deskhand_core::{Agent, TaskOutcome, UiWriter};
use deskhand_providers::MockProvider;

/// 1x1 PNG signature plus padding; only the magic bytes matter to the tools.
pub const FAKE_PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

#[derive(Default)]
struct ControllerState {
    actions: Vec<String>,
    windows: Vec<WindowInfo>,
    failing_closes: HashSet<u64>,
    failing_screenshot: bool,
    /// Set the abort signal while performing the Nth action (1-based).
    abort_on_action: Option<(usize, Arc<AbortSignal>)>,
}

/// A controller that records every physical action instead of performing it.
#[derive(Clone, Default)]
pub struct RecordingController {
    state: Arc<Mutex<ControllerState>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_windows(self, titles: &[&str]) -> Self {
        self.state.lock().unwrap().windows = titles
            .iter()
            .enumerate()
            .map(|(i, title)| WindowInfo {
                id: i as u64 + 1,
                title: title.to_string(),
            })
            .collect();
        self
    }

    pub fn failing_close(self, id: u64) -> Self {
        self.state.lock().unwrap().failing_closes.insert(id);
        self
    }

    pub fn failing_screenshot(self) -> Self {
        self.state.lock().unwrap().failing_screenshot = true;
        self
    }

    /// Simulates the user hitting a corner while the Nth action runs.
    pub fn abort_on_action(self, n: usize, signal: Arc<AbortSignal>) -> Self {
        self.state.lock().unwrap().abort_on_action = Some((n, signal));
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    fn record(&self, action: String) {
        let mut state = self.state.lock().unwrap();
        state.actions.push(action);
        let count = state.actions.len();
        if let Some((n, signal)) = &state.abort_on_action {
            if *n == count {
                signal.set();
            }
        }
    }
}

#[async_trait]
impl PointerProbe for RecordingController {
    async fn screen_size(&self) -> Result<ScreenSize> {
        Ok(ScreenSize {
            width: 1920,
            height: 1080,
        })
    }

    async fn pointer_position(&self) -> Result<Point> {
        Ok(Point::new(960, 540))
    }
}

#[async_trait]
impl ComputerController for RecordingController {
    async fn move_pointer(&self, to: Point) -> Result<()> {
        self.record(format!("move {} {}", to.x, to.y));
        Ok(())
    }

    async fn click(&self, button: MouseButton, count: u32) -> Result<()> {
        self.record(format!("click {:?} x{}", button, count));
        Ok(())
    }

    async fn scroll(&self, clicks: i32) -> Result<()> {
        self.record(format!("scroll {}", clicks));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.record(format!("type {}", text));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.record(format!("key {}", key));
        Ok(())
    }

    async fn hotkey(&self, keys: &[String]) -> Result<()> {
        self.record(format!("hotkey {}", keys.join("+")));
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        if self.state.lock().unwrap().failing_screenshot {
            bail!("display connection lost");
        }
        Ok(FAKE_PNG.to_vec())
    }

    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    async fn focus_window(&self, id: u64) -> Result<()> {
        self.record(format!("focus {}", id));
        Ok(())
    }

    async fn close_window(&self, id: u64) -> Result<()> {
        let fails = self.state.lock().unwrap().failing_closes.contains(&id);
        if fails {
            bail!("window {} refused to close", id);
        }
        self.record(format!("close {}", id));
        self.state.lock().unwrap().windows.retain(|w| w.id != id);
        Ok(())
    }
}

#[derive(Default)]
struct UiLog {
    descriptions: Vec<String>,
    responses: Vec<String>,
    finished: Vec<TaskOutcome>,
}

/// Records what the agent reports, for assertions.
#[derive(Clone, Default)]
pub struct RecordingUiWriter {
    log: Arc<Mutex<UiLog>>,
}

impl RecordingUiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.log.lock().unwrap().descriptions.clone()
    }

    pub fn responses(&self) -> Vec<String> {
        self.log.lock().unwrap().responses.clone()
    }

    pub fn finished(&self) -> Vec<TaskOutcome> {
        self.log.lock().unwrap().finished.clone()
    }
}

impl UiWriter for RecordingUiWriter {
    fn print_tool_description(&self, description: &str) {
        self.log
            .lock()
            .unwrap()
            .descriptions
            .push(description.to_string());
    }

    fn print_agent_response(&self, content: &str) {
        self.log.lock().unwrap().responses.push(content.to_string());
    }

    fn on_task_finished(&self, outcome: &TaskOutcome) {
        self.log.lock().unwrap().finished.push(outcome.clone());
    }

    fn flush(&self) {}
}

/// Config with every delay zeroed so tests run instantly.
pub fn fast_config(max_turns: u32) -> Config {
    let mut config = Config::default();
    config.agent.max_turns = max_turns;
    config.computer_control.post_action_pause_ms = 0;
    config.computer_control.focus_settle_ms = 0;
    config.computer_control.close_settle_ms = 0;
    config
}

pub fn create_agent(
    config: &Config,
    provider: MockProvider,
    controller: RecordingController,
    abort: Arc<AbortSignal>,
) -> (Agent<RecordingUiWriter>, RecordingUiWriter) {
    let ui = RecordingUiWriter::new();
    let agent = Agent::new(
        config,
        Box::new(provider),
        Box::new(controller),
        abort,
        ui.clone(),
    )
    .expect("agent should build");
    (agent, ui)
}
