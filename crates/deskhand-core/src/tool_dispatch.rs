//! Tool dispatch module - routes tool calls to their implementations.
//!
//! The dispatcher owns the hardware controller and the shell runner, checks the
//! abort signal at entry, validates argument shape against the tool schema and
//! turns handler errors into text results. Only `Aborted` escapes.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use deskhand_computer_control::{AbortSignal, Aborted, ComputerController};
use deskhand_execution::CommandExecutor;
use deskhand_providers::{ImageContent, Tool, ToolResultContent};

use crate::tools::executor::{ToolContext, ToolSettings};
use crate::tools::{keyboard, misc, pointer, search, shell, windows};
use crate::utils::truncate_chars;

/// The closed set of tools the agent can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    TakeScreenshot,
    GetScreenSize,
    Click,
    DoubleClick,
    RightClick,
    MoveMouse,
    Scroll,
    TypeText,
    PressKey,
    Hotkey,
    RunCommand,
    ListWindows,
    CountWindows,
    FocusWindow,
    CloseDuplicateWindows,
    Wait,
    SearchWeb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Text,
    Image,
}

impl ToolKind {
    pub const ALL: [ToolKind; 17] = [
        ToolKind::TakeScreenshot,
        ToolKind::GetScreenSize,
        ToolKind::Click,
        ToolKind::DoubleClick,
        ToolKind::RightClick,
        ToolKind::MoveMouse,
        ToolKind::Scroll,
        ToolKind::TypeText,
        ToolKind::PressKey,
        ToolKind::Hotkey,
        ToolKind::RunCommand,
        ToolKind::ListWindows,
        ToolKind::CountWindows,
        ToolKind::FocusWindow,
        ToolKind::CloseDuplicateWindows,
        ToolKind::Wait,
        ToolKind::SearchWeb,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::TakeScreenshot => "take_screenshot",
            ToolKind::GetScreenSize => "get_screen_size",
            ToolKind::Click => "click",
            ToolKind::DoubleClick => "double_click",
            ToolKind::RightClick => "right_click",
            ToolKind::MoveMouse => "move_mouse",
            ToolKind::Scroll => "scroll",
            ToolKind::TypeText => "type_text",
            ToolKind::PressKey => "press_key",
            ToolKind::Hotkey => "hotkey",
            ToolKind::RunCommand => "run_command",
            ToolKind::ListWindows => "list_windows",
            ToolKind::CountWindows => "count_windows",
            ToolKind::FocusWindow => "focus_window",
            ToolKind::CloseDuplicateWindows => "close_duplicate_windows",
            ToolKind::Wait => "wait",
            ToolKind::SearchWeb => "search_web",
        }
    }

    /// Screenshots are the only image-producing tool.
    pub fn result_kind(self) -> ResultKind {
        match self {
            ToolKind::TakeScreenshot => ResultKind::Image,
            ToolKind::GetScreenSize
            | ToolKind::Click
            | ToolKind::DoubleClick
            | ToolKind::RightClick
            | ToolKind::MoveMouse
            | ToolKind::Scroll
            | ToolKind::TypeText
            | ToolKind::PressKey
            | ToolKind::Hotkey
            | ToolKind::RunCommand
            | ToolKind::ListWindows
            | ToolKind::CountWindows
            | ToolKind::FocusWindow
            | ToolKind::CloseDuplicateWindows
            | ToolKind::Wait
            | ToolKind::SearchWeb => ResultKind::Text,
        }
    }

    /// Tools that change the host or reach outside it.
    pub fn has_side_effects(self) -> bool {
        match self {
            ToolKind::Click
            | ToolKind::DoubleClick
            | ToolKind::RightClick
            | ToolKind::MoveMouse
            | ToolKind::Scroll
            | ToolKind::TypeText
            | ToolKind::PressKey
            | ToolKind::Hotkey
            | ToolKind::RunCommand
            | ToolKind::FocusWindow
            | ToolKind::CloseDuplicateWindows
            | ToolKind::SearchWeb => true,
            ToolKind::TakeScreenshot
            | ToolKind::GetScreenSize
            | ToolKind::ListWindows
            | ToolKind::CountWindows
            | ToolKind::Wait => false,
        }
    }
}

/// Shaped result of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Image(ImageContent),
}

impl ToolOutput {
    pub fn kind(&self) -> ResultKind {
        match self {
            ToolOutput::Text(_) => ResultKind::Text,
            ToolOutput::Image(_) => ResultKind::Image,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolOutput::Text(text) => Some(text),
            ToolOutput::Image(_) => None,
        }
    }

    pub fn into_result_content(self) -> ToolResultContent {
        match self {
            ToolOutput::Text(text) => ToolResultContent::Text { text },
            ToolOutput::Image(image) => ToolResultContent::Image { image },
        }
    }
}

pub struct ToolDispatcher {
    controller: Box<dyn ComputerController>,
    abort: Arc<AbortSignal>,
    shell: CommandExecutor,
    http: reqwest::Client,
    settings: ToolSettings,
    required_args: HashMap<ToolKind, Vec<String>>,
}

impl ToolDispatcher {
    pub fn new(
        controller: Box<dyn ComputerController>,
        abort: Arc<AbortSignal>,
        shell: CommandExecutor,
        settings: ToolSettings,
        tools: &[Tool],
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("deskhand/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let required_args = tools
            .iter()
            .filter_map(|tool| {
                let kind = ToolKind::from_name(&tool.name)?;
                let required = tool.required_args().into_iter().map(String::from).collect();
                Some((kind, required))
            })
            .collect();

        Ok(Self {
            controller,
            abort,
            shell,
            http,
            settings,
            required_args,
        })
    }

    pub fn abort_signal(&self) -> &Arc<AbortSignal> {
        &self.abort
    }

    /// Execute one tool call. Every failure except `Aborted` comes back as text.
    pub async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput, Aborted> {
        debug!("Dispatching tool: {}", name);

        let Some(kind) = ToolKind::from_name(name) else {
            warn!("Unknown tool: {}", name);
            return Ok(ToolOutput::Text(format!("❓ Unknown tool: {}", name)));
        };

        self.abort.check()?;

        if let Err(message) = self.validate_shape(kind, args) {
            debug!("Rejected {} call: {}", name, message);
            return Ok(ToolOutput::Text(format!("❌ {}", message)));
        }

        let ctx = ToolContext {
            controller: self.controller.as_ref(),
            abort: &self.abort,
            shell: &self.shell,
            http: &self.http,
            settings: &self.settings,
        };

        let result = match kind {
            ToolKind::TakeScreenshot => misc::execute_take_screenshot(args, &ctx)
                .await
                .map(ToolOutput::Image),
            ToolKind::GetScreenSize => misc::execute_get_screen_size(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::Click => pointer::execute_click(args, &ctx).await.map(ToolOutput::Text),
            ToolKind::DoubleClick => pointer::execute_double_click(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::RightClick => pointer::execute_right_click(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::MoveMouse => pointer::execute_move_mouse(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::Scroll => pointer::execute_scroll(args, &ctx).await.map(ToolOutput::Text),
            ToolKind::TypeText => keyboard::execute_type_text(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::PressKey => keyboard::execute_press_key(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::Hotkey => keyboard::execute_hotkey(args, &ctx).await.map(ToolOutput::Text),
            ToolKind::RunCommand => shell::execute_run_command(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::ListWindows => windows::execute_list_windows(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::CountWindows => windows::execute_count_windows(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::FocusWindow => windows::execute_focus_window(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::CloseDuplicateWindows => windows::execute_close_duplicate_windows(args, &ctx)
                .await
                .map(ToolOutput::Text),
            ToolKind::Wait => misc::execute_wait(args, &ctx).await.map(ToolOutput::Text),
            ToolKind::SearchWeb => search::execute_search_web(args, &ctx)
                .await
                .map(ToolOutput::Text),
        };

        match result {
            Ok(output) => {
                if kind.has_side_effects() {
                    self.abort.check()?;
                }
                debug_assert_eq!(output.kind(), kind.result_kind());
                Ok(output)
            }
            Err(e) => {
                if let Some(aborted) = e.downcast_ref::<Aborted>() {
                    return Err(*aborted);
                }
                warn!("Tool {} failed: {:#}", name, e);
                Ok(ToolOutput::Text(format!("❌ {:#}", e)))
            }
        }
    }

    fn validate_shape(&self, kind: ToolKind, args: &Value) -> Result<(), String> {
        let required = self.required_args.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let object = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            _ => return Err(format!("arguments for {} must be an object", kind.name())),
        };

        let missing: Vec<&str> = required
            .iter()
            .filter(|name| {
                object
                    .and_then(|map| map.get(name.as_str()))
                    .map_or(true, Value::is_null)
            })
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "Missing required argument(s) for {}: {}",
                kind.name(),
                missing.join(", ")
            ))
        }
    }

    /// One-line description of a call for display. Never fails.
    pub fn describe(name: &str, args: &Value) -> String {
        let field = |key: &str| display_arg(args.get(key));
        let text_field = |key: &str, max: usize| {
            truncate_chars(args.get(key).and_then(Value::as_str).unwrap_or(""), max)
        };

        let Some(kind) = ToolKind::from_name(name) else {
            return format!("Using tool: {}", name);
        };

        match kind {
            ToolKind::TakeScreenshot => "Taking screenshot…".to_string(),
            ToolKind::GetScreenSize => "Getting screen size…".to_string(),
            ToolKind::Click => format!("Clicking at ({}, {})", field("x"), field("y")),
            ToolKind::DoubleClick => {
                format!("Double-clicking at ({}, {})", field("x"), field("y"))
            }
            ToolKind::RightClick => format!("Right-clicking at ({}, {})", field("x"), field("y")),
            ToolKind::MoveMouse => format!("Moving mouse to ({}, {})", field("x"), field("y")),
            ToolKind::Scroll => {
                let clicks = match args.get("clicks") {
                    Some(v) if v.as_i64().is_some() => format!("{:+}", v.as_i64().unwrap_or(0)),
                    Some(v) => display_arg(Some(v)),
                    None => "+0".to_string(),
                };
                format!("Scrolling {} at ({}, {})", clicks, field("x"), field("y"))
            }
            ToolKind::TypeText => format!("Typing: {}", text_field("text", 40)),
            ToolKind::PressKey => format!("Pressing key: {}", field("key")),
            ToolKind::Hotkey => {
                let keys = keyboard::hotkey_keys(args).unwrap_or_default();
                format!("Hotkey: {}", keys.join("+"))
            }
            ToolKind::RunCommand => format!("Running: {}", text_field("command", 60)),
            ToolKind::ListWindows => {
                let filter = args
                    .get("title_filter")
                    .and_then(Value::as_str)
                    .unwrap_or("all");
                format!("Listing windows (filter: '{}')", filter)
            }
            ToolKind::CountWindows => format!("Counting windows: '{}'", text_field("title", 80)),
            ToolKind::FocusWindow => format!("Focusing window: '{}'", text_field("title", 80)),
            ToolKind::CloseDuplicateWindows => {
                format!("Closing duplicates of: '{}'", text_field("title", 80))
            }
            ToolKind::Wait => format!("Waiting {} s…", field("seconds")),
            ToolKind::SearchWeb => format!("Searching: {}", text_field("query", 60)),
        }
    }
}

fn display_arg(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "?".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_kind_is_image_only_for_screenshots() {
        for kind in ToolKind::ALL {
            let expected = if kind == ToolKind::TakeScreenshot {
                ResultKind::Image
            } else {
                ResultKind::Text
            };
            assert_eq!(kind.result_kind(), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_from_name_round_trips() {
        assert_eq!(ToolKind::from_name("close_duplicate_windows"), Some(ToolKind::CloseDuplicateWindows));
        assert_eq!(ToolKind::from_name("Click"), None);
        assert_eq!(ToolKind::from_name("rm_rf"), None);
    }

    #[test]
    fn test_describe_known_tools() {
        assert_eq!(
            ToolDispatcher::describe("click", &json!({"x": 10, "y": "20"})),
            "Clicking at (10, 20)"
        );
        assert_eq!(
            ToolDispatcher::describe("scroll", &json!({"x": 1, "y": 2, "clicks": 3})),
            "Scrolling +3 at (1, 2)"
        );
        assert_eq!(
            ToolDispatcher::describe("scroll", &json!({"x": 1, "y": 2, "clicks": -3})),
            "Scrolling -3 at (1, 2)"
        );
        assert_eq!(
            ToolDispatcher::describe("hotkey", &json!({"keys": ["ctrl", "c"]})),
            "Hotkey: ctrl+c"
        );
        assert_eq!(
            ToolDispatcher::describe("list_windows", &json!({})),
            "Listing windows (filter: 'all')"
        );
        let long = "x".repeat(100);
        assert_eq!(
            ToolDispatcher::describe("type_text", &json!({ "text": long })),
            format!("Typing: {}", "x".repeat(40))
        );
    }

    #[test]
    fn test_describe_never_fails() {
        assert_eq!(ToolDispatcher::describe("teleport", &json!({})), "Using tool: teleport");
        assert_eq!(ToolDispatcher::describe("click", &Value::Null), "Clicking at (?, ?)");
        assert_eq!(
            ToolDispatcher::describe("scroll", &json!({"clicks": "lots"})),
            "Scrolling lots at (?, ?)"
        );
        assert_eq!(ToolDispatcher::describe("hotkey", &json!({"keys": 5})), "Hotkey: ");
        assert_eq!(ToolDispatcher::describe("wait", &json!({"seconds": 2.5})), "Waiting 2.5 s…");
    }

    #[test]
    fn test_output_shaping() {
        let image = ToolOutput::Image(ImageContent::new("image/png", "AAAA".to_string()));
        assert_eq!(image.kind(), ResultKind::Image);
        assert!(matches!(
            image.into_result_content(),
            ToolResultContent::Image { .. }
        ));

        let text = ToolOutput::Text("ok".to_string());
        assert_eq!(text.as_text(), Some("ok"));
        assert_eq!(
            text.into_result_content(),
            ToolResultContent::Text { text: "ok".to_string() }
        );
    }
}
