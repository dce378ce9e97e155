//! Tool definitions for the desktop agent.
//!
//! The schemas are sent verbatim with every decision-maker request.

use deskhand_providers::Tool;
use serde_json::json;

fn coordinate_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "x": { "type": "integer", "description": "Horizontal pixel coordinate" },
            "y": { "type": "integer", "description": "Vertical pixel coordinate" }
        },
        "required": ["x", "y"]
    })
}

fn title_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": description }
        },
        "required": ["title"]
    })
}

fn no_arguments() -> serde_json::Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

/// Create the static tool schema, in a fixed order.
pub fn create_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "take_screenshot".to_string(),
            description: "Capture the current screen as an image. Use it at the start of a task to see the screen and at the very end to confirm the goal. Avoid calling it between actions.".to_string(),
            input_schema: no_arguments(),
        },
        Tool {
            name: "get_screen_size".to_string(),
            description: "Return the primary screen resolution (width and height in pixels).".to_string(),
            input_schema: no_arguments(),
        },
        Tool {
            name: "click".to_string(),
            description: "Left-click at pixel coordinate (x, y) on the screen.".to_string(),
            input_schema: coordinate_schema(),
        },
        Tool {
            name: "double_click".to_string(),
            description: "Double-click at (x, y).".to_string(),
            input_schema: coordinate_schema(),
        },
        Tool {
            name: "right_click".to_string(),
            description: "Right-click at (x, y) to open a context menu.".to_string(),
            input_schema: coordinate_schema(),
        },
        Tool {
            name: "move_mouse".to_string(),
            description: "Move the mouse cursor to (x, y) without clicking.".to_string(),
            input_schema: coordinate_schema(),
        },
        Tool {
            name: "scroll".to_string(),
            description: "Scroll at position (x, y). Positive clicks scroll up, negative clicks scroll down.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "x": { "type": "integer" },
                    "y": { "type": "integer" },
                    "clicks": {
                        "type": "integer",
                        "description": "Scroll steps: positive = up, negative = down"
                    }
                },
                "required": ["x", "y", "clicks"]
            }),
        },
        Tool {
            name: "type_text".to_string(),
            description: "Type a string of text using the keyboard at the current focus.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to type" }
                },
                "required": ["text"]
            }),
        },
        Tool {
            name: "press_key".to_string(),
            description: "Press a single key: enter, escape, tab, backspace, space, delete, home, end, pageup, pagedown, up, down, left, right, f1-f12, etc.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Key name, e.g. 'enter', 'escape'" }
                },
                "required": ["key"]
            }),
        },
        Tool {
            name: "hotkey".to_string(),
            description: "Press a keyboard shortcut combination, e.g. ctrl+c, ctrl+v, alt+f4, ctrl+shift+esc.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "keys": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keys to press together, e.g. ['ctrl', 'c']"
                    }
                },
                "required": ["keys"]
            }),
        },
        Tool {
            name: "run_command".to_string(),
            description: "Run a shell command and return stdout + stderr. Use this as the main action tool: batch a whole sequence of steps into one call when possible. Commands are killed after 60 seconds.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The shell command to run" }
                },
                "required": ["command"]
            }),
        },
        Tool {
            name: "list_windows".to_string(),
            description: "List all open window titles, optionally filtered by a substring. Use to check what is currently open before opening a new app.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title_filter": {
                        "type": "string",
                        "description": "Optional substring to filter by (case-insensitive). Leave empty for all windows."
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "count_windows".to_string(),
            description: "Count how many open windows have a title containing the given string. Use to check for duplicates before opening an app.".to_string(),
            input_schema: title_schema("Substring to match in window titles"),
        },
        Tool {
            name: "focus_window".to_string(),
            description: "Bring an already-open window to the foreground by partial title match. Use instead of re-opening an app that is already running.".to_string(),
            input_schema: title_schema("Partial window title to match"),
        },
        Tool {
            name: "close_duplicate_windows".to_string(),
            description: "Enforce single-instance policy: if more than one window matches the title, close all duplicates and keep only the first. Call this immediately if you detect multiple instances of the same app.".to_string(),
            input_schema: title_schema("Partial title of the app to deduplicate (e.g. 'Firefox', 'Files', 'Text Editor')"),
        },
        Tool {
            name: "wait".to_string(),
            description: "Pause for a number of seconds (max 10) to let a page load, an animation finish, or an app open before the next action.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "seconds": { "type": "number", "description": "Seconds to wait (0.5 - 10)" }
                },
                "required": ["seconds"]
            }),
        },
        Tool {
            name: "search_web".to_string(),
            description: "Search the web with DuckDuckGo and return the top 5 results (title, snippet, URL).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" }
                },
                "required": ["query"]
            }),
        },
    ]
}
