//! Tool execution module for the desktop agent.
//!
//! Tools are organized by category:
//! - `pointer` - Mouse movement, clicks and scrolling
//! - `keyboard` - Typing, single keys and shortcuts
//! - `shell` - Shell command execution
//! - `windows` - Window listing, counting and focusing
//! - `misc` - Screenshots, screen size and waiting
//! - `search` - Web search

pub mod executor;
pub mod keyboard;
pub mod misc;
pub mod pointer;
pub mod search;
pub mod shell;
pub mod windows;

pub use executor::{ToolContext, ToolSettings};
