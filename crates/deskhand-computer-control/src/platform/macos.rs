use crate::types::{MouseButton, Point, ScreenSize, WindowInfo};
use crate::{ComputerController, PointerProbe};
use anyhow::Result;
use async_trait::async_trait;

pub struct MacOSController;

impl MacOSController {
    pub fn new() -> Result<Self> {
        tracing::warn!("macOS computer control not fully implemented");
        Ok(Self)
    }
}

#[async_trait]
impl PointerProbe for MacOSController {
    async fn screen_size(&self) -> Result<ScreenSize> {
        anyhow::bail!("macOS screen size not yet available")
    }

    async fn pointer_position(&self) -> Result<Point> {
        anyhow::bail!("macOS pointer position not yet available")
    }
}

#[async_trait]
impl ComputerController for MacOSController {
    async fn move_pointer(&self, _to: Point) -> Result<()> {
        anyhow::bail!("macOS pointer control not yet available")
    }

    async fn click(&self, _button: MouseButton, _count: u32) -> Result<()> {
        anyhow::bail!("macOS pointer control not yet available")
    }

    async fn scroll(&self, _clicks: i32) -> Result<()> {
        anyhow::bail!("macOS pointer control not yet available")
    }

    async fn type_text(&self, _text: &str) -> Result<()> {
        anyhow::bail!("macOS keyboard control not yet available")
    }

    async fn press_key(&self, _key: &str) -> Result<()> {
        anyhow::bail!("macOS keyboard control not yet available")
    }

    async fn hotkey(&self, _keys: &[String]) -> Result<()> {
        anyhow::bail!("macOS keyboard control not yet available")
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        anyhow::bail!("macOS screenshot implementation not yet available")
    }

    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        anyhow::bail!("macOS window listing not yet available")
    }

    async fn focus_window(&self, _id: u64) -> Result<()> {
        anyhow::bail!("macOS window management not yet available")
    }

    async fn close_window(&self, _id: u64) -> Result<()> {
        anyhow::bail!("macOS window management not yet available")
    }
}
