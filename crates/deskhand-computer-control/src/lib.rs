pub mod abort;
pub mod failsafe;
pub mod platform;
pub mod types;

pub use abort::{AbortSignal, AbortState, Aborted};
pub use failsafe::{is_in_corner, FailSafeMonitor, FailSafeSettings};
pub use types::{MouseButton, Point, ScreenSize, WindowInfo};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// The two reads the fail-safe monitor needs.
#[async_trait]
pub trait PointerProbe: Send + Sync {
    async fn screen_size(&self) -> Result<ScreenSize>;

    async fn pointer_position(&self) -> Result<Point>;
}

/// Hardware action primitives. Implementations perform exactly one physical
/// action per call and never consult the abort signal themselves.
#[async_trait]
pub trait ComputerController: PointerProbe {
    async fn move_pointer(&self, to: Point) -> Result<()>;

    /// Click `count` times at the current pointer position.
    async fn click(&self, button: MouseButton, count: u32) -> Result<()>;

    /// Positive `clicks` scroll up, negative scroll down.
    async fn scroll(&self, clicks: i32) -> Result<()>;

    async fn type_text(&self, text: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    /// Press all keys in order, then release them in reverse.
    async fn hotkey(&self, keys: &[String]) -> Result<()>;

    /// Full primary screen as PNG bytes.
    async fn take_screenshot(&self) -> Result<Vec<u8>>;

    /// Top-level windows in host enumeration order.
    async fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    async fn focus_window(&self, id: u64) -> Result<()>;

    async fn close_window(&self, id: u64) -> Result<()>;
}

// Platform-specific constructor
pub fn create_controller() -> Result<Box<dyn ComputerController>> {
    #[cfg(target_os = "macos")]
    return Ok(Box::new(platform::macos::MacOSController::new()?));

    #[cfg(target_os = "linux")]
    return Ok(Box::new(platform::linux::LinuxController::new()?));

    #[cfg(target_os = "windows")]
    return Ok(Box::new(platform::windows::WindowsController::new()?));

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    anyhow::bail!("Unsupported platform")
}

/// A separate connection for the fail-safe monitor, so sampling never waits
/// behind an action in flight.
pub fn create_pointer_probe() -> Result<Arc<dyn PointerProbe>> {
    #[cfg(target_os = "macos")]
    return Ok(Arc::new(platform::macos::MacOSController::new()?));

    #[cfg(target_os = "linux")]
    return Ok(Arc::new(platform::linux::LinuxController::new()?));

    #[cfg(target_os = "windows")]
    return Ok(Arc::new(platform::windows::WindowsController::new()?));

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    anyhow::bail!("Unsupported platform")
}
