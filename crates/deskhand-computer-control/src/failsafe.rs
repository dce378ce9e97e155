//! Corner fail-safe.
//!
//! A background task samples the pointer on a fixed interval and sets the
//! shared [`AbortSignal`] when the pointer sits within `corner_margin_px` of
//! any screen corner. Screen size is re-read on every sample so resolution
//! changes are picked up.

use crate::abort::AbortSignal;
use crate::types::{Point, ScreenSize};
use crate::PointerProbe;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FailSafeSettings {
    pub corner_margin_px: u32,
    pub poll_interval: Duration,
    /// Consecutive failed samples after which the monitor fails closed
    pub max_probe_failures: u32,
}

impl Default for FailSafeSettings {
    fn default() -> Self {
        Self {
            corner_margin_px: 10,
            poll_interval: Duration::from_millis(25),
            max_probe_failures: 3,
        }
    }
}

/// True when `point` is within `margin` pixels of one of the four corners.
pub fn is_in_corner(point: Point, size: ScreenSize, margin: u32) -> bool {
    let (x, y) = (i64::from(point.x), i64::from(point.y));
    let (w, h) = (i64::from(size.width), i64::from(size.height));
    let cp = i64::from(margin);

    (x <= cp && y <= cp)
        || (x >= w - cp && y <= cp)
        || (x <= cp && y >= h - cp)
        || (x >= w - cp && y >= h - cp)
}

pub struct FailSafeMonitor {
    probe: Arc<dyn PointerProbe>,
    abort: Arc<AbortSignal>,
    settings: FailSafeSettings,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl FailSafeMonitor {
    pub fn new(
        probe: Arc<dyn PointerProbe>,
        abort: Arc<AbortSignal>,
        settings: FailSafeSettings,
    ) -> Self {
        Self {
            probe,
            abort,
            settings,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// Start sampling. Fails if the pointer cannot be read at all.
    pub async fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        if self.settings.poll_interval.is_zero() {
            anyhow::bail!("fail-safe poll interval must be non-zero");
        }

        let (point, size) = sample(self.probe.as_ref())
            .await
            .context("Fail-safe monitor could not attach to the pointer")?;
        if is_in_corner(point, size, self.settings.corner_margin_px) {
            warn!("Pointer already in a screen corner at fail-safe start");
            self.abort.set();
        }

        self.cancel = CancellationToken::new();
        let task = MonitorTask {
            probe: Arc::clone(&self.probe),
            abort: Arc::clone(&self.abort),
            settings: self.settings.clone(),
            cancel: self.cancel.clone(),
        };
        self.handle = Some(tokio::spawn(task.run()));

        info!(
            "Fail-safe monitor started ({} px margin, {} ms interval)",
            self.settings.corner_margin_px,
            self.settings.poll_interval.as_millis()
        );
        Ok(())
    }

    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
            info!("Fail-safe monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn abort_signal(&self) -> Arc<AbortSignal> {
        Arc::clone(&self.abort)
    }
}

impl Drop for FailSafeMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct MonitorTask {
    probe: Arc<dyn PointerProbe>,
    abort: Arc<AbortSignal>,
    settings: FailSafeSettings,
    cancel: CancellationToken,
}

impl MonitorTask {
    async fn run(self) {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            match sample(self.probe.as_ref()).await {
                Ok((point, size)) => {
                    failures = 0;
                    if is_in_corner(point, size, self.settings.corner_margin_px) {
                        if !self.abort.is_set() {
                            warn!(
                                "Fail-safe triggered: pointer at ({}, {}) on {}x{} screen",
                                point.x, point.y, size.width, size.height
                            );
                        }
                        self.abort.set();
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    debug!("Fail-safe sample failed ({} in a row): {}", failures, e);
                    if failures == self.settings.max_probe_failures {
                        warn!(
                            "Fail-safe lost the pointer after {} attempts, aborting: {}",
                            failures, e
                        );
                    }
                    if failures >= self.settings.max_probe_failures {
                        self.abort.set();
                    }
                }
            }
        }
    }
}

async fn sample(probe: &dyn PointerProbe) -> Result<(Point, ScreenSize)> {
    let size = probe.screen_size().await?;
    let point = probe.pointer_position().await?;
    Ok((point, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_corners_detected() {
        assert!(is_in_corner(Point::new(0, 0), SCREEN, 10));
        assert!(is_in_corner(Point::new(10, 10), SCREEN, 10));
        assert!(is_in_corner(Point::new(1919, 0), SCREEN, 10));
        assert!(is_in_corner(Point::new(1910, 5), SCREEN, 10));
        assert!(is_in_corner(Point::new(3, 1079), SCREEN, 10));
        assert!(is_in_corner(Point::new(1915, 1075), SCREEN, 10));
    }

    #[test]
    fn test_edges_and_center_are_not_corners() {
        assert!(!is_in_corner(Point::new(960, 540), SCREEN, 10));
        assert!(!is_in_corner(Point::new(11, 0), SCREEN, 10));
        assert!(!is_in_corner(Point::new(0, 500), SCREEN, 10));
        assert!(!is_in_corner(Point::new(1909, 0), SCREEN, 10));
        assert!(!is_in_corner(Point::new(960, 1079), SCREEN, 10));
    }

    #[test]
    fn test_zero_margin_only_exact_corners() {
        assert!(is_in_corner(Point::new(0, 0), SCREEN, 0));
        assert!(!is_in_corner(Point::new(1, 0), SCREEN, 0));
    }
}
