//! Process-wide abort flag shared by the fail-safe monitor and the agent.
//!
//! The flag is a single atomic with three states. The monitor moves it from
//! `Clear` to `Set`; the first `check()` that observes `Set` moves it on to
//! `Consumed`. Both non-clear states fail every subsequent check until the
//! next task calls `clear()`.

use std::sync::atomic::{AtomicU8, Ordering};

const CLEAR: u8 = 0;
const SET: u8 = 1;
const CONSUMED: u8 = 2;

/// Returned by [`AbortSignal::check`] once the fail-safe has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Task aborted — mouse moved to a screen corner.")]
pub struct Aborted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortState {
    Clear,
    Set,
    Consumed,
}

#[derive(Debug, Default)]
pub struct AbortSignal {
    state: AtomicU8,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(CLEAR),
        }
    }

    /// Trigger the abort. Idempotent and safe from any thread.
    pub fn set(&self) {
        let _ = self
            .state
            .compare_exchange(CLEAR, SET, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Reset to `Clear`. Only called between tasks.
    pub fn clear(&self) {
        self.state.store(CLEAR, Ordering::SeqCst);
    }

    pub fn check(&self) -> Result<(), Aborted> {
        match self
            .state
            .compare_exchange(SET, CONSUMED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Err(Aborted),
            Err(CLEAR) => Ok(()),
            Err(_) => Err(Aborted),
        }
    }

    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::SeqCst) != CLEAR
    }

    pub fn state(&self) -> AbortState {
        match self.state.load(Ordering::SeqCst) {
            CLEAR => AbortState::Clear,
            SET => AbortState::Set,
            _ => AbortState::Consumed,
        }
    }
}
