//! Application lifecycle scheduling.
//!
//! The process root owns one [`Scheduler`] and hands it to every component
//! that changes behaviour in the background. Nothing here is global.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Whether the application is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    #[default]
    Foreground,
    Background,
}

impl AppLifecycle {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for AppLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publishes lifecycle changes to subscribers.
#[derive(Debug)]
pub struct Scheduler {
    lifecycle: watch::Sender<AppLifecycle>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        let (lifecycle, _) = watch::channel(AppLifecycle::Foreground);
        Self { lifecycle }
    }

    #[must_use]
    pub fn current(&self) -> AppLifecycle {
        *self.lifecycle.borrow()
    }

    /// Receives the current state immediately and every change after it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppLifecycle> {
        self.lifecycle.subscribe()
    }

    /// Sets the lifecycle state. Returns whether it changed.
    pub fn set(&self, state: AppLifecycle) -> bool {
        let changed = self.lifecycle.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            debug!(%state, "lifecycle changed");
        }
        changed
    }

    pub fn enter_background(&self) -> bool {
        self.set(AppLifecycle::Background)
    }

    pub fn enter_foreground(&self) -> bool {
        self.set(AppLifecycle::Foreground)
    }
}
