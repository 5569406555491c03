// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging handle passed to every pipeline component.
//!
//! Every event is forwarded to `tracing`. A handle created with
//! [`Telemetry::capturing`] also keeps the events in memory so tests can
//! assert on what a component reported.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    /// Both generation tiers failed; emitted as a `tracing` error with
    /// `severity = "critical"`.
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warn => write!(f, "warn"),
            Level::Error => write!(f, "error"),
            Level::Critical => write!(f, "critical"),
        }
    }
}

/// A captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub level: Level,
    pub component: &'static str,
    pub message: String,
}

/// Cheap, cloneable logging handle.
#[derive(Clone)]
pub struct Telemetry {
    component: &'static str,
    capture: Option<Arc<Mutex<Vec<Event>>>>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("component", &self.component)
            .field("capturing", &self.capture.is_some())
            .finish()
    }
}

impl Telemetry {
    /// Handle that only forwards to `tracing`.
    pub fn new() -> Self {
        Self {
            component: "ragpipe",
            capture: None,
        }
    }

    /// Handle that forwards to `tracing` and records every event.
    pub fn capturing() -> Self {
        Self {
            component: "ragpipe",
            capture: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Returns a handle tagged with `component`, sharing the same capture buffer.
    pub fn scoped(&self, component: &'static str) -> Self {
        Self {
            component,
            capture: self.capture.clone(),
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(Level::Debug, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(Level::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Level::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(Level::Error, message.into());
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.emit(Level::Critical, message.into());
    }

    /// All captured events, oldest first. Empty for non-capturing handles.
    pub fn events(&self) -> Vec<Event> {
        match &self.capture {
            Some(events) => events.lock().map(|e| e.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Captured messages at exactly `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    fn emit(&self, level: Level, message: String) {
        let component = self.component;
        match level {
            Level::Debug => tracing::debug!(component, "{}", message),
            Level::Info => tracing::info!(component, "{}", message),
            Level::Warn => tracing::warn!(component, "{}", message),
            Level::Error => tracing::error!(component, "{}", message),
            Level::Critical => tracing::error!(component, severity = "critical", "{}", message),
        }

        if let Some(events) = &self.capture {
            if let Ok(mut events) = events.lock() {
                events.push(Event {
                    level,
                    component,
                    message,
                });
            }
        }
    }
}
