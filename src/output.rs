// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::process::{StateChanged, StateSnapshot};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: if self.start_time.is_some() {
                        Some(self.elapsed_secs())
                    } else {
                        None
                    },
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a delivered change event.
    pub fn event(&self, event: &StateChanged) {
        match self.mode {
            OutputMode::Normal => {
                println!("  ← v{} {}", event.version(), event.kind);
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let line = JsonChange {
                    event: "change",
                    change: event,
                };
                if let Ok(json) = serde_json::to_string(&line) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print the final state of a process.
    pub fn state(&self, state: &StateSnapshot) {
        match self.mode {
            OutputMode::Normal => {
                println!("Process {} ({}) in {}", state.id, state.name, state.namespace);
                println!("  version:   {}", state.version);
                println!("  complete:  {}", state.complete);
                println!("  failed:    {}", state.failed);
                if let Some(message) = &state.completion_message {
                    println!("  message:   {message}");
                }
                if let Some(location) = &state.persistent_location {
                    println!("  location:  {location}");
                }
                if let Some(pod) = &state.pod_name {
                    println!("  pod:       {pod}");
                }
                for config in state.configurations.iter() {
                    let status = if config.is_submitted() {
                        "submitted"
                    } else if config.is_complete() {
                        "complete"
                    } else {
                        "incomplete"
                    };
                    println!("  config:    {}/{} {}", config.kind(), config.id(), status);
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => {
                let line = JsonState {
                    event: "state",
                    state,
                    configurations: &state.configurations,
                };
                if let Ok(json) = serde_json::to_string(&line) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Warning: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "warning",
                    message,
                    duration_secs: None,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonChange<'a> {
    event: &'a str,
    change: &'a StateChanged,
}

#[derive(Serialize)]
struct JsonState<'a> {
    event: &'a str,
    state: &'a StateSnapshot,
    configurations: &'a [crate::process::Configuration],
}
