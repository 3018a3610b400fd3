//! Engine configuration.

use std::env;

/// Scheduler-wide switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Report lifecycle transitions to the debug sink.
    pub debug_actions: bool,
    /// Cancel an action with `StopReason::Faulted` when its update errors.
    pub cancel_on_fault: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_actions: false,
            cancel_on_fault: true,
        }
    }
}

impl EngineConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `ACTIONS_DEBUG` - Enable lifecycle debug events (default: false; set
    ///   without a recognized value means true)
    /// - `ACTIONS_CANCEL_ON_FAULT` - Cancel actions whose update fails (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("ACTIONS_DEBUG") {
            config.debug_actions = parse_bool(&raw).unwrap_or(true);
        }
        if let Some(cancel) = lookup("ACTIONS_CANCEL_ON_FAULT").and_then(|raw| parse_bool(&raw)) {
            config.cancel_on_fault = cancel;
        }

        config
    }

    #[must_use]
    pub fn with_debug(mut self, debug_actions: bool) -> Self {
        self.debug_actions = debug_actions;
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
