use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default bound on queued styler commands.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;

/// Tuning for the validation engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Split invalid spans into requests of at most this many units.
    /// `None` requests each invalid span whole.
    pub max_request_len: Option<usize>,

    /// Abort in-flight asynchronous requests when the content changes.
    /// Their results would be discarded anyway; this only saves work.
    pub cancel_stale_requests: bool,

    /// Capacity of the styler command queue
    pub command_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_request_len: None,
            cancel_stale_requests: false,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }
}

/// Capture-name remapping for highlight providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HighlightConfig {
    /// Capture name -> token name. Unmapped names pass through.
    pub name_map: HashMap<String, String>,
}

impl HighlightConfig {
    /// Resolve a capture name.
    ///
    /// Dotted captures fall back to their parents: with only `function`
    /// mapped, `function.method.call` resolves to the `function` entry.
    /// Without any match the capture name itself is returned.
    pub fn resolve<'a>(&'a self, capture: &'a str) -> &'a str {
        let mut key = capture;
        loop {
            if let Some(mapped) = self.name_map.get(key) {
                return mapped;
            }
            match key.rfind('.') {
                Some(idx) => key = &key[..idx],
                None => return capture,
            }
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub highlight: HighlightConfig,
}
