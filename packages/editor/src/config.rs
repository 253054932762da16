use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and buffering knobs of the code writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeWriterConfig {
    /// Pause after every write cycle before the next one may start
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Quiet period before dirty files are sent to key cleanup
    #[serde(default = "default_cleanup_debounce_ms")]
    pub cleanup_debounce_ms: u64,

    /// Delay between a successful write and the settle notification
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Buffer size of the event broadcast channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_cleanup_debounce_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_event_capacity() -> usize {
    64
}

impl CodeWriterConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn cleanup_debounce(&self) -> Duration {
        Duration::from_millis(self.cleanup_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for CodeWriterConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            cleanup_debounce_ms: default_cleanup_debounce_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}
