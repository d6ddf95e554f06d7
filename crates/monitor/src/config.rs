use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::template::CommandRouting;

/// Feed monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks
    pub interval_secs: u64,
    /// Pause before each entry of a feed is processed
    pub entry_delay_ms: u64,
    /// Extra fetch attempts after the first failure
    pub fetch_retries: u32,
    /// Base delay between fetch attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,
    /// Feeds polled at the same time within one tick
    pub max_concurrent_polls: usize,
    /// Delay before the first tick after start
    pub first_run_delay_secs: u64,
    /// HTTP timeout for a single fetch
    pub request_timeout_secs: u64,
    /// Address commands as `@<bot>/command` instead of `/command`
    pub command_mention: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            entry_delay_ms: 10_000,
            fetch_retries: 3,
            retry_delay_ms: 1_000,
            max_concurrent_polls: 4,
            first_run_delay_secs: 20,
            request_timeout_secs: 30,
            command_mention: None,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn entry_delay(&self) -> Duration {
        Duration::from_millis(self.entry_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn first_run_delay(&self) -> Duration {
        Duration::from_secs(self.first_run_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn concurrency(&self) -> usize {
        self.max_concurrent_polls.max(1)
    }

    pub fn routing(&self) -> CommandRouting {
        match &self.command_mention {
            Some(bot) if !bot.trim().is_empty() => {
                CommandRouting::Mention(bot.trim().trim_start_matches('@').to_string())
            }
            _ => CommandRouting::Slash,
        }
    }
}
