//! Registry configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a `TransactionContexts` registry
///
/// ```toml
/// close_iterators_on_delete = true
/// # 0 waits indefinitely
/// execute_timeout_ms = 30000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionContextsConfig {
    /// Close a context's open iterators when it is deleted rather than
    /// waiting for the session-level sweep
    pub close_iterators_on_delete: bool,
    /// Bound applied by `TransactionContext::wait_for_response`; `0` waits
    /// indefinitely
    pub execute_timeout_ms: u64,
}

impl Default for TransactionContextsConfig {
    fn default() -> Self {
        Self {
            close_iterators_on_delete: true,
            execute_timeout_ms: 30_000,
        }
    }
}

impl TransactionContextsConfig {
    /// Configuration for tests: no timeout
    pub fn for_testing() -> Self {
        Self {
            close_iterators_on_delete: true,
            execute_timeout_ms: 0,
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Set whether delete closes the removed context's iterators
    pub fn with_close_iterators_on_delete(mut self, enabled: bool) -> Self {
        self.close_iterators_on_delete = enabled;
        self
    }

    /// Set the response wait bound; `None` waits indefinitely
    ///
    /// Bounds shorter than a millisecond are raised to one millisecond.
    pub fn with_execute_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execute_timeout_ms = match timeout {
            Some(t) => u64::try_from(t.as_millis()).unwrap_or(u64::MAX).max(1),
            None => 0,
        };
        self
    }

    /// Response wait bound as a `Duration`
    pub fn execute_timeout(&self) -> Option<Duration> {
        match self.execute_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
