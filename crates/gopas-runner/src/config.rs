//! Runner configuration.

use std::time::Duration;

use crate::signal::Interrupt;

/// Default window a process gets to exit after a graceful interrupt.
pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a [`ProcessRunner`](crate::ProcessRunner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// How long to wait for exit after the interrupt before forcing.
    pub graceful_timeout: Duration,
    /// Whether kills start with a cooperative interrupt.
    pub interrupt: Interrupt,
    /// Start each child as the leader of a new process group and stop the
    /// whole group on kill (unix only).
    pub process_group: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
            interrupt: Interrupt::for_target(),
            process_group: false,
        }
    }
}

impl RunnerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the graceful kill window.
    pub fn with_graceful_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_timeout = timeout;
        self
    }

    /// Overrides the interrupt capability.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Runs children in their own process group, so a kill also reaches
    /// whatever they started.
    pub fn with_process_group(mut self, enabled: bool) -> Self {
        self.process_group = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();

        assert_eq!(config.graceful_timeout, Duration::from_secs(3));
        assert_eq!(config.interrupt, Interrupt::for_target());
        assert!(!config.process_group);
    }

    #[test]
    fn test_config_builder() {
        let config = RunnerConfig::new()
            .with_graceful_timeout(Duration::from_millis(250))
            .with_interrupt(Interrupt::Unsupported)
            .with_process_group(true);

        assert_eq!(config.graceful_timeout, Duration::from_millis(250));
        assert_eq!(config.interrupt, Interrupt::Unsupported);
        assert!(config.process_group);
    }
}
