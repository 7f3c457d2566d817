//! Runner configuration.

/// Configuration for [`PjRtRunner`](crate::PjRtRunner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Index into the client's addressable devices used for both staging
    /// inputs and dispatching execution.
    pub device_index: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { device_index: 0 }
    }
}
