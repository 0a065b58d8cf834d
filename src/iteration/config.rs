//! Iteration configuration.

use serde::{Deserialize, Serialize};

use super::CancelHandle;
use crate::{Error, Result};

/// Which vertices run the messaging function after an update round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingPolicy {
    /// Only vertices whose value changed in this superstep.
    #[default]
    ChangedVertices,
    /// Every vertex, every superstep. Same fixed point, more messages.
    AllVertices,
}

/// How vertices are evaluated inside a superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sequential,
    /// Data-parallel across vertices. Requires the `parallel` feature;
    /// without it the driver falls back to sequential evaluation.
    Parallel,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        if cfg!(feature = "parallel") {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }
}

/// Parameters of one iteration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationConfig {
    /// Shows up as the `name` field of the `iteration` tracing span.
    #[serde(default = "default_name")]
    pub name: String,
    /// Supersteps `0..max_iterations` may run. Must be at least 1.
    pub max_iterations: u64,
    #[serde(default)]
    pub messaging: MessagingPolicy,
    #[serde(default)]
    pub execution: ExecutionMode,
    /// Checked once per superstep boundary.
    #[serde(skip)]
    pub cancel: Option<CancelHandle>,
}

fn default_name() -> String {
    "vertex-centric iteration".to_string()
}

impl IterationConfig {
    pub fn new(max_iterations: u64) -> Self {
        Self {
            name: default_name(),
            max_iterations,
            messaging: MessagingPolicy::default(),
            execution: ExecutionMode::default(),
            cancel: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_messaging(mut self, policy: MessagingPolicy) -> Self {
        self.messaging = policy;
        self
    }

    pub fn with_execution(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }

    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig("max_iterations must be at least 1".into()));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }
}
