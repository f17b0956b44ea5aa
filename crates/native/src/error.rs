use std::time::Duration;

/// Why the native backend could not be brought up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("no async runtime available to initialize the native backend")]
    NoRuntime,
    #[error("native world construction failed: {0}")]
    Construction(String),
    #[error("native initialization timed out after {0:?}")]
    Timeout(Duration),
    #[error("native initialization task aborted: {0}")]
    Aborted(String),
}
