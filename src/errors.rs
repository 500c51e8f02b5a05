use std::path::PathBuf;
use thiserror::Error;

/// Failures originating in the imaging hardware layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("could not find any compatible devices")]
    NoneFound,
    #[error("target page for device '{device}' is not set, configure your devices first")]
    MissingTargetPage { device: String },
    #[error("could not find any trigger sources")]
    NoTriggerSource,
    #[error("device '{device}' failed: {message}")]
    Operation { device: String, message: String },
    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raised when a multi-device dispatch round had at least one failure.
/// Every dispatched operation has been awaited by the time this surfaces.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("device operation '{operation}' failed")]
    OperationFailed {
        operation: &'static str,
        #[source]
        source: DeviceError,
    },
    #[error("device task panicked during '{operation}'")]
    TaskPanicked { operation: &'static str },
}

/// A plugin hook raised; remaining hooks for that call were skipped.
#[derive(Debug, Error)]
#[error("plugin '{plugin}' failed in '{hook}' hook")]
pub struct HookError {
    pub plugin: String,
    pub hook: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// Top-level error surfaced by workflow lifecycle methods.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("i/o error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
