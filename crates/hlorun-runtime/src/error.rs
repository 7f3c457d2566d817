//! Error types for the runtime crate.

use hlorun_client::Error as ClientError;
use thiserror::Error;

/// Failure of one stage of a run.
///
/// Backend failures keep the client's error as their source, unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// The client cannot satisfy the requested replica/partition shape.
    #[error("Device topology error: {0}")]
    DeviceTopology(#[source] ClientError),

    /// The backend rejected the program.
    #[error("Compilation failed: {0}")]
    Compilation(#[source] ClientError),

    /// Moving data between host and device failed.
    #[error("Transfer failed: {0}")]
    Transfer(#[source] ClientError),

    /// Dispatch or execution on the device failed.
    #[error("Execution failed: {0}")]
    Execution(#[source] ClientError),

    /// The runner does not support the requested entry point.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Misuse of the runner itself, such as an out-of-range device index.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
