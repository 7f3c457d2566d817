//! Device client capability set for hlorun.
//!
//! This crate defines the collaborator abstractions the runner consumes and
//! ships one implementation of them:
//!
//! - [`DeviceClient`]: device discovery, compilation and host-to-device
//!   buffer materialization
//! - [`LoadedExecutable`]: a compiled, device-resident program that can be
//!   executed any number of times
//! - [`DeviceBuffer`]: a handle to device-resident data with a
//!   [`ReadyFuture`] that resolves once the data is materialized
//! - [`HostClient`]: an in-process reference client that keeps "device"
//!   memory on the host, copies transfers on worker threads and interprets
//!   computations directly
//!
//! # Example
//!
//! ```
//! use hlorun_client::{DeviceBuffer, DeviceClient, HostClient};
//! use hlorun_core::Literal;
//!
//! # fn main() -> anyhow::Result<()> {
//! let client = HostClient::new();
//! let device = &client.addressable_devices()[0];
//!
//! let buffer = client.buffer_from_host_literal(&Literal::from_vec(vec![1.0f32, 2.0], &[2]), device)?;
//! buffer.ready_future().block_until_ready()?;
//! assert_eq!(buffer.to_literal_sync()?.to_vec::<f32>()?, vec![1.0, 2.0]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod device;
pub mod future;
pub mod host;
pub mod options;

// Public exports
pub use client::{DeviceBuffer, DeviceClient, LoadedExecutable};
pub use device::{Device, DeviceAssignment, DeviceId};
pub use future::{ReadyFuture, ReadyPromise};
pub use host::{HostBuffer, HostClient, HostClientOptions, HostExecutable};
pub use options::{CompileOptions, ExecutableBuildOptions, ExecuteOptions};

/// Result type for device client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Status-style errors reported by device clients.
///
/// Errors are `Clone` so a single failure can be observed through every
/// clone of a shared [`ReadyFuture`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The caller passed something the client cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Not enough devices or device memory.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The operation is not valid in the current state.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// The client does not support the operation.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// A fault inside the client or on the device.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The submitted program is malformed.
    #[error(transparent)]
    Program(#[from] hlorun_core::Error),
}
