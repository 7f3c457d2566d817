//! Compile and execute options passed to device clients.

use crate::device::DeviceAssignment;

/// Options controlling how a computation is built into an executable.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableBuildOptions {
    /// Explicit device assignment; the client picks its default when `None`.
    pub device_assignment: Option<DeviceAssignment>,
    pub num_replicas: usize,
    pub num_partitions: usize,
    /// Skip optimization passes and only lower the computation for the backend.
    pub run_backend_only: bool,
}

impl Default for ExecutableBuildOptions {
    fn default() -> Self {
        Self {
            device_assignment: None,
            num_replicas: 1,
            num_partitions: 1,
            run_backend_only: false,
        }
    }
}

/// Compile configuration for [`DeviceClient::compile`](crate::DeviceClient::compile).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOptions {
    pub executable_build_options: ExecutableBuildOptions,
}

/// Per-launch execution options.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOptions {
    /// Identifier attached to a launch for diagnostics.
    pub launch_id: i32,
    /// Require argument shapes to match parameter shapes exactly. When
    /// false, arguments with the same element type and element count are
    /// reinterpreted in the parameter's shape.
    pub strict_shape_checking: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            launch_id: 0,
            strict_shape_checking: true,
        }
    }
}
