//! Sharded execution dispatch.

use crate::error::{Result, RuntimeError};
use hlorun_client::{Device, DeviceBuffer, ExecuteOptions, LoadedExecutable};

/// Runs loaded executables on a single device.
pub struct ExecutionDispatcher<'a> {
    device: &'a Device,
}

impl<'a> ExecutionDispatcher<'a> {
    /// `device` must be the device the arguments were staged on.
    pub fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// Execute the shard of `executable` on the dispatcher's device.
    ///
    /// Completion is observed through the output buffers' ready futures;
    /// no separate completion future is requested.
    pub fn execute(
        &self,
        executable: &dyn LoadedExecutable,
        arguments: &[Box<dyn DeviceBuffer>],
    ) -> Result<Vec<Box<dyn DeviceBuffer>>> {
        let argument_refs: Vec<&dyn DeviceBuffer> =
            arguments.iter().map(|buffer| buffer.as_ref()).collect();
        let options = ExecuteOptions::default();

        tracing::debug!(
            executable = executable.name(),
            device_assignment = %executable.device_assignment(),
            device = %self.device,
            "executing sharded"
        );

        let mut returned_future = None;
        executable
            .execute_sharded(&argument_refs, self.device, &options, &mut returned_future, false)
            .map_err(RuntimeError::Execution)
    }
}
