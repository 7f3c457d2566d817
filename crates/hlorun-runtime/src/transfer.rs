//! Host/device data movement.

use crate::error::{Result, RuntimeError};
use hlorun_client::{Device, DeviceBuffer, DeviceClient};
use hlorun_core::Literal;

/// Moves literals to one device and reads buffers back.
pub struct HostDeviceTransfer<'a> {
    client: &'a dyn DeviceClient,
    device: &'a Device,
}

impl<'a> HostDeviceTransfer<'a> {
    pub fn new(client: &'a dyn DeviceClient, device: &'a Device) -> Self {
        Self { client, device }
    }

    pub fn device(&self) -> &Device {
        self.device
    }

    /// Start a transfer of `literal` to the device.
    ///
    /// The returned buffer may still be in flight.
    pub fn to_device(&self, literal: &Literal) -> Result<Box<dyn DeviceBuffer>> {
        self.client
            .buffer_from_host_literal(literal, self.device)
            .map_err(RuntimeError::Transfer)
    }

    /// Transfer `literals` in order, waiting for each to land before
    /// starting the next. Every returned buffer is ready.
    pub fn to_device_batch(&self, literals: &[&Literal]) -> Result<Vec<Box<dyn DeviceBuffer>>> {
        let mut buffers = Vec::with_capacity(literals.len());
        for (index, literal) in literals.iter().enumerate() {
            let buffer = self.to_device(literal)?;
            buffer
                .ready_future()
                .block_until_ready()
                .map_err(RuntimeError::Transfer)?;
            tracing::trace!(index, shape = %literal.shape(), "argument staged");
            buffers.push(buffer);
        }
        Ok(buffers)
    }

    /// Wait for `buffer` and copy its contents to the host.
    pub fn from_device(&self, buffer: &dyn DeviceBuffer) -> Result<Literal> {
        buffer
            .ready_future()
            .block_until_ready()
            .map_err(RuntimeError::Transfer)?;
        buffer.to_literal_sync().map_err(RuntimeError::Transfer)
    }
}
