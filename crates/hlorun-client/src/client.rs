//! Capability traits implemented by device clients.

use crate::device::{Device, DeviceAssignment};
use crate::future::ReadyFuture;
use crate::options::{CompileOptions, ExecuteOptions};
use crate::Result;
use hlorun_core::{Computation, Literal, Shape};
use std::any::Any;
use std::fmt;

/// Entry point to an accelerator backend.
///
/// A client owns a fixed set of addressable devices, compiles
/// [`Computation`]s into [`LoadedExecutable`]s and materializes host
/// literals as [`DeviceBuffer`]s. Compile and transfer calls may block;
/// transfers may also complete asynchronously, which is reported through
/// each buffer's [`ReadyFuture`].
pub trait DeviceClient: Send + Sync {
    /// Name of the backend platform, e.g. `"host"`.
    fn platform_name(&self) -> &str;

    /// Devices this client can place buffers and executions on, in a stable order.
    fn addressable_devices(&self) -> &[Device];

    /// Canonical assignment of `num_replicas x num_partitions` logical slots to devices.
    ///
    /// Fails when the client cannot satisfy the requested shape.
    fn default_device_assignment(
        &self,
        num_replicas: usize,
        num_partitions: usize,
    ) -> Result<DeviceAssignment>;

    /// Start copying `literal` to `device`.
    ///
    /// The returned buffer must not be read before its ready future resolves.
    fn buffer_from_host_literal(
        &self,
        literal: &Literal,
        device: &Device,
    ) -> Result<Box<dyn DeviceBuffer>>;

    /// Compile a computation into an executable loaded on the client's devices.
    fn compile(
        &self,
        computation: &Computation,
        options: CompileOptions,
    ) -> Result<Box<dyn LoadedExecutable>>;
}

/// Handle to device-resident data.
///
/// Buffers are single-owner: produced once (by a transfer or an execution)
/// and dropped by their owner.
pub trait DeviceBuffer: Send + Sync + fmt::Debug {
    /// Shape of the data on the device.
    fn on_device_shape(&self) -> &Shape;

    fn device(&self) -> &Device;

    /// Future that resolves once the data is materialized and safe to read.
    fn ready_future(&self) -> ReadyFuture;

    /// Copy the data back to the host, blocking until it is available.
    fn to_literal_sync(&self) -> Result<Literal>;

    /// Access to the concrete type, for clients that need their own buffers back.
    fn as_any(&self) -> &dyn Any;
}

/// A compiled program loaded onto devices.
///
/// Produced by exactly one [`DeviceClient::compile`] call; may be executed
/// any number of times.
pub trait LoadedExecutable: Send + Sync {
    fn name(&self) -> &str;

    /// Devices the executable was compiled for.
    fn device_assignment(&self) -> &DeviceAssignment;

    /// Run the shard of the executable assigned to `device`.
    ///
    /// `arguments` are borrowed; the executable waits for each to become
    /// ready before reading it. When `fill_future` is true, `returned_future`
    /// receives a future that resolves when the execution has finished.
    fn execute_sharded(
        &self,
        arguments: &[&dyn DeviceBuffer],
        device: &Device,
        options: &ExecuteOptions,
        returned_future: &mut Option<ReadyFuture>,
        fill_future: bool,
    ) -> Result<Vec<Box<dyn DeviceBuffer>>>;
}
