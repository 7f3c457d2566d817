//! In-process reference client.
//!
//! [`HostClient`] exposes a configurable number of "devices" whose memory is
//! ordinary host memory. It behaves like an accelerator client where it
//! matters to callers:
//!
//! - transfers are asynchronous: `buffer_from_host_literal` returns at once
//!   and a worker thread completes the copy, resolving the buffer's
//!   [`ReadyFuture`](crate::ReadyFuture)
//! - device memory can be bounded per device, and allocation failures are
//!   reported as `ResourceExhausted`
//! - compilation validates the computation and, unless the build options
//!   request backend-only lowering, runs an optimization pipeline

mod buffer;
mod evaluator;
mod executable;
mod passes;

pub use buffer::HostBuffer;
pub use executable::HostExecutable;

use crate::client::{DeviceBuffer, DeviceClient, LoadedExecutable};
use crate::device::{Device, DeviceAssignment, DeviceId};
use crate::options::CompileOptions;
use crate::{Error, Result};
use buffer::DeviceMemory;
use hlorun_core::{Computation, Literal};
use std::sync::Arc;

const PLATFORM_NAME: &str = "host";

/// Options for [`HostClient::with_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClientOptions {
    /// Number of addressable devices.
    pub num_devices: usize,
    /// Capacity of each device's memory in bytes; unbounded when `None`.
    pub device_memory_bytes: Option<usize>,
    /// Complete host-to-device copies on a worker thread. When false the
    /// copy happens inline and buffers are ready on return.
    pub async_transfers: bool,
}

impl Default for HostClientOptions {
    fn default() -> Self {
        Self {
            num_devices: 1,
            device_memory_bytes: None,
            async_transfers: true,
        }
    }
}

/// Device client backed by host memory.
pub struct HostClient {
    options: HostClientOptions,
    devices: Vec<Device>,
    memory: Vec<Arc<DeviceMemory>>,
}

impl HostClient {
    /// Client with a single unbounded device and asynchronous transfers.
    pub fn new() -> Self {
        Self::build(HostClientOptions::default())
    }

    /// # Errors
    /// Returns `InvalidArgument` if `options.num_devices` is zero.
    pub fn with_options(options: HostClientOptions) -> Result<Self> {
        if options.num_devices == 0 {
            return Err(Error::InvalidArgument(
                "host client needs at least one device".to_string(),
            ));
        }
        Ok(Self::build(options))
    }

    fn build(options: HostClientOptions) -> Self {
        let devices = (0..options.num_devices)
            .map(|id| Device::new(DeviceId(id), PLATFORM_NAME, 0))
            .collect();
        let memory = (0..options.num_devices)
            .map(|_| Arc::new(DeviceMemory::new(options.device_memory_bytes)))
            .collect();
        tracing::debug!(
            num_devices = options.num_devices,
            device_memory_bytes = ?options.device_memory_bytes,
            "created host client"
        );
        Self {
            options,
            devices,
            memory,
        }
    }

    pub fn options(&self) -> &HostClientOptions {
        &self.options
    }

    /// Bytes currently held by live buffers on `device`.
    pub fn bytes_in_use(&self, device: &Device) -> Result<usize> {
        Ok(self.memory[self.device_index(device)?].in_use())
    }

    /// Like [`DeviceClient::compile`], but returns the concrete executable
    /// so callers can inspect the optimized computation.
    #[tracing::instrument(skip_all, fields(computation = %computation.name))]
    pub fn compile_host(
        &self,
        computation: &Computation,
        options: CompileOptions,
    ) -> Result<HostExecutable> {
        computation.validate()?;
        let build = options.executable_build_options;

        let device_assignment = match build.device_assignment {
            Some(assignment) => {
                self.check_assignment(&assignment, build.num_replicas, build.num_partitions)?;
                assignment
            }
            None => self.default_device_assignment(build.num_replicas, build.num_partitions)?,
        };

        let mut computation = computation.clone();
        let passes_applied = if build.run_backend_only {
            tracing::debug!("backend-only compile, skipping optimization passes");
            Vec::new()
        } else {
            passes::run_pipeline(&mut computation, &passes::default_pipeline())?
        };

        tracing::debug!(
            instructions = computation.instructions.len(),
            %device_assignment,
            "compiled"
        );
        Ok(HostExecutable::new(
            computation,
            device_assignment,
            self.memory.clone(),
            passes_applied,
        ))
    }

    fn device_index(&self, device: &Device) -> Result<usize> {
        let index = device.id().0;
        match self.devices.get(index) {
            Some(own) if own == device => Ok(index),
            _ => Err(Error::InvalidArgument(format!(
                "{device} is not addressable by this {PLATFORM_NAME} client"
            ))),
        }
    }

    fn check_assignment(
        &self,
        assignment: &DeviceAssignment,
        num_replicas: usize,
        num_partitions: usize,
    ) -> Result<()> {
        if assignment.replica_count() != num_replicas
            || assignment.computation_count() != num_partitions
        {
            return Err(Error::InvalidArgument(format!(
                "device assignment is {}x{} but the build requests {num_replicas}x{num_partitions}",
                assignment.replica_count(),
                assignment.computation_count()
            )));
        }
        if let Some(unknown) = assignment
            .devices()
            .iter()
            .find(|id| id.0 >= self.devices.len())
        {
            return Err(Error::InvalidArgument(format!(
                "device assignment refers to unknown device {unknown}"
            )));
        }
        Ok(())
    }
}

impl Default for HostClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClient for HostClient {
    fn platform_name(&self) -> &str {
        PLATFORM_NAME
    }

    fn addressable_devices(&self) -> &[Device] {
        &self.devices
    }

    fn default_device_assignment(
        &self,
        num_replicas: usize,
        num_partitions: usize,
    ) -> Result<DeviceAssignment> {
        if num_replicas == 0 || num_partitions == 0 {
            return Err(Error::InvalidArgument(format!(
                "cannot assign {num_replicas} replicas x {num_partitions} partitions"
            )));
        }
        let needed = num_replicas.saturating_mul(num_partitions);
        if needed > self.devices.len() {
            return Err(Error::ResourceExhausted(format!(
                "{num_replicas} replicas x {num_partitions} partitions need {needed} devices, \
                 but only {} are addressable",
                self.devices.len()
            )));
        }
        let ids = (0..needed).map(DeviceId).collect();
        DeviceAssignment::new(num_replicas, num_partitions, ids)
    }

    #[tracing::instrument(skip_all, fields(shape = %literal.shape(), %device))]
    fn buffer_from_host_literal(
        &self,
        literal: &Literal,
        device: &Device,
    ) -> Result<Box<dyn DeviceBuffer>> {
        let index = self.device_index(device)?;
        let reservation = self.memory[index].reserve(literal.shape().byte_size(), device)?;
        let (buffer, writer) =
            HostBuffer::pending(literal.shape().clone(), device.clone(), reservation);
        let bytes = literal.as_bytes().to_vec();

        if self.options.async_transfers {
            std::thread::Builder::new()
                .name("hlorun-h2d".to_string())
                .spawn(move || writer.complete(bytes))
                .map_err(|e| Error::Internal(format!("failed to start transfer thread: {e}")))?;
        } else {
            writer.complete(bytes);
        }
        Ok(Box::new(buffer))
    }

    fn compile(
        &self,
        computation: &Computation,
        options: CompileOptions,
    ) -> Result<Box<dyn LoadedExecutable>> {
        Ok(Box::new(self.compile_host(computation, options)?))
    }
}
