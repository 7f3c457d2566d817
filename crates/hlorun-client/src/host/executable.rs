//! Executables produced by the host compiler.

use super::buffer::{DeviceMemory, HostBuffer};
use super::evaluator;
use crate::client::{DeviceBuffer, LoadedExecutable};
use crate::device::{Device, DeviceAssignment};
use crate::future::ReadyFuture;
use crate::options::ExecuteOptions;
use crate::{Error, Result};
use hlorun_core::{Computation, Literal, Shape};
use std::sync::Arc;

/// A computation compiled for the [`HostClient`](super::HostClient).
///
/// Executing interprets the (possibly optimized) computation on the
/// calling thread; outputs are ready when `execute_sharded` returns.
#[derive(Debug)]
pub struct HostExecutable {
    computation: Computation,
    parameter_shapes: Vec<Shape>,
    device_assignment: DeviceAssignment,
    /// Memory pools of the client's devices, indexed by device id.
    memory: Vec<Arc<DeviceMemory>>,
    passes_applied: Vec<String>,
}

impl HostExecutable {
    pub(crate) fn new(
        computation: Computation,
        device_assignment: DeviceAssignment,
        memory: Vec<Arc<DeviceMemory>>,
        passes_applied: Vec<String>,
    ) -> Self {
        let parameter_shapes = computation.parameter_shapes();
        Self {
            computation,
            parameter_shapes,
            device_assignment,
            memory,
            passes_applied,
        }
    }

    /// The computation as it will be executed, after optimization.
    pub fn computation(&self) -> &Computation {
        &self.computation
    }

    /// Names of the optimization passes that changed the computation.
    pub fn passes_applied(&self) -> &[String] {
        &self.passes_applied
    }

    /// Wait for an argument and read it in the shape of parameter `index`.
    fn read_argument(
        &self,
        index: usize,
        argument: &dyn DeviceBuffer,
        device: &Device,
        options: &ExecuteOptions,
    ) -> Result<Literal> {
        let buffer = argument
            .as_any()
            .downcast_ref::<HostBuffer>()
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "argument {index} was not created by the host client"
                ))
            })?;
        if buffer.device() != device {
            return Err(Error::InvalidArgument(format!(
                "argument {index} lives on {} but execution runs on {device}",
                buffer.device()
            )));
        }

        let expected = &self.parameter_shapes[index];
        let actual = buffer.on_device_shape();
        let compatible = if options.strict_shape_checking {
            actual == expected
        } else {
            actual.dtype() == expected.dtype() && actual.element_count() == expected.element_count()
        };
        if !compatible {
            return Err(Error::InvalidArgument(format!(
                "argument {index} has shape {actual}, parameter expects {expected}"
            )));
        }

        // Blocks until the transfer that produced the argument has landed.
        let bytes = buffer.bytes()?;
        Ok(Literal::from_raw(expected.clone(), bytes.to_vec())?)
    }
}

impl LoadedExecutable for HostExecutable {
    fn name(&self) -> &str {
        &self.computation.name
    }

    fn device_assignment(&self) -> &DeviceAssignment {
        &self.device_assignment
    }

    fn execute_sharded(
        &self,
        arguments: &[&dyn DeviceBuffer],
        device: &Device,
        options: &ExecuteOptions,
        returned_future: &mut Option<ReadyFuture>,
        fill_future: bool,
    ) -> Result<Vec<Box<dyn DeviceBuffer>>> {
        if !self.device_assignment.contains(device.id()) {
            return Err(Error::InvalidArgument(format!(
                "{device} is not part of {}",
                self.device_assignment
            )));
        }
        let memory = self.memory.get(device.id().0).ok_or_else(|| {
            Error::InvalidArgument(format!("{device} does not belong to the host client"))
        })?;
        if arguments.len() != self.parameter_shapes.len() {
            return Err(Error::InvalidArgument(format!(
                "executable '{}' takes {} arguments, got {}",
                self.computation.name,
                self.parameter_shapes.len(),
                arguments.len()
            )));
        }

        let span = tracing::debug_span!(
            "execute_sharded",
            executable = %self.computation.name,
            launch_id = options.launch_id,
            %device,
        );
        let _enter = span.enter();

        let literals = arguments
            .iter()
            .enumerate()
            .map(|(index, &argument)| self.read_argument(index, argument, device, options))
            .collect::<Result<Vec<_>>>()?;

        let outputs = evaluator::evaluate(&self.computation, literals)?;
        tracing::debug!(outputs = outputs.len(), "execution finished");

        let buffers = outputs
            .into_iter()
            .map(|literal| {
                let reservation = memory.reserve(literal.shape().byte_size(), device)?;
                let (shape, bytes) = literal.into_parts();
                let buffer = HostBuffer::ready(shape, device.clone(), bytes, reservation);
                Ok(Box::new(buffer) as Box<dyn DeviceBuffer>)
            })
            .collect::<Result<Vec<_>>>()?;

        if fill_future {
            *returned_future = Some(ReadyFuture::ready());
        }
        Ok(buffers)
    }
}
