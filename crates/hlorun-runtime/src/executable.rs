//! The runner's generic executable abstraction and its device-backed adapter.

use crate::error::{Result, RuntimeError};
use hlorun_client::{DeviceBuffer, LoadedExecutable};
use hlorun_core::Program;
use std::any::Any;
use std::sync::Arc;

/// Options for [`Executable::execute_async_on_stream`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub launch_id: i32,
}

/// One argument handed to [`Executable::execute_async_on_stream`].
#[derive(Debug)]
pub struct ExecutionInput {
    pub buffer: Box<dyn DeviceBuffer>,
}

/// Buffers produced by [`Executable::execute_async_on_stream`].
#[derive(Debug, Default)]
pub struct ExecutionOutput {
    pub buffers: Vec<Box<dyn DeviceBuffer>>,
}

/// Timing collected by an execution, when the caller asks for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionProfile {
    pub compute_time_ns: u64,
}

/// A compiled program as seen by code that is generic over runners.
pub trait Executable: Send + Sync {
    /// The program this executable was compiled from.
    fn program(&self) -> &Program;

    /// Stream-based execution entry point shared by all executables.
    fn execute_async_on_stream(
        &self,
        run_options: &RunOptions,
        arguments: Vec<ExecutionInput>,
        profile: Option<&mut ExecutionProfile>,
    ) -> Result<ExecutionOutput>;

    fn as_any(&self) -> &dyn Any;
}

/// Wraps a [`LoadedExecutable`] together with the program it came from.
///
/// The program is shared so it stays alive for as long as the executable
/// does. Runners execute the wrapped executable directly through
/// [`ExecutableAdapter::loaded_executable`]; the stream entry point is not
/// supported.
pub struct ExecutableAdapter {
    program: Arc<Program>,
    executable: Box<dyn LoadedExecutable>,
}

impl ExecutableAdapter {
    pub fn new(program: Arc<Program>, executable: Box<dyn LoadedExecutable>) -> Self {
        Self {
            program,
            executable,
        }
    }

    pub fn loaded_executable(&self) -> &dyn LoadedExecutable {
        self.executable.as_ref()
    }

    pub fn shared_program(&self) -> Arc<Program> {
        Arc::clone(&self.program)
    }
}

impl Executable for ExecutableAdapter {
    fn program(&self) -> &Program {
        &self.program
    }

    fn execute_async_on_stream(
        &self,
        _run_options: &RunOptions,
        _arguments: Vec<ExecutionInput>,
        _profile: Option<&mut ExecutionProfile>,
    ) -> Result<ExecutionOutput> {
        Err(RuntimeError::Unimplemented(
            "Unimplemented ExecuteAsyncOnStream".to_string(),
        ))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ExecutableAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableAdapter")
            .field("program", &self.program.name())
            .field("executable", &self.executable.name())
            .finish()
    }
}
