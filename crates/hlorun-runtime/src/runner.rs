//! End-to-end orchestration: compile, stage, execute, read back.

use crate::config::RunnerConfig;
use crate::dispatch::ExecutionDispatcher;
use crate::error::{Result, RuntimeError};
use crate::executable::{Executable, ExecutableAdapter};
use crate::loader::CompiledProgramLoader;
use crate::transfer::HostDeviceTransfer;
use hlorun_client::{
    CompileOptions, Device, DeviceAssignment, DeviceBuffer, DeviceClient, LoadedExecutable,
};
use hlorun_core::{Literal, Program};

/// Options for the replicated entry points of [`ProgramRunner`].
#[derive(Debug, Clone, Default)]
pub struct ReplicatedExecuteOptions<'a> {
    pub num_replicas: usize,
    /// Arguments shared by every replica.
    pub arguments: Vec<&'a Literal>,
    pub run_hlo_passes: bool,
    /// Drive each replica from its own thread.
    pub use_threads: bool,
}

/// Interface shared by interchangeable program runners.
pub trait ProgramRunner {
    /// Identifies the runner implementation.
    fn name(&self) -> &str;

    fn create_executable(
        &self,
        program: Program,
        run_hlo_passes: bool,
    ) -> Result<Box<dyn Executable>>;

    /// Compile `program` and run it once on `arguments`.
    fn execute(
        &self,
        program: Program,
        arguments: &[&Literal],
        run_hlo_passes: bool,
    ) -> Result<Literal>;

    /// Run an executable created by this runner.
    fn execute_with_executable(
        &self,
        executable: &dyn Executable,
        arguments: &[&Literal],
    ) -> Result<Literal>;

    /// Compile `program` and run it on every replica.
    fn execute_replicated(
        &self,
        program: Program,
        options: &ReplicatedExecuteOptions<'_>,
    ) -> Result<Vec<Literal>>;

    /// Run a compiled executable on every replica of `device_assignment`.
    fn execute_replicated_with_executable(
        &self,
        executable: &dyn Executable,
        options: &ReplicatedExecuteOptions<'_>,
        device_assignment: Option<&DeviceAssignment>,
    ) -> Result<Vec<Literal>>;

    /// Run per-replica executables on per-replica arguments.
    ///
    /// `executable_provider(replica)` supplies each replica's executable,
    /// `argument_count_provider(replica)` its argument count and
    /// `argument_provider(replica, index)` each argument.
    fn execute_replicated_with_providers<'a>(
        &self,
        executable_provider: &dyn Fn(usize) -> Option<&'a dyn Executable>,
        argument_count_provider: &dyn Fn(usize) -> usize,
        argument_provider: &dyn Fn(usize, usize) -> Option<&'a Literal>,
        options: &ReplicatedExecuteOptions<'_>,
        device_assignment: Option<&DeviceAssignment>,
    ) -> Result<Vec<Literal>>;
}

/// Runner driving a [`DeviceClient`].
///
/// Inputs are staged on, and executions dispatched to, the single device
/// selected by [`RunnerConfig::device_index`]. Executions must produce
/// exactly one output buffer.
///
/// # Example
/// ```
/// use hlorun_client::HostClient;
/// use hlorun_core::{DataType, Literal, ProgramBuilder, Shape};
/// use hlorun_runtime::{PjRtRunner, ProgramRunner};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = ProgramBuilder::new("identity");
/// let p = builder.parameter(0, Shape::new(DataType::F32, &[2]));
/// let program = builder.build(p)?;
///
/// let runner = PjRtRunner::new(Box::new(HostClient::new()));
/// let result = runner.execute(program, &[&Literal::from_vec(vec![1.0f32, 2.0], &[2])], true)?;
/// assert_eq!(result.to_vec::<f32>()?, vec![1.0, 2.0]);
/// # Ok(())
/// # }
/// ```
pub struct PjRtRunner {
    client: Box<dyn DeviceClient>,
    config: RunnerConfig,
}

impl PjRtRunner {
    pub fn new(client: Box<dyn DeviceClient>) -> Self {
        Self::with_config(client, RunnerConfig::default())
    }

    pub fn with_config(client: Box<dyn DeviceClient>, config: RunnerConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &dyn DeviceClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The device all transfers and executions of this runner use.
    ///
    /// # Errors
    /// Returns [`RuntimeError::InvalidArgument`] if the configured index is
    /// out of range for the client.
    pub fn device(&self) -> Result<&Device> {
        let devices = self.client.addressable_devices();
        devices.get(self.config.device_index).ok_or_else(|| {
            RuntimeError::InvalidArgument(format!(
                "device index {} out of range, {} client has {} addressable devices",
                self.config.device_index,
                self.client.platform_name(),
                devices.len()
            ))
        })
    }

    fn loader(&self) -> CompiledProgramLoader<'_> {
        CompiledProgramLoader::new(self.client.as_ref())
    }

    fn transfer(&self) -> Result<HostDeviceTransfer<'_>> {
        Ok(HostDeviceTransfer::new(self.client.as_ref(), self.device()?))
    }

    pub fn default_compile_options(
        &self,
        program: &Program,
        run_hlo_passes: bool,
    ) -> Result<CompileOptions> {
        self.loader().default_compile_options(program, run_hlo_passes)
    }

    pub fn compile(
        &self,
        program: &Program,
        options: CompileOptions,
    ) -> Result<Box<dyn LoadedExecutable>> {
        self.loader().compile(program, options)
    }

    pub fn transfer_literal_to_device(&self, literal: &Literal) -> Result<Box<dyn DeviceBuffer>> {
        self.transfer()?.to_device(literal)
    }

    /// Stage `literals` in order; every returned buffer is ready.
    pub fn transfer_literals_to_device(
        &self,
        literals: &[&Literal],
    ) -> Result<Vec<Box<dyn DeviceBuffer>>> {
        self.transfer()?.to_device_batch(literals)
    }

    pub fn transfer_literal_from_device(&self, buffer: &dyn DeviceBuffer) -> Result<Literal> {
        self.transfer()?.from_device(buffer)
    }

    pub fn execute_with_device_buffers(
        &self,
        executable: &dyn LoadedExecutable,
        arguments: &[Box<dyn DeviceBuffer>],
    ) -> Result<Vec<Box<dyn DeviceBuffer>>> {
        ExecutionDispatcher::new(self.device()?).execute(executable, arguments)
    }

    /// Run an already compiled executable on host arguments.
    ///
    /// # Panics
    /// Panics if the execution produces a number of outputs other than one.
    #[tracing::instrument(skip_all, fields(program = executable.program().name(), arguments = arguments.len()))]
    pub fn run_compiled(
        &self,
        executable: &ExecutableAdapter,
        arguments: &[&Literal],
    ) -> Result<Literal> {
        let device = self.device()?;
        let transfer = HostDeviceTransfer::new(self.client.as_ref(), device);

        let argument_buffers = transfer.to_device_batch(arguments)?;
        let outputs = ExecutionDispatcher::new(device)
            .execute(executable.loaded_executable(), &argument_buffers)?;

        // Multi-output executions are not supported by this runner.
        assert_eq!(
            outputs.len(),
            1,
            "executable '{}' produced {} outputs, expected exactly one",
            executable.loaded_executable().name(),
            outputs.len()
        );
        transfer.from_device(outputs[0].as_ref())
    }

    fn replicated_unimplemented() -> RuntimeError {
        RuntimeError::Unimplemented("PjRtRunner does not support ExecuteReplicated".to_string())
    }
}

impl ProgramRunner for PjRtRunner {
    fn name(&self) -> &str {
        "PjRtRunner"
    }

    #[tracing::instrument(skip_all, fields(program = program.name(), run_hlo_passes = run_hlo_passes))]
    fn create_executable(
        &self,
        program: Program,
        run_hlo_passes: bool,
    ) -> Result<Box<dyn Executable>> {
        Ok(Box::new(self.loader().load(program, run_hlo_passes)?))
    }

    #[tracing::instrument(skip_all, fields(program = program.name(), run_hlo_passes = run_hlo_passes))]
    fn execute(
        &self,
        program: Program,
        arguments: &[&Literal],
        run_hlo_passes: bool,
    ) -> Result<Literal> {
        // An unusable device index must surface before any compile work.
        self.device()?;
        let executable = self.loader().load(program, run_hlo_passes)?;
        self.run_compiled(&executable, arguments)
    }

    fn execute_with_executable(
        &self,
        executable: &dyn Executable,
        arguments: &[&Literal],
    ) -> Result<Literal> {
        let adapter = executable
            .as_any()
            .downcast_ref::<ExecutableAdapter>()
            .ok_or_else(|| {
                RuntimeError::InvalidArgument(format!(
                    "executable for '{}' was not created by {}",
                    executable.program().name(),
                    self.name()
                ))
            })?;
        self.run_compiled(adapter, arguments)
    }

    fn execute_replicated(
        &self,
        _program: Program,
        _options: &ReplicatedExecuteOptions<'_>,
    ) -> Result<Vec<Literal>> {
        Err(Self::replicated_unimplemented())
    }

    fn execute_replicated_with_executable(
        &self,
        _executable: &dyn Executable,
        _options: &ReplicatedExecuteOptions<'_>,
        _device_assignment: Option<&DeviceAssignment>,
    ) -> Result<Vec<Literal>> {
        Err(Self::replicated_unimplemented())
    }

    fn execute_replicated_with_providers<'a>(
        &self,
        _executable_provider: &dyn Fn(usize) -> Option<&'a dyn Executable>,
        _argument_count_provider: &dyn Fn(usize) -> usize,
        _argument_provider: &dyn Fn(usize, usize) -> Option<&'a Literal>,
        _options: &ReplicatedExecuteOptions<'_>,
        _device_assignment: Option<&DeviceAssignment>,
    ) -> Result<Vec<Literal>> {
        Err(Self::replicated_unimplemented())
    }
}
