//! Compiling programs into loaded executables.

use crate::error::{Result, RuntimeError};
use crate::executable::ExecutableAdapter;
use crate::planner::DeviceAssignmentPlanner;
use hlorun_client::{CompileOptions, DeviceClient, ExecutableBuildOptions, LoadedExecutable};
use hlorun_core::Program;
use std::sync::Arc;

/// Turns device-agnostic programs into executables loaded on a client.
pub struct CompiledProgramLoader<'a> {
    client: &'a dyn DeviceClient,
}

impl<'a> CompiledProgramLoader<'a> {
    pub fn new(client: &'a dyn DeviceClient) -> Self {
        Self { client }
    }

    /// Compile options derived from the program's declared replica and
    /// partition counts.
    ///
    /// Skipping optimization passes (`run_hlo_passes == false`) means the
    /// backend only lowers the program.
    pub fn default_compile_options(
        &self,
        program: &Program,
        run_hlo_passes: bool,
    ) -> Result<CompileOptions> {
        let config = program.config();
        let device_assignment = DeviceAssignmentPlanner::new(self.client)
            .plan(config.replica_count, config.num_partitions)?;

        Ok(CompileOptions {
            executable_build_options: ExecutableBuildOptions {
                device_assignment: Some(device_assignment),
                num_replicas: config.replica_count,
                num_partitions: config.num_partitions,
                run_backend_only: !run_hlo_passes,
            },
        })
    }

    /// Serialize `program` and hand it to the client's compiler.
    pub fn compile(
        &self,
        program: &Program,
        options: CompileOptions,
    ) -> Result<Box<dyn LoadedExecutable>> {
        let computation = program.to_computation();
        self.client
            .compile(&computation, options)
            .map_err(RuntimeError::Compilation)
    }

    /// Compile with default options and wrap the result with its program.
    pub fn load(&self, program: Program, run_hlo_passes: bool) -> Result<ExecutableAdapter> {
        let options = self.default_compile_options(&program, run_hlo_passes)?;
        let executable = self.compile(&program, options)?;
        Ok(ExecutableAdapter::new(Arc::new(program), executable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executable::Executable;
    use hlorun_client::{HostClient, HostClientOptions};
    use hlorun_core::{DataType, ProgramBuilder, Shape};

    fn program(replicas: usize, partitions: usize) -> Program {
        let mut builder = ProgramBuilder::new("identity")
            .with_replica_count(replicas)
            .with_num_partitions(partitions);
        let p = builder.parameter(0, Shape::new(DataType::F32, &[2]));
        builder.build(p).unwrap()
    }

    #[test]
    fn test_default_options_follow_program_config() {
        let client = HostClient::with_options(HostClientOptions {
            num_devices: 4,
            ..Default::default()
        })
        .unwrap();
        let loader = CompiledProgramLoader::new(&client);

        let options = loader.default_compile_options(&program(2, 2), true).unwrap();
        let build = &options.executable_build_options;
        assert_eq!(build.num_replicas, 2);
        assert_eq!(build.num_partitions, 2);
        assert!(!build.run_backend_only);
        let assignment = build.device_assignment.as_ref().unwrap();
        assert_eq!(assignment.replica_count(), 2);
        assert_eq!(assignment.computation_count(), 2);

        let options = loader.default_compile_options(&program(1, 1), false).unwrap();
        assert!(options.executable_build_options.run_backend_only);
    }

    #[test]
    fn test_load_keeps_program() {
        let client = HostClient::new();
        let adapter = CompiledProgramLoader::new(&client)
            .load(program(1, 1), true)
            .unwrap();
        assert_eq!(adapter.program().name(), "identity");
        assert_eq!(adapter.loaded_executable().name(), "identity");
    }

    #[test]
    fn test_compile_error_is_tagged() {
        let client = HostClient::new();
        let loader = CompiledProgramLoader::new(&client);
        let mut options = CompileOptions::default();
        options.executable_build_options.num_replicas = 3;

        let err = loader.compile(&program(1, 1), options).err().unwrap();
        assert!(matches!(err, RuntimeError::Compilation(_)));
    }
}
