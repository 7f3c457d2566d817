//! End-to-end tests for the PjRt runner over the host client.

mod common;

use common::{
    binary_program, empty_tuple_program, host_runner, host_runner_with_config, identity_program,
    init_tracing, pair_program, replicated_identity_program,
};
use hlorun_client::Error as ClientError;
use hlorun_core::{BinaryOp, DataType, Literal, Program, ProgramBuilder, Shape, UnaryOp};
use hlorun_runtime::{
    Executable, ExecutionInput, ExecutionProfile, ProgramRunner, ReplicatedExecuteOptions,
    RunOptions, RunnerConfig, RuntimeError,
};
use std::any::Any;

#[test]
fn test_identity_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let runner = host_runner(1);
    let input = Literal::from_vec(vec![1.0f32, 2.0], &[2]);

    let output = runner.execute(identity_program(DataType::F32, &[2]), &[&input], true)?;

    assert_eq!(output, input);
    assert_eq!(output.to_vec::<f32>()?, vec![1.0, 2.0]);
    Ok(())
}

#[test]
fn test_too_many_replicas_fails_before_compilation() {
    let runner = host_runner(1);
    let input = Literal::from_vec(vec![1.0f32, 2.0], &[2]);

    let err = runner
        .execute(replicated_identity_program(1000), &[&input], true)
        .unwrap_err();

    assert!(
        matches!(err, RuntimeError::DeviceTopology(ClientError::ResourceExhausted(_))),
        "{err}"
    );
}

#[test]
fn test_results_match_with_and_without_passes() -> anyhow::Result<()> {
    let runner = host_runner(1);
    let mut builder = ProgramBuilder::new("negneg_plus_const");
    let x = builder.parameter(0, Shape::new(DataType::I32, &[3]));
    let n1 = builder.unary(UnaryOp::Negate, x)?;
    let n2 = builder.unary(UnaryOp::Negate, n1)?;
    let a = builder.constant(Literal::from_vec(vec![1i32, 2, 3], &[3]));
    let b = builder.constant(Literal::from_vec(vec![10i32, 20, 30], &[3]));
    let c = builder.binary(BinaryOp::Add, a, b)?;
    let out = builder.binary(BinaryOp::Add, n2, c)?;
    let program = builder.build(out)?;

    let input = Literal::from_vec(vec![5i32, -6, 7], &[3]);
    let optimized = runner.execute(program.clone(), &[&input], true)?;
    let backend_only = runner.execute(program, &[&input], false)?;

    assert_eq!(optimized.to_vec::<i32>()?, vec![16, 16, 40]);
    assert_eq!(optimized, backend_only);
    Ok(())
}

#[test]
fn test_executable_is_reusable() -> anyhow::Result<()> {
    let runner = host_runner(1);
    let executable =
        runner.create_executable(binary_program(BinaryOp::Multiply, DataType::F64, &[2]), true)?;

    let first = runner.execute_with_executable(
        executable.as_ref(),
        &[
            &Literal::from_vec(vec![1.0f64, 2.0], &[2]),
            &Literal::from_vec(vec![3.0f64, 4.0], &[2]),
        ],
    )?;
    let second = runner.execute_with_executable(
        executable.as_ref(),
        &[
            &Literal::from_vec(vec![-1.0f64, 0.5], &[2]),
            &Literal::from_vec(vec![2.0f64, 8.0], &[2]),
        ],
    )?;

    assert_eq!(first.to_vec::<f64>()?, vec![3.0, 8.0]);
    assert_eq!(second.to_vec::<f64>()?, vec![-2.0, 4.0]);
    assert_eq!(executable.program().name(), "multiply");
    Ok(())
}

#[test]
#[should_panic(expected = "expected exactly one")]
fn test_multiple_outputs_abort() {
    let runner = host_runner(1);
    let input = Literal::from_vec(vec![1i32, 2], &[2]);
    let _ = runner.execute(pair_program(DataType::I32, &[2]), &[&input], true);
}

#[test]
#[should_panic(expected = "produced 0 outputs, expected exactly one")]
fn test_zero_outputs_abort() {
    let runner = host_runner(1);
    let _ = runner.execute(empty_tuple_program(), &[], true);
}

#[test]
fn test_replicated_entry_points_unimplemented() -> anyhow::Result<()> {
    let runner = host_runner(2);
    let options = ReplicatedExecuteOptions::default();

    let err = runner
        .execute_replicated(identity_program(DataType::F32, &[2]), &options)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented(_)));

    let executable = runner.create_executable(identity_program(DataType::F32, &[2]), true)?;
    let input = Literal::from_vec(vec![1.0f32, 2.0], &[2]);
    let options = ReplicatedExecuteOptions {
        num_replicas: 2,
        arguments: vec![&input],
        run_hlo_passes: true,
        use_threads: true,
    };
    let assignment = runner.client().default_device_assignment(2, 1)?;

    let err = runner
        .execute_replicated_with_executable(executable.as_ref(), &options, None)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented(_)));
    let err = runner
        .execute_replicated_with_executable(executable.as_ref(), &options, Some(&assignment))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented(_)));

    let err = runner
        .execute_replicated_with_providers(
            &|_| Some(executable.as_ref()),
            &|_| 1,
            &|_, _| Some(&input),
            &options,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented(_)));
    Ok(())
}

#[test]
fn test_execute_async_on_stream_unimplemented() -> anyhow::Result<()> {
    let runner = host_runner(1);
    let executable = runner.create_executable(identity_program(DataType::F32, &[2]), false)?;

    let err = executable
        .execute_async_on_stream(&RunOptions::default(), Vec::new(), None)
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Unimplemented("Unimplemented ExecuteAsyncOnStream".to_string())
    );

    let argument = runner.transfer_literal_to_device(&Literal::from_vec(vec![1.0f32, 2.0], &[2]))?;
    let mut profile = ExecutionProfile::default();
    let err = executable
        .execute_async_on_stream(
            &RunOptions { launch_id: 7 },
            vec![ExecutionInput { buffer: argument }],
            Some(&mut profile),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unimplemented(_)));
    Ok(())
}

struct ForeignExecutable {
    program: Program,
}

impl Executable for ForeignExecutable {
    fn program(&self) -> &Program {
        &self.program
    }

    fn execute_async_on_stream(
        &self,
        _run_options: &RunOptions,
        _arguments: Vec<ExecutionInput>,
        _profile: Option<&mut ExecutionProfile>,
    ) -> hlorun_runtime::Result<hlorun_runtime::ExecutionOutput> {
        Ok(Default::default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_foreign_executable_rejected() {
    let runner = host_runner(1);
    let foreign = ForeignExecutable {
        program: identity_program(DataType::F32, &[2]),
    };
    let err = runner
        .execute_with_executable(&foreign, &[&Literal::from_vec(vec![1.0f32, 2.0], &[2])])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArgument(_)));
}

#[test]
fn test_execution_errors_are_tagged() {
    let runner = host_runner(1);

    let err = runner
        .execute(
            binary_program(BinaryOp::Add, DataType::F32, &[2]),
            &[&Literal::from_vec(vec![1.0f32, 2.0], &[2])],
            true,
        )
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::Execution(ClientError::InvalidArgument(_))),
        "{err}"
    );

    let err = runner
        .execute(
            binary_program(BinaryOp::Divide, DataType::U32, &[1]),
            &[
                &Literal::from_vec(vec![1u32], &[1]),
                &Literal::from_vec(vec![0u32], &[1]),
            ],
            true,
        )
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Execution(ClientError::Internal("integer division by zero".to_string()))
    );
}

#[test]
fn test_device_index_selects_device() -> anyhow::Result<()> {
    let runner = host_runner_with_config(2, RunnerConfig { device_index: 1 });
    let buffer = runner.transfer_literal_to_device(&Literal::scalar(1.0f32))?;
    assert_eq!(buffer.device().id().0, 1);

    // The default 1x1 assignment does not include device 1.
    let err = runner
        .execute(
            identity_program(DataType::F32, &[]),
            &[&Literal::scalar(1.0f32)],
            true,
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Execution(_)), "{err}");
    Ok(())
}

#[test]
fn test_device_index_out_of_range() {
    let runner = host_runner_with_config(1, RunnerConfig { device_index: 3 });
    let err = runner
        .transfer_literal_to_device(&Literal::scalar(1.0f32))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArgument(_)));
}

#[test]
fn test_device_index_checked_before_compile() {
    let runner = host_runner_with_config(1, RunnerConfig { device_index: 3 });
    let input = Literal::from_vec(vec![1.0f32, 2.0], &[2]);

    // Compiling this program would fail with DeviceTopology.
    let err = runner
        .execute(replicated_identity_program(1000), &[&input], true)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidArgument(_)), "{err}");
}

#[test]
fn test_lower_level_pipeline() -> anyhow::Result<()> {
    let runner = host_runner(1);
    assert_eq!(runner.name(), "PjRtRunner");

    let program = binary_program(BinaryOp::Maximum, DataType::I64, &[3]);
    let options = runner.default_compile_options(&program, true)?;
    let executable = runner.compile(&program, options)?;

    let a = Literal::from_vec(vec![1i64, 9, -4], &[3]);
    let b = Literal::from_vec(vec![5i64, 2, -8], &[3]);
    let arguments = runner.transfer_literals_to_device(&[&a, &b])?;
    assert!(arguments.iter().all(|buffer| buffer.ready_future().is_ready()));

    let outputs = runner.execute_with_device_buffers(executable.as_ref(), &arguments)?;
    assert_eq!(outputs.len(), 1);
    let result = runner.transfer_literal_from_device(outputs[0].as_ref())?;
    assert_eq!(result.to_vec::<i64>()?, vec![5, 9, -4]);
    Ok(())
}

#[pollster::test]
async fn test_output_ready_future_resolves() -> anyhow::Result<()> {
    let runner = host_runner(1);
    let program = identity_program(DataType::U8, &[4]);
    let executable = runner.compile(&program, runner.default_compile_options(&program, false)?)?;
    let arguments =
        runner.transfer_literals_to_device(&[&Literal::from_vec(vec![1u8, 2, 3, 4], &[4])])?;

    let outputs = runner.execute_with_device_buffers(executable.as_ref(), &arguments)?;
    outputs[0].ready_future().await?;
    assert_eq!(outputs[0].to_literal_sync()?.to_vec::<u8>()?, vec![1, 2, 3, 4]);
    Ok(())
}
