//! Shared programs and runners for runtime integration tests.

use hlorun_client::{HostClient, HostClientOptions};
use hlorun_core::{BinaryOp, DataType, Program, ProgramBuilder, Shape, UnaryOp};
use hlorun_runtime::{PjRtRunner, RunnerConfig};

/// Install a fmt subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Runner over a host client with `num_devices` devices.
pub fn host_runner(num_devices: usize) -> PjRtRunner {
    host_runner_with_config(num_devices, RunnerConfig::default())
}

pub fn host_runner_with_config(num_devices: usize, config: RunnerConfig) -> PjRtRunner {
    let client = HostClient::with_options(HostClientOptions {
        num_devices,
        ..Default::default()
    })
    .expect("host client");
    PjRtRunner::with_config(Box::new(client), config)
}

/// Returns its single parameter unchanged.
pub fn identity_program(dtype: DataType, dims: &[usize]) -> Program {
    let mut builder = ProgramBuilder::new("identity");
    let p = builder.parameter(0, Shape::new(dtype, dims));
    builder.build(p).expect("valid program")
}

/// `op(a, b)` over two parameters of the same shape.
pub fn binary_program(op: BinaryOp, dtype: DataType, dims: &[usize]) -> Program {
    let mut builder = ProgramBuilder::new(format!("{op:?}").to_lowercase());
    let shape = Shape::new(dtype, dims);
    let a = builder.parameter(0, shape.clone());
    let b = builder.parameter(1, shape);
    let c = builder.binary(op, a, b).expect("binary op");
    builder.build(c).expect("valid program")
}

/// `(x, -x)`: a program with two outputs.
pub fn pair_program(dtype: DataType, dims: &[usize]) -> Program {
    let mut builder = ProgramBuilder::new("pair");
    let x = builder.parameter(0, Shape::new(dtype, dims));
    let neg = builder.unary(UnaryOp::Negate, x).expect("negate");
    let root = builder.tuple(&[x, neg]).expect("tuple");
    builder.build(root).expect("valid program")
}

/// Identity program declaring `replicas` replicas.
pub fn replicated_identity_program(replicas: usize) -> Program {
    let mut builder = ProgramBuilder::new("replicated").with_replica_count(replicas);
    let p = builder.parameter(0, Shape::new(DataType::F32, &[2]));
    builder.build(p).expect("valid program")
}

/// `()`: a program whose root is a tuple with no elements.
pub fn empty_tuple_program() -> Program {
    let mut builder = ProgramBuilder::new("empty_tuple");
    let root = builder.tuple(&[]).expect("tuple");
    builder.build(root).expect("valid program")
}
