//! Shared computations and clients for host client tests.

use hlorun_client::{HostClient, HostClientOptions};
use hlorun_core::{BinaryOp, Computation, DataType, ProgramBuilder, Shape};

/// Client with `num_devices` unbounded devices and asynchronous transfers.
pub fn host_client(num_devices: usize) -> HostClient {
    HostClient::with_options(HostClientOptions {
        num_devices,
        ..Default::default()
    })
    .expect("host client")
}

/// `c = op(a, b)` over two parameters of the same shape.
pub fn binary_computation(op: BinaryOp, dtype: DataType, dims: &[usize]) -> Computation {
    let mut builder = ProgramBuilder::new(format!("{op:?}").to_lowercase());
    let shape = Shape::new(dtype, dims);
    let a = builder.parameter(0, shape.clone());
    let b = builder.parameter(1, shape);
    let c = builder.binary(op, a, b).expect("binary op");
    builder.build(c).expect("valid program").to_computation()
}

/// Returns its single parameter unchanged.
pub fn identity_computation(shape: Shape) -> Computation {
    let mut builder = ProgramBuilder::new("identity");
    let p = builder.parameter(0, shape);
    builder.build(p).expect("valid program").to_computation()
}
