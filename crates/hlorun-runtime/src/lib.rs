//! Execution runner for hlorun programs.
//!
//! This crate drives a [`DeviceClient`](hlorun_client::DeviceClient) through
//! the lifecycle of a program run:
//!
//! 1. **Planning** - derive compile options and a device assignment from the
//!    program's replica and partition counts
//! 2. **Loading** - compile the program into a loaded executable
//! 3. **Staging** - copy host literals to the device, one at a time
//! 4. **Dispatch** - run the executable on the staging device
//! 5. **Readback** - wait for the output and copy it back to the host
//!
//! [`PjRtRunner`] composes these stages behind the [`ProgramRunner`]
//! interface.

mod config;
mod dispatch;
mod error;
mod executable;
mod loader;
mod planner;
mod runner;
mod transfer;

// Public exports
pub use config::RunnerConfig;
pub use dispatch::ExecutionDispatcher;
pub use error::{Result, RuntimeError};
pub use executable::{
    Executable, ExecutableAdapter, ExecutionInput, ExecutionOutput, ExecutionProfile, RunOptions,
};
pub use loader::CompiledProgramLoader;
pub use planner::DeviceAssignmentPlanner;
pub use runner::{PjRtRunner, ProgramRunner, ReplicatedExecuteOptions};
pub use transfer::HostDeviceTransfer;
