//! Core program representation and host data types for hlorun.
//!
//! This crate provides the device-agnostic pieces every other hlorun crate
//! depends on:
//! - Element types and array shapes (`DataType`, `Shape`)
//! - Host-resident tensor values (`Literal`)
//! - The immutable program representation (`Program`) and its builder
//! - The flattened submission format handed to device clients (`Computation`)

pub mod builder;
pub mod literal;
pub mod program;
pub mod types;

// Re-export commonly used types
pub use builder::ProgramBuilder;
pub use literal::Literal;
pub use program::{
    BinaryOp, Computation, Instruction, InstructionId, Opcode, Program, ProgramConfig, UnaryOp,
    ValueShape,
};
pub use types::{DataType, NativeType, Shape};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hlorun-core operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: DataType, got: DataType },

    #[error("Invalid literal: {0}")]
    Literal(String),
}
