//! Incremental construction of [`Program`]s.

use crate::literal::Literal;
use crate::program::{
    BinaryOp, Computation, Instruction, InstructionId, Opcode, Program, ProgramConfig, UnaryOp,
    ValueShape,
};
use crate::types::Shape;
use crate::{Error, Result};

/// Builds a [`Program`] one instruction at a time.
///
/// Instructions can only refer to instructions created earlier, so the
/// result is always topologically ordered. Shapes are inferred as
/// instructions are added; [`ProgramBuilder::build`] runs the full
/// validation before handing out the immutable program.
///
/// # Example
///
/// ```
/// use hlorun_core::{BinaryOp, DataType, ProgramBuilder, Shape};
///
/// # fn main() -> Result<(), hlorun_core::Error> {
/// let mut builder = ProgramBuilder::new("add");
/// let shape = Shape::new(DataType::F32, &[2]);
/// let a = builder.parameter(0, shape.clone());
/// let b = builder.parameter(1, shape);
/// let sum = builder.binary(BinaryOp::Add, a, b)?;
/// let program = builder.build(sum)?;
/// assert_eq!(program.parameter_shapes().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    name: String,
    config: ProgramConfig,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ProgramConfig::default(),
            instructions: Vec::new(),
        }
    }

    /// Declare how many replicas the program runs on.
    pub fn with_replica_count(mut self, replica_count: usize) -> Self {
        self.config.replica_count = replica_count;
        self
    }

    /// Declare how many partitions the program is split into.
    pub fn with_num_partitions(mut self, num_partitions: usize) -> Self {
        self.config.num_partitions = num_partitions;
        self
    }

    /// Add parameter `number` with the given shape.
    ///
    /// Duplicate or missing parameter numbers are reported by `build`.
    pub fn parameter(&mut self, number: usize, shape: Shape) -> InstructionId {
        self.push(Opcode::Parameter(number), vec![], ValueShape::Array(shape))
    }

    pub fn constant(&mut self, literal: Literal) -> InstructionId {
        let shape = ValueShape::Array(literal.shape().clone());
        self.push(Opcode::Constant(literal), vec![], shape)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: InstructionId) -> Result<InstructionId> {
        self.add_instruction(Opcode::Unary(op), vec![operand])
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: InstructionId,
        rhs: InstructionId,
    ) -> Result<InstructionId> {
        self.add_instruction(Opcode::Binary(op), vec![lhs, rhs])
    }

    pub fn tuple(&mut self, elements: &[InstructionId]) -> Result<InstructionId> {
        self.add_instruction(Opcode::Tuple, elements.to_vec())
    }

    /// Shape of an instruction added so far.
    pub fn shape_of(&self, id: InstructionId) -> Option<&ValueShape> {
        self.instructions.get(id.0).map(|inst| &inst.shape)
    }

    /// Finish the program with `root` as its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the program fails validation (unknown root,
    /// non-contiguous parameter numbers, zero replicas or partitions).
    pub fn build(self, root: InstructionId) -> Result<Program> {
        let computation = Computation {
            name: self.name,
            config: self.config,
            instructions: self.instructions,
            root,
        };
        computation.validate()?;
        Ok(Program::from_validated(computation))
    }

    fn add_instruction(
        &mut self,
        opcode: Opcode,
        operands: Vec<InstructionId>,
    ) -> Result<InstructionId> {
        let operand_shapes = operands
            .iter()
            .map(|&id| {
                self.shape_of(id).ok_or_else(|| {
                    Error::InvalidProgram(format!("operand {id} does not exist"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let shape = Instruction::infer_shape(&opcode, &operand_shapes)?;
        Ok(self.push(opcode, operands, shape))
    }

    fn push(
        &mut self,
        opcode: Opcode,
        operands: Vec<InstructionId>,
        shape: ValueShape,
    ) -> InstructionId {
        let id = InstructionId(self.instructions.len());
        self.instructions.push(Instruction {
            opcode,
            operands,
            shape,
        });
        id
    }
}
