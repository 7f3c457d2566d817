//! Device-agnostic program representation.
//!
//! A [`Program`] is an immutable graph of instructions with a declared
//! replica/partition shape. Device clients never see a `Program` directly;
//! they receive a [`Computation`], the flattened submission format produced
//! by [`Program::to_computation`]. Instructions are stored in topological
//! order: every operand id is smaller than the id of the instruction that
//! uses it.

use crate::literal::Literal;
use crate::types::Shape;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;

/// Index of an instruction within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstructionId(pub usize);

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Elementwise operations with one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Abs,
    Exp,
    Copy,
}

/// Elementwise operations with two operands of identical shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Maximum,
    Minimum,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    /// Program argument with the given parameter number.
    Parameter(usize),
    Constant(Literal),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Groups array operands; a tuple root produces one output per element.
    Tuple,
}

/// Shape of an instruction's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    Array(Shape),
    Tuple(Vec<Shape>),
}

impl ValueShape {
    pub fn as_array(&self) -> Option<&Shape> {
        match self {
            ValueShape::Array(shape) => Some(shape),
            ValueShape::Tuple(_) => None,
        }
    }

    /// Flattened list of array shapes (one element for a non-tuple).
    pub fn leaves(&self) -> Vec<Shape> {
        match self {
            ValueShape::Array(shape) => vec![shape.clone()],
            ValueShape::Tuple(shapes) => shapes.clone(),
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Array(shape) => write!(f, "{shape}"),
            ValueShape::Tuple(shapes) => {
                f.write_str("(")?;
                for (i, shape) in shapes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{shape}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<InstructionId>,
    pub shape: ValueShape,
}

impl Instruction {
    /// Compute the result shape of `opcode` applied to operands of the given shapes.
    ///
    /// Parameters carry their own declared shape and cannot be inferred.
    pub fn infer_shape(opcode: &Opcode, operands: &[&ValueShape]) -> Result<ValueShape> {
        match opcode {
            Opcode::Parameter(number) => Err(Error::Shape(format!(
                "parameter {number} has no inferable shape"
            ))),
            Opcode::Constant(literal) => {
                expect_arity("constant", operands, 0)?;
                Ok(ValueShape::Array(literal.shape().clone()))
            }
            Opcode::Unary(op) => {
                expect_arity("unary", operands, 1)?;
                let shape = array_operand(*op, operands[0])?;
                let dtype = shape.dtype();
                let supported = match op {
                    UnaryOp::Copy => true,
                    UnaryOp::Negate | UnaryOp::Abs => dtype.is_signed(),
                    UnaryOp::Exp => dtype.is_float(),
                };
                if !supported {
                    return Err(Error::Shape(format!("{op:?} is not defined for {dtype}")));
                }
                Ok(ValueShape::Array(shape.clone()))
            }
            Opcode::Binary(op) => {
                expect_arity("binary", operands, 2)?;
                let lhs = array_operand(*op, operands[0])?;
                let rhs = array_operand(*op, operands[1])?;
                if lhs != rhs {
                    return Err(Error::Shape(format!(
                        "{op:?} operands disagree: {lhs} vs {rhs}"
                    )));
                }
                let arithmetic = !matches!(op, BinaryOp::Maximum | BinaryOp::Minimum);
                if arithmetic && lhs.dtype() == crate::DataType::Bool {
                    return Err(Error::Shape(format!("{op:?} is not defined for pred")));
                }
                Ok(ValueShape::Array(lhs.clone()))
            }
            Opcode::Tuple => {
                let shapes = operands
                    .iter()
                    .map(|shape| {
                        shape.as_array().cloned().ok_or_else(|| {
                            Error::Shape("nested tuples are not supported".to_string())
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ValueShape::Tuple(shapes))
            }
        }
    }
}

fn expect_arity(kind: &str, operands: &[&ValueShape], expected: usize) -> Result<()> {
    if operands.len() != expected {
        return Err(Error::InvalidProgram(format!(
            "{kind} instruction takes {expected} operands, got {}",
            operands.len()
        )));
    }
    Ok(())
}

fn array_operand<'a>(op: impl fmt::Debug, shape: &'a ValueShape) -> Result<&'a Shape> {
    shape
        .as_array()
        .ok_or_else(|| Error::Shape(format!("{op:?} expects array operands, got {shape}")))
}

/// Declared replica and partition counts of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramConfig {
    pub replica_count: usize,
    pub num_partitions: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            replica_count: 1,
            num_partitions: 1,
        }
    }
}

/// Flattened program in the form submitted to a device client's compiler.
///
/// Unlike [`Program`], a `Computation` is plain data: clients and their
/// optimization passes are free to rewrite it. Call [`Computation::validate`]
/// after receiving or rewriting one.
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    pub name: String,
    pub config: ProgramConfig,
    pub instructions: Vec<Instruction>,
    pub root: InstructionId,
}

impl Computation {
    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions.get(id.0)
    }

    /// The instruction whose value the computation returns.
    ///
    /// # Errors
    /// Returns an error if the root id is out of range.
    pub fn root_instruction(&self) -> Result<&Instruction> {
        self.instruction(self.root).ok_or_else(|| {
            Error::InvalidProgram(format!("root {} is out of range", self.root))
        })
    }

    /// Shapes of the parameters, ordered by parameter number.
    pub fn parameter_shapes(&self) -> Vec<Shape> {
        let mut params: Vec<(usize, Shape)> = self
            .instructions
            .iter()
            .filter_map(|inst| match (&inst.opcode, &inst.shape) {
                (Opcode::Parameter(number), ValueShape::Array(shape)) => {
                    Some((*number, shape.clone()))
                }
                _ => None,
            })
            .collect();
        params.sort_by_key(|(number, _)| *number);
        params.into_iter().map(|(_, shape)| shape).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|inst| matches!(inst.opcode, Opcode::Parameter(_)))
            .count()
    }

    /// Array shapes of the values the computation produces, one per output buffer.
    pub fn output_shapes(&self) -> Vec<Shape> {
        self.instruction(self.root)
            .map(|root| root.shape.leaves())
            .unwrap_or_default()
    }

    /// Check structural well-formedness.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The computation is empty or the root is out of range
    /// - An operand refers to the instruction itself or a later one
    /// - Parameter numbers are not exactly `0..n`
    /// - A recorded shape disagrees with the shape its opcode implies
    /// - The replica or partition count is zero
    pub fn validate(&self) -> Result<()> {
        if self.config.replica_count == 0 || self.config.num_partitions == 0 {
            return Err(Error::InvalidProgram(format!(
                "replica_count={} and num_partitions={} must both be positive",
                self.config.replica_count, self.config.num_partitions
            )));
        }
        if self.instructions.is_empty() {
            return Err(Error::InvalidProgram(format!(
                "computation '{}' has no instructions",
                self.name
            )));
        }
        self.root_instruction()?;

        let mut parameter_numbers = HashSet::new();
        for (index, inst) in self.instructions.iter().enumerate() {
            for operand in &inst.operands {
                if operand.0 >= index {
                    return Err(Error::InvalidProgram(format!(
                        "{} uses {operand}, which is not defined before it",
                        InstructionId(index)
                    )));
                }
            }

            if let Opcode::Parameter(number) = inst.opcode {
                if !inst.operands.is_empty() || inst.shape.as_array().is_none() {
                    return Err(Error::InvalidProgram(format!(
                        "parameter {number} must be an array without operands"
                    )));
                }
                if !parameter_numbers.insert(number) {
                    return Err(Error::InvalidProgram(format!(
                        "parameter {number} is declared twice"
                    )));
                }
                continue;
            }

            let operand_shapes: Vec<&ValueShape> = inst
                .operands
                .iter()
                .map(|id| &self.instructions[id.0].shape)
                .collect();
            let inferred = Instruction::infer_shape(&inst.opcode, &operand_shapes)?;
            if inferred != inst.shape {
                return Err(Error::Shape(format!(
                    "{} records shape {} but computes {inferred}",
                    InstructionId(index),
                    inst.shape
                )));
            }
        }

        if let Some(missing) = (0..parameter_numbers.len()).find(|n| !parameter_numbers.contains(n))
        {
            return Err(Error::InvalidProgram(format!(
                "parameter numbers must be contiguous, {missing} is missing"
            )));
        }
        Ok(())
    }
}

/// Immutable, device-agnostic program.
///
/// Built with [`ProgramBuilder`](crate::ProgramBuilder), which guarantees the
/// program is valid. Cloning is a deep copy; share with `Arc<Program>` when
/// a compiled artifact needs to keep the program alive.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    computation: Computation,
}

impl Program {
    /// Wrap an already validated computation.
    pub(crate) fn from_validated(computation: Computation) -> Self {
        Self { computation }
    }

    /// Build a program from a computation, validating it first.
    ///
    /// # Errors
    /// Returns an error if [`Computation::validate`] fails.
    pub fn from_computation(computation: Computation) -> Result<Self> {
        computation.validate()?;
        Ok(Self { computation })
    }

    pub fn name(&self) -> &str {
        &self.computation.name
    }

    pub fn config(&self) -> ProgramConfig {
        self.computation.config
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.computation.instructions
    }

    pub fn root(&self) -> InstructionId {
        self.computation.root
    }

    pub fn parameter_shapes(&self) -> Vec<Shape> {
        self.computation.parameter_shapes()
    }

    pub fn output_shapes(&self) -> Vec<Shape> {
        self.computation.output_shapes()
    }

    /// Serialize into the submission format consumed by device clients.
    pub fn to_computation(&self) -> Computation {
        self.computation.clone()
    }
}
