//! Reference interpreter for computations on host literals.

use crate::{Error, Result};
use hlorun_core::{BinaryOp, Computation, DataType, Literal, NativeType, Opcode, UnaryOp};

/// Value produced by one instruction.
#[derive(Debug, Clone)]
enum Value {
    Array(Literal),
    Tuple(Vec<Literal>),
}

impl Value {
    fn as_array(&self) -> Result<&Literal> {
        match self {
            Value::Array(literal) => Ok(literal),
            Value::Tuple(_) => Err(Error::Internal(
                "tuple value used where an array is expected".to_string(),
            )),
        }
    }
}

/// Evaluate `computation` on `arguments`, ordered by parameter number.
///
/// Returns one literal per output: the elements of a tuple root, or the
/// root value itself.
pub(crate) fn evaluate(computation: &Computation, arguments: Vec<Literal>) -> Result<Vec<Literal>> {
    let mut arguments: Vec<Option<Literal>> = arguments.into_iter().map(Some).collect();
    let mut values: Vec<Value> = Vec::with_capacity(computation.instructions.len());

    for inst in &computation.instructions {
        let value = match &inst.opcode {
            Opcode::Parameter(number) => {
                let argument = arguments
                    .get_mut(*number)
                    .and_then(Option::take)
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!("no argument for parameter {number}"))
                    })?;
                Value::Array(argument)
            }
            Opcode::Tuple => Value::Tuple(
                inst.operands
                    .iter()
                    .map(|id| values[id.0].as_array().cloned())
                    .collect::<Result<Vec<_>>>()?,
            ),
            opcode => {
                let operands = inst
                    .operands
                    .iter()
                    .map(|id| values[id.0].as_array())
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(apply(opcode, &operands)?)
            }
        };
        values.push(value);
    }

    match values.swap_remove(computation.root.0) {
        Value::Array(literal) => Ok(vec![literal]),
        Value::Tuple(literals) => Ok(literals),
    }
}

/// Apply a single array-producing opcode to literal operands.
pub(crate) fn apply(opcode: &Opcode, operands: &[&Literal]) -> Result<Literal> {
    match (opcode, operands) {
        (Opcode::Constant(literal), []) => Ok(literal.clone()),
        (Opcode::Unary(UnaryOp::Copy), [input]) => Ok((*input).clone()),
        (Opcode::Unary(op), [input]) => match input.dtype() {
            DataType::U8 => map_unary::<u8>(*op, input),
            DataType::U32 => map_unary::<u32>(*op, input),
            DataType::I32 => map_unary::<i32>(*op, input),
            DataType::I64 => map_unary::<i64>(*op, input),
            DataType::F32 => map_unary::<f32>(*op, input),
            DataType::F64 => map_unary::<f64>(*op, input),
            DataType::Bool => Err(undefined(*op, DataType::Bool)),
        },
        (Opcode::Binary(op), [lhs, rhs]) => {
            if lhs.shape() != rhs.shape() {
                return Err(Error::InvalidArgument(format!(
                    "{op:?} operands disagree: {} vs {}",
                    lhs.shape(),
                    rhs.shape()
                )));
            }
            match lhs.dtype() {
                DataType::U8 => map_binary::<u8>(*op, lhs, rhs),
                DataType::U32 => map_binary::<u32>(*op, lhs, rhs),
                DataType::I32 => map_binary::<i32>(*op, lhs, rhs),
                DataType::I64 => map_binary::<i64>(*op, lhs, rhs),
                DataType::F32 => map_binary::<f32>(*op, lhs, rhs),
                DataType::F64 => map_binary::<f64>(*op, lhs, rhs),
                DataType::Bool => bool_binary(*op, lhs, rhs),
            }
        }
        (opcode, operands) => Err(Error::Internal(format!(
            "cannot evaluate {opcode:?} with {} operands",
            operands.len()
        ))),
    }
}

fn undefined(op: impl std::fmt::Debug, dtype: DataType) -> Error {
    Error::Unimplemented(format!("{op:?} is not defined for {dtype}"))
}

fn map_unary<T: Element>(op: UnaryOp, input: &Literal) -> Result<Literal> {
    let values = input
        .to_vec::<T>()?
        .into_iter()
        .map(|x| T::unary(op, x))
        .collect::<Result<Vec<_>>>()?;
    Ok(Literal::from_vec(values, input.dims()))
}

fn map_binary<T: Element>(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> Result<Literal> {
    let values = lhs
        .to_vec::<T>()?
        .into_iter()
        .zip(rhs.to_vec::<T>()?)
        .map(|(a, b)| T::binary(op, a, b))
        .collect::<Result<Vec<_>>>()?;
    Ok(Literal::from_vec(values, lhs.dims()))
}

fn bool_binary(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> Result<Literal> {
    let combine: fn(bool, bool) -> bool = match op {
        BinaryOp::Maximum => |a, b| a || b,
        BinaryOp::Minimum => |a, b| a && b,
        _ => return Err(undefined(op, DataType::Bool)),
    };
    let values: Vec<bool> = lhs
        .to_bools()?
        .into_iter()
        .zip(rhs.to_bools()?)
        .map(|(a, b)| combine(a, b))
        .collect();
    Ok(Literal::from_bools(&values, lhs.dims()))
}

/// Elementwise arithmetic for one element type.
trait Element: NativeType + PartialOrd {
    fn unary(op: UnaryOp, x: Self) -> Result<Self>;
    fn binary(op: BinaryOp, a: Self, b: Self) -> Result<Self>;
}

macro_rules! int_binary {
    () => {
        fn binary(op: BinaryOp, a: Self, b: Self) -> Result<Self> {
            Ok(match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Subtract => a.wrapping_sub(b),
                BinaryOp::Multiply => a.wrapping_mul(b),
                BinaryOp::Divide => {
                    if b == 0 {
                        return Err(Error::Internal("integer division by zero".to_string()));
                    }
                    a.wrapping_div(b)
                }
                BinaryOp::Maximum => if a > b { a } else { b },
                BinaryOp::Minimum => if a < b { a } else { b },
            })
        }
    };
}

macro_rules! signed_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                fn unary(op: UnaryOp, x: Self) -> Result<Self> {
                    match op {
                        UnaryOp::Copy => Ok(x),
                        UnaryOp::Negate => Ok(x.wrapping_neg()),
                        UnaryOp::Abs => Ok(x.wrapping_abs()),
                        UnaryOp::Exp => Err(undefined(op, <$ty as NativeType>::DTYPE)),
                    }
                }

                int_binary!();
            }
        )*
    };
}

macro_rules! unsigned_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                fn unary(op: UnaryOp, x: Self) -> Result<Self> {
                    match op {
                        UnaryOp::Copy => Ok(x),
                        _ => Err(undefined(op, <$ty as NativeType>::DTYPE)),
                    }
                }

                int_binary!();
            }
        )*
    };
}

signed_element!(i32, i64);
unsigned_element!(u8, u32);

macro_rules! float_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                fn unary(op: UnaryOp, x: Self) -> Result<Self> {
                    Ok(match op {
                        UnaryOp::Copy => x,
                        UnaryOp::Negate => -x,
                        UnaryOp::Abs => x.abs(),
                        UnaryOp::Exp => x.exp(),
                    })
                }

                fn binary(op: BinaryOp, a: Self, b: Self) -> Result<Self> {
                    Ok(match op {
                        BinaryOp::Add => a + b,
                        BinaryOp::Subtract => a - b,
                        BinaryOp::Multiply => a * b,
                        BinaryOp::Divide => a / b,
                        // NaN propagates through max/min.
                        BinaryOp::Maximum if a.is_nan() || b.is_nan() => <$ty>::NAN,
                        BinaryOp::Minimum if a.is_nan() || b.is_nan() => <$ty>::NAN,
                        BinaryOp::Maximum => a.max(b),
                        BinaryOp::Minimum => a.min(b),
                    })
                }
            }
        )*
    };
}

float_element!(f32, f64);
