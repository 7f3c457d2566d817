//! Element types and array shapes.

use std::fmt;

/// Element data type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean stored as one byte (0 or 1).
    Bool,
    U8,
    U32,
    I32,
    I64,
    F32,
    F64,
}

impl DataType {
    /// Size of this data type in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Bool | DataType::U8 => 1,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::I64 | DataType::F64 => 8,
        }
    }

    /// Short lowercase name used when printing shapes (`f32`, `s64`, `pred`).
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "pred",
            DataType::U8 => "u8",
            DataType::U32 => "u32",
            DataType::I32 => "s32",
            DataType::I64 => "s64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }

    /// Whether this is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Whether values of this type carry a sign.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::I32 | DataType::I64 | DataType::F32 | DataType::F64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust element types that can back a [`Literal`](crate::Literal).
///
/// `bool` is not `Pod`, so boolean literals go through
/// [`Literal::from_bools`](crate::Literal::from_bools) instead.
pub trait NativeType: bytemuck::Pod {
    const DTYPE: DataType;
}

macro_rules! native_type {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl NativeType for $ty {
                const DTYPE: DataType = DataType::$dtype;
            }
        )*
    };
}

native_type! {
    u8 => U8,
    u32 => U32,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

/// Shape of a dense array: element type plus dimensions.
///
/// A rank-0 shape (no dimensions) is a scalar with one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dtype: DataType,
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dtype: DataType, dims: &[usize]) -> Self {
        Self {
            dtype,
            dims: dims.to_vec(),
        }
    }

    /// Rank-0 shape.
    pub fn scalar(dtype: DataType) -> Self {
        Self::new(dtype, &[])
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of bytes a dense host copy of this shape occupies.
    pub fn byte_size(&self) -> usize {
        self.element_count() * self.dtype.size()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::U32.size(), 4);
        assert_eq!(DataType::I64.size(), 8);
        assert_eq!(DataType::F64.size(), 8);
    }

    #[test]
    fn test_native_type_mapping() {
        assert_eq!(<f32 as NativeType>::DTYPE, DataType::F32);
        assert_eq!(<i64 as NativeType>::DTYPE, DataType::I64);
        assert_eq!(<u8 as NativeType>::DTYPE, DataType::U8);
    }

    #[test]
    fn test_shape_sizes() {
        let shape = Shape::new(DataType::F32, &[2, 3]);
        assert_eq!(shape.rank(), 2);
        assert_eq!(shape.element_count(), 6);
        assert_eq!(shape.byte_size(), 24);

        let scalar = Shape::scalar(DataType::I64);
        assert_eq!(scalar.element_count(), 1);
        assert_eq!(scalar.byte_size(), 8);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::new(DataType::F32, &[2, 3]).to_string(), "f32[2,3]");
        assert_eq!(Shape::scalar(DataType::Bool).to_string(), "pred[]");
    }
}
