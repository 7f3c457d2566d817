//! Host-resident tensor values.

use crate::types::{DataType, NativeType, Shape};
use crate::{Error, Result};

/// Self-describing host tensor: shape, element type and dense data.
///
/// Data is stored as native-endian bytes in row-major order. Equality is
/// bitwise, so two literals compare equal only if their shapes match and
/// every byte is identical (a NaN equals the same NaN bit pattern).
///
/// # Example
/// ```
/// # use hlorun_core::Literal;
/// let literal = Literal::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(literal.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    shape: Shape,
    data: Vec<u8>,
}

impl Literal {
    /// Create a literal from a vector with the given dimensions.
    ///
    /// # Panics
    /// Panics if `data.len()` doesn't match the product of `dims`.
    pub fn from_vec<T: NativeType>(data: Vec<T>, dims: &[usize]) -> Self {
        let expected_len: usize = dims.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            dims,
            expected_len
        );

        Self {
            shape: Shape::new(T::DTYPE, dims),
            data: bytemuck::cast_slice(&data).to_vec(),
        }
    }

    /// Create a rank-0 literal.
    pub fn scalar<T: NativeType>(value: T) -> Self {
        Self::from_vec(vec![value], &[])
    }

    /// Create a boolean literal.
    ///
    /// # Panics
    /// Panics if `data.len()` doesn't match the product of `dims`.
    pub fn from_bools(data: &[bool], dims: &[usize]) -> Self {
        let bytes: Vec<u8> = data.iter().map(|&b| u8::from(b)).collect();
        let mut literal = Self::from_vec(bytes, dims);
        literal.shape = Shape::new(DataType::Bool, dims);
        literal
    }

    /// Create a literal from raw bytes.
    ///
    /// # Errors
    /// Returns an error if the byte length doesn't match the shape.
    pub fn from_raw(shape: Shape, data: Vec<u8>) -> Result<Self> {
        if data.len() != shape.byte_size() {
            return Err(Error::Literal(format!(
                "{} bytes supplied for shape {shape} ({} expected)",
                data.len(),
                shape.byte_size()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Literal of the given shape with every byte zero.
    pub fn zeros(shape: Shape) -> Self {
        let data = vec![0u8; shape.byte_size()];
        Self { shape, data }
    }

    /// Copy the elements out as a typed vector.
    ///
    /// # Errors
    /// Returns an error if `T` doesn't match the literal's element type.
    pub fn to_vec<T: NativeType>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype() {
            return Err(Error::TypeMismatch {
                expected: self.dtype(),
                got: T::DTYPE,
            });
        }
        // The byte buffer carries no alignment guarantee for T.
        Ok(self
            .data
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Copy the elements of a boolean literal out.
    ///
    /// # Errors
    /// Returns an error if the literal is not boolean.
    pub fn to_bools(&self) -> Result<Vec<bool>> {
        if self.dtype() != DataType::Bool {
            return Err(Error::TypeMismatch {
                expected: self.dtype(),
                got: DataType::Bool,
            });
        }
        Ok(self.data.iter().map(|&b| b != 0).collect())
    }

    /// Raw bytes of the literal data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the literal, returning its shape and bytes.
    pub fn into_parts(self) -> (Shape, Vec<u8>) {
        (self.shape, self.data)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.shape.dtype()
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.element_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
