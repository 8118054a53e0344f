//! Records exchanged with an array file
//!
//! An [`ArrayRecord`] is one array: its element type, its shape, and its
//! raw little-endian element buffer. The store never keeps records around;
//! callers own what they pass in and what they get back.

use super::cast::{convert_buffer, decode_as};
use super::element::{Element, ElementType};
use crate::utils::{ArrayFileError, HeaderError, Result};

/// One array in its on-disk representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRecord {
    element_type: ElementType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl ArrayRecord {
    /// Wrap a raw buffer
    ///
    /// `data` must hold exactly `product(shape) * element_size` bytes.
    /// `Bool` bytes are normalized to 0 or 1.
    pub fn new(element_type: ElementType, shape: Vec<usize>, mut data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(element_type, &shape)?;
        if data.len() != expected {
            return Err(ArrayFileError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        if element_type == ElementType::Bool {
            for byte in data.iter_mut() {
                *byte = (*byte != 0) as u8;
            }
        }
        Ok(Self {
            element_type,
            shape,
            data,
        })
    }

    /// Encode typed values laid out row-major in `shape`
    pub fn from_slice<T: Element>(shape: &[usize], values: &[T]) -> Result<Self> {
        let size = T::ELEMENT_TYPE.element_size();
        let expected = byte_len(T::ELEMENT_TYPE, shape)?;
        if values.len() * size != expected {
            return Err(ArrayFileError::BufferSizeMismatch {
                expected,
                actual: values.len() * size,
            });
        }
        let mut data = Vec::with_capacity(expected);
        for &value in values {
            value.write_le(&mut data);
        }
        Ok(Self {
            element_type: T::ELEMENT_TYPE,
            shape: shape.to_vec(),
            data,
        })
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn n_elements(&self) -> usize {
        self.data.len() / self.element_type.element_size()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Decode the elements as `T`, converting if the stored type differs
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        decode_as::<T>(self.element_type, &self.data)
    }

    /// Decode into a shaped typed array
    pub fn to_typed<T: Element>(&self) -> TypedArray<T> {
        TypedArray {
            shape: self.shape.clone(),
            data: self.to_vec(),
        }
    }

    /// Same array with every element converted to `to`
    pub fn cast(&self, to: ElementType) -> ArrayRecord {
        ArrayRecord {
            element_type: to,
            shape: self.shape.clone(),
            data: convert_buffer(self.element_type, to, &self.data),
        }
    }
}

impl<T: Element> TryFrom<&TypedArray<T>> for ArrayRecord {
    type Error = ArrayFileError;

    fn try_from(array: &TypedArray<T>) -> Result<Self> {
        ArrayRecord::from_slice(&array.shape, &array.data)
    }
}

/// A decoded array of `T` in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> TypedArray<T> {
    pub fn n_dimensions(&self) -> usize {
        self.shape.len()
    }
}

fn byte_len(element_type: ElementType, shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(element_type.element_size(), |acc, &extent| {
            acc.checked_mul(extent)
        })
        .ok_or_else(|| {
            ArrayFileError::InvalidShape(HeaderError::Overflow(format!(
                "{:?} x {}",
                shape, element_type
            )))
        })
}
