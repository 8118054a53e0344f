//! Numeric conversion between element types
//!
//! Typed reads convert stored elements to the requested type through a
//! single intermediate [`Scalar`]. The rules, per target:
//!
//! - same type: bit-identical copy
//! - bool: `value != 0` (complex: either part non-zero, NaN counts as non-zero)
//! - integer: integers saturate to the target range; floats truncate toward
//!   zero then saturate, NaN becomes 0; `true`/`false` become 1/0
//! - float: rounded to the nearest representable value, out-of-range f64
//!   becomes +/- infinity in f32
//! - complex: real sources get a zero imaginary part; complex sources keep
//!   both parts converted as float to float
//!
//! Converting a complex value to any real type keeps only the real part.

use super::element::{dispatch_element, Element, ElementType};

/// Intermediate value every element converts through
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    /// Wide enough for every stored integer, signed or unsigned
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

/// Convert one element to `T`
#[inline]
pub fn cast<S: Element, T: Element>(value: S) -> T {
    T::from_scalar(value.to_scalar())
}

/// Decode a packed little-endian buffer of `from` elements as `T`
///
/// `bytes.len()` must be a multiple of `from.element_size()`.
pub fn decode_as<T: Element>(from: ElementType, bytes: &[u8]) -> Vec<T> {
    let size = from.element_size();
    if from == T::ELEMENT_TYPE {
        return bytes.chunks_exact(size).map(T::read_le).collect();
    }
    dispatch_element!(from, S => bytes
        .chunks_exact(size)
        .map(|chunk| cast::<S, T>(S::read_le(chunk)))
        .collect())
}

/// Re-encode a packed buffer of `from` elements as `to` elements
pub fn convert_buffer(from: ElementType, to: ElementType, bytes: &[u8]) -> Vec<u8> {
    if from == to {
        return bytes.to_vec();
    }
    let count = bytes.len() / from.element_size();
    let mut out = Vec::with_capacity(count * to.element_size());
    dispatch_element!(to, T => {
        for value in decode_as::<T>(from, bytes) {
            value.write_le(&mut out);
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    #[test]
    fn test_integer_narrowing_saturates() {
        assert_eq!(cast::<i32, i8>(300), i8::MAX);
        assert_eq!(cast::<i32, i8>(-300), i8::MIN);
        assert_eq!(cast::<i64, u8>(-1), 0);
        assert_eq!(cast::<u64, i64>(u64::MAX), i64::MAX);
        assert_eq!(cast::<i16, u16>(1234), 1234);
    }

    #[test]
    fn test_integer_widening_is_exact() {
        assert_eq!(cast::<i8, i64>(-128), -128);
        assert_eq!(cast::<u32, u64>(u32::MAX), u32::MAX as u64);
        assert_eq!(cast::<u64, f64>(1 << 53), 9007199254740992.0);
    }

    #[test]
    fn test_float_to_integer_truncates() {
        assert_eq!(cast::<f64, i32>(2.9), 2);
        assert_eq!(cast::<f64, i32>(-2.9), -2);
        assert_eq!(cast::<f64, u8>(-5.0), 0);
        assert_eq!(cast::<f64, u8>(1e9), u8::MAX);
        assert_eq!(cast::<f32, i64>(f32::NAN), 0);
        assert_eq!(cast::<f64, i16>(f64::INFINITY), i16::MAX);
    }

    #[test]
    fn test_float_narrowing() {
        assert_eq!(cast::<f64, f32>(0.1), 0.1f32);
        assert_eq!(cast::<f64, f32>(1e300), f32::INFINITY);
        assert_eq!(cast::<f32, f64>(0.5), 0.5);
    }

    #[test]
    fn test_bool_conversions() {
        assert!(cast::<i32, bool>(-7));
        assert!(!cast::<u8, bool>(0));
        assert!(cast::<f64, bool>(f64::NAN));
        assert!(!cast::<f32, bool>(0.0));
        assert_eq!(cast::<bool, i16>(true), 1);
        assert_eq!(cast::<bool, f64>(false), 0.0);
        assert!(cast::<Complex<f32>, bool>(Complex::new(0.0, 1.0)));
    }

    #[test]
    fn test_complex_conversions() {
        assert_eq!(
            cast::<i32, Complex<f64>>(3),
            Complex::new(3.0, 0.0)
        );
        assert_eq!(cast::<Complex<f64>, f32>(Complex::new(1.5, 9.0)), 1.5);
        assert_eq!(cast::<Complex<f64>, i8>(Complex::new(-1.7, 9.0)), -1);
        assert_eq!(
            cast::<Complex<f64>, Complex<f32>>(Complex::new(0.25, -0.5)),
            Complex::new(0.25f32, -0.5f32)
        );
        assert_eq!(
            cast::<bool, Complex<f32>>(true),
            Complex::new(1.0f32, 0.0)
        );
    }

    #[test]
    fn test_decode_same_type_is_bit_identical() {
        let nan = f32::from_bits(0x7fc0_0001);
        let mut bytes = Vec::new();
        nan.write_le(&mut bytes);
        1.0f32.write_le(&mut bytes);

        let values = decode_as::<f32>(ElementType::Float32, &bytes);
        assert_eq!(values[0].to_bits(), 0x7fc0_0001);
        assert_eq!(values[1], 1.0);
    }

    #[test]
    fn test_convert_buffer() {
        let mut bytes = Vec::new();
        for v in [1.9f64, -3.2, 400.0] {
            v.write_le(&mut bytes);
        }
        let out = convert_buffer(ElementType::Float64, ElementType::Int8, &bytes);
        assert_eq!(out.len(), 3);
        assert_eq!(
            decode_as::<i8>(ElementType::Int8, &out),
            vec![1i8, -3, 127]
        );
    }
}
