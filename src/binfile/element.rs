//! Element types stored in array files
//!
//! Every record of a file holds elements of exactly one scalar type. The
//! type is identified on disk by a one-byte tag; element payloads are
//! little-endian and densely packed.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex;
use serde::Serialize;

use super::cast::Scalar;

/// Element type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ElementType {
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    Complex64 = 12,
    Complex128 = 13,
}

impl ElementType {
    pub const ALL: [ElementType; 13] = [
        ElementType::Bool,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::Complex64,
        ElementType::Complex128,
    ];

    /// Get element size in bytes
    pub fn element_size(&self) -> usize {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64
            | ElementType::UInt64
            | ElementType::Float64
            | ElementType::Complex64 => 8,
            ElementType::Complex128 => 16,
        }
    }

    /// On-disk tag
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from raw tag; `None` for unknown tags
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.to_u8() == value)
    }

    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::Complex64 => "complex64",
            ElementType::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown element type '{}'", s))
    }
}

/// A scalar that can be stored in an array file
///
/// Implementations encode to and decode from the little-endian on-disk
/// representation and convert through [`Scalar`] for typed reads.
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    /// Append the little-endian encoding of `self` to `out`
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `ELEMENT_TYPE.element_size()` bytes
    fn read_le(bytes: &[u8]) -> Self;

    fn to_scalar(self) -> Scalar;

    fn from_scalar(value: Scalar) -> Self;
}

impl Element for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Bool;

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    #[inline]
    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Bool(b) => b,
            Scalar::Int(v) => v != 0,
            Scalar::Float(f) => f != 0.0,
            Scalar::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }
}

macro_rules! impl_int_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                    <$t>::from_le_bytes(buf)
                }

                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Int(self as i128)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => b as $t,
                        Scalar::Int(v) => v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t,
                        // `as` truncates toward zero, saturates, and maps NaN to 0
                        Scalar::Float(f) => f as $t,
                        Scalar::Complex(re, _) => re as $t,
                    }
                }
            }
        )*
    };
}

impl_int_element!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

macro_rules! complex_variant {
    (Float32) => {
        ElementType::Complex64
    };
    (Float64) => {
        ElementType::Complex128
    };
}

macro_rules! impl_float_element {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                    <$t>::from_le_bytes(buf)
                }

                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Float(self as f64)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Bool(b) => if b { 1.0 } else { 0.0 },
                        Scalar::Int(v) => v as $t,
                        Scalar::Float(f) => f as $t,
                        Scalar::Complex(re, _) => re as $t,
                    }
                }
            }

            impl Element for Complex<$t> {
                const ELEMENT_TYPE: ElementType = complex_variant!($variant);

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.re.to_le_bytes());
                    out.extend_from_slice(&self.im.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let part = std::mem::size_of::<$t>();
                    Complex::new(
                        <$t as Element>::read_le(&bytes[..part]),
                        <$t as Element>::read_le(&bytes[part..2 * part]),
                    )
                }

                #[inline]
                fn to_scalar(self) -> Scalar {
                    Scalar::Complex(self.re as f64, self.im as f64)
                }

                #[inline]
                fn from_scalar(value: Scalar) -> Self {
                    match value {
                        Scalar::Complex(re, im) => Complex::new(re as $t, im as $t),
                        real => Complex::new(<$t as Element>::from_scalar(real), 0.0),
                    }
                }
            }
        )*
    };
}

impl_float_element!(f32 => Float32, f64 => Float64);

/// Run `$body` with `$T` bound to the Rust type stored for `$ty`
macro_rules! dispatch_element {
    ($ty:expr, $T:ident => $body:expr) => {
        match $ty {
            $crate::binfile::ElementType::Bool => {
                type $T = bool;
                $body
            }
            $crate::binfile::ElementType::Int8 => {
                type $T = i8;
                $body
            }
            $crate::binfile::ElementType::Int16 => {
                type $T = i16;
                $body
            }
            $crate::binfile::ElementType::Int32 => {
                type $T = i32;
                $body
            }
            $crate::binfile::ElementType::Int64 => {
                type $T = i64;
                $body
            }
            $crate::binfile::ElementType::UInt8 => {
                type $T = u8;
                $body
            }
            $crate::binfile::ElementType::UInt16 => {
                type $T = u16;
                $body
            }
            $crate::binfile::ElementType::UInt32 => {
                type $T = u32;
                $body
            }
            $crate::binfile::ElementType::UInt64 => {
                type $T = u64;
                $body
            }
            $crate::binfile::ElementType::Float32 => {
                type $T = f32;
                $body
            }
            $crate::binfile::ElementType::Float64 => {
                type $T = f64;
                $body
            }
            $crate::binfile::ElementType::Complex64 => {
                type $T = ::num_complex::Complex<f32>;
                $body
            }
            $crate::binfile::ElementType::Complex128 => {
                type $T = ::num_complex::Complex<f64>;
                $body
            }
        }
    };
}

pub(crate) use dispatch_element;
