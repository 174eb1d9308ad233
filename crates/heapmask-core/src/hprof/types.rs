//! Identifier widths and basic value types.
//!
//! HPROF encodes every typed value (constant pool entries, static fields,
//! primitive array elements) with a one-byte basic type code. The byte width
//! of the value follows from the code, except for object references whose
//! width is the stream's identifier size.

use crate::error::{Error, Result};

/// Width of identifier fields, fixed once per stream by the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSize {
    /// 4-byte identifiers (32-bit VMs, compressed dumps)
    Four,
    /// 8-byte identifiers
    Eight,
}

impl IdSize {
    /// Number of bytes occupied by one identifier
    pub fn bytes(self) -> usize {
        match self {
            IdSize::Four => 4,
            IdSize::Eight => 8,
        }
    }
}

impl TryFrom<u32> for IdSize {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            4 => Ok(IdSize::Four),
            8 => Ok(IdSize::Eight),
            size => Err(Error::InvalidIdSize { size }),
        }
    }
}

/// HPROF basic types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BasicType {
    /// Object reference
    Object = 2,
    /// `boolean`
    Boolean = 4,
    /// `char` (UTF-16 code unit)
    Char = 5,
    /// `float`
    Float = 6,
    /// `double`
    Double = 7,
    /// `byte`
    Byte = 8,
    /// `short`
    Short = 9,
    /// `int`
    Int = 10,
    /// `long`
    Long = 11,
}

impl TryFrom<u8> for BasicType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            2 => Ok(BasicType::Object),
            4 => Ok(BasicType::Boolean),
            5 => Ok(BasicType::Char),
            6 => Ok(BasicType::Float),
            7 => Ok(BasicType::Double),
            8 => Ok(BasicType::Byte),
            9 => Ok(BasicType::Short),
            10 => Ok(BasicType::Int),
            11 => Ok(BasicType::Long),
            code => Err(Error::UnknownType { code }),
        }
    }
}

impl BasicType {
    /// Wire code of this type
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Encoded byte width of one value of this type
    pub fn value_size(self, id_size: IdSize) -> usize {
        match self {
            BasicType::Object => id_size.bytes(),
            BasicType::Boolean | BasicType::Byte => 1,
            BasicType::Char | BasicType::Short => 2,
            BasicType::Float | BasicType::Int => 4,
            BasicType::Double | BasicType::Long => 8,
        }
    }

    /// Whether arrays of this type may hold text or raw secrets
    pub fn is_maskable(self) -> bool {
        matches!(self, BasicType::Byte | BasicType::Char)
    }
}

/// Resolve a wire type code directly to its value width
pub fn value_size(code: u8, id_size: IdSize) -> Result<usize> {
    Ok(BasicType::try_from(code)?.value_size(id_size))
}
