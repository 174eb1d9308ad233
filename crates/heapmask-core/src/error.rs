//! Error types for the heapmask-core library.
//!
//! Every failure aborts the whole run. HPROF has no resynchronization
//! markers, so once a length field has been misread all later offsets are
//! meaningless and there is nothing to recover to.

use thiserror::Error;

/// Result type alias for heapmask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all heapmask operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Underlying source or sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header declared an identifier size other than 4 or 8
    #[error("unsupported identifier size {size}: must be 4 or 8")]
    InvalidIdSize {
        /// The size read from the header
        size: u32,
    },

    /// An identifier was read before the header fixed the identifier size
    #[error("identifier size has not been configured")]
    MissingIdSize,

    /// The sanitization pattern has no bytes
    #[error("sanitization pattern must not be empty")]
    EmptyPattern,

    /// A textual pattern contained a malformed escape sequence
    #[error("invalid escape sequence at position {position} in sanitization text: {details}")]
    InvalidEscape {
        /// Character index of the offending backslash
        position: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Fewer bytes were available than a field declared
    #[error("truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Source offset where the short read began
        offset: u64,
        /// Number of bytes the field required
        needed: u64,
        /// Number of bytes actually available
        available: u64,
    },

    /// An 8-byte identifier decoded as a negative value
    #[error("invalid identifier {value} at offset {offset}: identifiers must be non-negative")]
    InvalidIdentifier {
        /// Source offset of the identifier
        offset: u64,
        /// The signed value that was read
        value: i64,
    },

    /// A value type code outside the basic type table
    #[error("unknown basic type code: {code}")]
    UnknownType {
        /// The offending type code
        code: u8,
    },

    /// A heap dump sub-record tag outside the supported grammar
    #[error("unsupported heap dump sub-record tag 0x{tag:02X} at offset {offset}")]
    UnsupportedRecord {
        /// The offending sub-record tag
        tag: u8,
        /// Source offset of the tag byte
        offset: u64,
    },

    /// Element count times element size does not fit in 64 bits
    #[error("array length overflow: {count} elements of {element_size} bytes")]
    Overflow {
        /// Declared element count
        count: u64,
        /// Per-element size in bytes
        element_size: u64,
    },
}

impl Error {
    /// Creates a new truncated stream error
    pub fn truncated(offset: u64, needed: u64, available: u64) -> Self {
        Self::Truncated {
            offset,
            needed,
            available,
        }
    }

    /// Creates a new invalid escape error
    pub fn invalid_escape(position: usize, details: impl Into<String>) -> Self {
        Self::InvalidEscape {
            position,
            details: details.into(),
        }
    }

    /// Creates a new unsupported record error
    pub fn unsupported_record(tag: u8, offset: u64) -> Self {
        Self::UnsupportedRecord { tag, offset }
    }

    /// Returns true if this error stems from run setup rather than the stream
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdSize { .. }
                | Self::MissingIdSize
                | Self::EmptyPattern
                | Self::InvalidEscape { .. }
        )
    }
}
