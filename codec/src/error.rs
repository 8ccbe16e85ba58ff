//! Error types for codec operations.

use thiserror::Error;

/// Failure raised while sizing, encoding, or decoding a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The serial form would exceed [`crate::MAX_SERIAL_LEN`] bytes.
    #[error("serial size exceeds format maximum")]
    SizeOverflow,
    /// The input ended before one whole record was read.
    #[error("unexpected end of input")]
    TruncatedInput,
    /// A declared length or element count exceeds the configured cap.
    #[error("length {0} exceeds maximum {1}")]
    FieldTooLarge(usize, usize),
    /// Nested records descend past the configured depth.
    #[error("nesting exceeds {0} levels")]
    RecursionTooDeep(usize),
    /// The bytes are not a canonical encoding of any record.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(&'static str),
    /// Bytes were left over after a whole-buffer decode.
    #[error("{0} bytes of trailing input")]
    Trailing(usize),
}
