//! Wire-format constants shared by the sizing, encoding, and decoding walks.
//!
//! Every field starts with one header byte: the low seven bits carry the
//! field index and the high bit selects the family's alternate form. Header
//! `0x7F` closes a record, so field indexes stop at `0x7E`.

/// Highest field index a record may use.
pub const MAX_FIELD_INDEX: u8 = 0x7E;

/// Header byte closing a record.
pub(crate) const END_MARKER: u8 = 0x7F;

/// Header bit selecting a family's alternate form.
pub(crate) const FLAG: u8 = 0x80;

/// Smallest u32 that takes the wide four-byte form instead of a varint.
pub(crate) const WIDE_U32: u32 = 1 << 21;

/// Smallest u64 that takes the wide eight-byte form instead of a varint.
pub(crate) const WIDE_U64: u64 = 1 << 49;
