//! Decode-side resource caps.

/// Caps applied while decoding untrusted input.
///
/// Limits are process-local configuration, never part of the wire format:
/// two decoders with different caps may disagree on whether bytes are
/// acceptable, but never on the byte layout itself. Encoding ignores them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload bytes for one byte-string or text value, applied to
    /// whole fields and to list elements alike.
    pub max_field_len: usize,
    /// Maximum element count for one list.
    pub max_list_len: usize,
    /// Maximum nesting depth, counting the root record as one level.
    pub max_depth: usize,
}

impl Limits {
    /// Default cap on one variable-length payload: 16 MiB.
    pub const DEFAULT_MAX_FIELD_LEN: usize = 16 * 1024 * 1024;
    /// Default cap on list elements: 64 Ki.
    pub const DEFAULT_MAX_LIST_LEN: usize = 64 * 1024;
    /// Default cap on nesting depth.
    pub const DEFAULT_MAX_DEPTH: usize = 64;
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_field_len: Self::DEFAULT_MAX_FIELD_LEN,
            max_list_len: Self::DEFAULT_MAX_LIST_LEN,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
