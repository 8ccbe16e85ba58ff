//! Variable-width unsigned integer encoding.
//!
//! Each byte carries seven value bits, least-significant group first, with
//! the high bit flagging continuation. Only the canonical minimal-length
//! form decodes: a trailing zero group, or a final group with more bits than
//! the target width has left, is an error. Canonicality makes the encoding
//! bijective, so `size(v)` is also the exact length of any accepted input
//! decoding to `v`.

use crate::error::Error;
use bytes::{Buf, BufMut};
use std::ops::{BitOrAssign, Shl, ShrAssign};

const BITS_PER_BYTE: usize = 8;
const DATA_BITS_PER_BYTE: usize = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// An unsigned integer width that varints encode to and from.
pub trait UInt:
    Copy
    + From<u8>
    + Sized
    + ShrAssign<usize>
    + Shl<usize, Output = Self>
    + BitOrAssign<Self>
    + PartialOrd
{
    /// Returns the number of leading zeros in the integer.
    fn leading_zeros(self) -> u32;

    /// Returns the least significant byte of the integer.
    fn as_u8(self) -> u8;
}

macro_rules! impl_uint {
    ($type:ty) => {
        impl UInt for $type {
            #[inline]
            fn leading_zeros(self) -> u32 {
                self.leading_zeros()
            }

            #[inline]
            fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}
impl_uint!(u32);
impl_uint!(u64);

/// Encodes an unsigned integer as a minimal-length varint.
pub fn write<T: UInt>(value: T, buf: &mut impl BufMut) {
    let mut value = value;
    loop {
        let group = value.as_u8() & DATA_BITS_MASK;
        value >>= DATA_BITS_PER_BYTE;
        if value > T::from(0u8) {
            buf.put_u8(group | CONTINUATION_BIT_MASK);
        } else {
            buf.put_u8(group);
            return;
        }
    }
}

/// Decodes a canonical varint into `T`.
pub fn read<T: UInt>(buf: &mut impl Buf) -> Result<T, Error> {
    let max_bits = std::mem::size_of::<T>() * BITS_PER_BYTE;
    let mut result = T::from(0u8);
    let mut shift = 0;
    loop {
        if !buf.has_remaining() {
            return Err(Error::TruncatedInput);
        }
        let byte = buf.get_u8();

        // Within the last permissible group the data has to fit in the bits
        // that remain for T. The continuation bit counts against that, so
        // this check also forces the loop to terminate.
        let remaining_bits = max_bits - shift;
        if remaining_bits <= DATA_BITS_PER_BYTE {
            let relevant_bits = BITS_PER_BYTE - byte.leading_zeros() as usize;
            if relevant_bits > remaining_bits {
                return Err(Error::InvalidEncoding("varint overflows width"));
            }
        }

        result |= T::from(byte & DATA_BITS_MASK) << shift;
        if byte & CONTINUATION_BIT_MASK == 0 {
            if byte == 0 && shift > 0 {
                return Err(Error::InvalidEncoding("varint not minimal"));
            }
            return Ok(result);
        }
        shift += DATA_BITS_PER_BYTE;
    }
}

/// Returns the byte length of the canonical varint for `value`.
pub fn size<T: UInt>(value: T) -> usize {
    let total_bits = std::mem::size_of::<T>() * BITS_PER_BYTE;
    let data_bits = total_bits - value.leading_zeros() as usize;
    usize::max(1, data_bits.div_ceil(DATA_BITS_PER_BYTE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: UInt + std::fmt::Debug>(value: T) {
        let mut buf = Vec::new();
        write(value, &mut buf);
        assert_eq!(buf.len(), size(value));

        let mut bytes = &buf[..];
        let decoded = read::<T>(&mut bytes).unwrap();
        assert_eq!(decoded, value);
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_roundtrip_boundaries() {
        for value in [
            0u32,
            1,
            127,
            128,
            0x3FFF,
            0x4000,
            (1 << 21) - 1,
            1 << 21,
            u32::MAX,
        ] {
            roundtrip(value);
        }
        for value in [0u64, 1 << 21, (1 << 49) - 1, 1 << 49, u64::MAX] {
            roundtrip(value);
        }
    }

    #[test]
    fn test_known_encodings() {
        let mut buf = Vec::new();
        write(300u32, &mut buf);
        assert_eq!(buf, [0xAC, 0x02]);

        let mut buf = Vec::new();
        write(u32::MAX, &mut buf);
        assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);

        let mut buf = Vec::new();
        write(u64::MAX, &mut buf);
        assert_eq!(
            buf,
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            read::<u32>(&mut &[][..]),
            Err(Error::TruncatedInput)
        ));
        assert!(matches!(
            read::<u64>(&mut &[0x80][..]),
            Err(Error::TruncatedInput)
        ));
    }

    #[test]
    fn test_rejects_padded_zero_group() {
        assert!(matches!(
            read::<u32>(&mut &[0x80, 0x00][..]),
            Err(Error::InvalidEncoding(_))
        ));
        // 127 padded to two bytes; the canonical form is [0x7F].
        assert!(matches!(
            read::<u32>(&mut &[0xFF, 0x00][..]),
            Err(Error::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_rejects_width_overflow() {
        // Five groups whose final byte spills past 32 bits.
        assert!(matches!(
            read::<u32>(&mut &[0xFF, 0xFF, 0xFF, 0xFF, 0x1F][..]),
            Err(Error::InvalidEncoding(_))
        ));
        // A sixth group is never valid for u32, whatever it holds.
        assert!(matches!(
            read::<u32>(&mut &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..]),
            Err(Error::InvalidEncoding(_))
        ));
        // An eleventh group is never valid for u64.
        assert!(matches!(
            read::<u64>(&mut &[0xFF; 11][..]),
            Err(Error::InvalidEncoding(_))
        ));
    }
}
