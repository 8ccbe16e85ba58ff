//! Field decoding, hardened against untrusted input.
//!
//! Decoding is strict: any byte sequence the encoder cannot produce is
//! rejected, so accepted input always re-encodes byte for byte. Every
//! length, count, and nesting level is validated against [`Limits`] before
//! allocation, and every payload read is preceded by a remaining-bytes
//! check.

use crate::{
    error::Error,
    limits::Limits,
    message::Message,
    timestamp::{Timestamp, NANOS_PER_SEC},
    varint,
    wire::{END_MARKER, FLAG, MAX_FIELD_INDEX, WIDE_U32, WIDE_U64},
};
use bytes::{Buf, Bytes};
use paste::paste;

/// Reads one record's fields in ascending index order.
///
/// Holds the header byte most recently read but not yet claimed: each field
/// reader claims it when the index matches (with a flag bit legal for the
/// family) and otherwise returns the field's default, leaving the header for
/// the next field. The walk ends when the header is the end-of-record
/// marker; any other unclaimed header is an unknown, duplicate, or
/// out-of-order field.
pub struct Decoder<'a, B: Buf> {
    buf: B,
    limits: &'a Limits,
    depth: usize,
    header: u8,
}

macro_rules! impl_scalar_list {
    ($name:ident, $elem:ty, $get:ident, $width:expr) => {
        paste! {
            #[doc = "A `" $name "` list field."]
            pub fn [<$name _list>](&mut self, index: u8) -> Result<Vec<$elem>, Error> {
                if !self.matches_exact(index) {
                    return Ok(Vec::new());
                }
                let len = self.list_len()?;
                let payload = len
                    .checked_mul($width)
                    .ok_or(Error::FieldTooLarge(len, self.limits.max_list_len))?;
                self.ensure(payload)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.buf.$get());
                }
                self.next_header()?;
                Ok(values)
            }
        }
    };
}

impl<'a, B: Buf> Decoder<'a, B> {
    pub(crate) fn new(buf: B, limits: &'a Limits) -> Result<Self, Error> {
        if limits.max_depth == 0 {
            return Err(Error::RecursionTooDeep(0));
        }
        let mut dec = Self {
            buf,
            limits,
            depth: 1,
            header: END_MARKER,
        };
        dec.next_header()?;
        Ok(dec)
    }

    /// Requires the current header to be the end-of-record marker.
    pub(crate) fn finish(self) -> Result<(), Error> {
        self.expect_end()
    }

    fn expect_end(&self) -> Result<(), Error> {
        if self.header != END_MARKER {
            return Err(Error::InvalidEncoding("unknown header"));
        }
        Ok(())
    }

    fn next_header(&mut self) -> Result<(), Error> {
        self.ensure(1)?;
        self.header = self.buf.get_u8();
        Ok(())
    }

    fn ensure(&self, n: usize) -> Result<(), Error> {
        if self.buf.remaining() < n {
            return Err(Error::TruncatedInput);
        }
        Ok(())
    }

    fn matches_exact(&self, index: u8) -> bool {
        debug_assert!(index <= MAX_FIELD_INDEX, "field index out of range");
        self.header == index
    }

    fn matches_dual(&self, index: u8) -> Option<bool> {
        debug_assert!(index <= MAX_FIELD_INDEX, "field index out of range");
        if self.header & !FLAG == index {
            Some(self.header & FLAG != 0)
        } else {
            None
        }
    }

    /// Reads a length prefix and checks it against the per-field cap.
    fn field_len(&mut self) -> Result<usize, Error> {
        let len = varint::read::<u32>(&mut self.buf)? as usize;
        if len > self.limits.max_field_len {
            return Err(Error::FieldTooLarge(len, self.limits.max_field_len));
        }
        Ok(len)
    }

    /// Reads an element count and checks it against the list cap.
    fn list_len(&mut self) -> Result<usize, Error> {
        let len = varint::read::<u32>(&mut self.buf)? as usize;
        if len == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        if len > self.limits.max_list_len {
            return Err(Error::FieldTooLarge(len, self.limits.max_list_len));
        }
        Ok(len)
    }

    /// Copies `len` payload bytes out of the input.
    fn copy(&mut self, len: usize) -> Result<Bytes, Error> {
        self.ensure(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    fn copy_text(&mut self, len: usize) -> Result<String, Error> {
        self.ensure(len)?;
        let mut bytes = vec![0u8; len];
        self.buf.copy_to_slice(&mut bytes);
        String::from_utf8(bytes).map_err(|_| Error::InvalidEncoding("text is not UTF-8"))
    }

    /// Decodes a child record one nesting level down.
    fn nested<M: Message>(&mut self) -> Result<M, Error> {
        if self.depth >= self.limits.max_depth {
            return Err(Error::RecursionTooDeep(self.limits.max_depth));
        }
        self.depth += 1;
        self.next_header()?;
        let child = M::read_fields(self)?;
        self.expect_end()?;
        self.depth -= 1;
        Ok(child)
    }

    /// A boolean field: presence of the header means true.
    pub fn bool(&mut self, index: u8) -> Result<bool, Error> {
        if !self.matches_exact(index) {
            return Ok(false);
        }
        self.next_header()?;
        Ok(true)
    }

    /// A `u8` field.
    pub fn u8(&mut self, index: u8) -> Result<u8, Error> {
        if !self.matches_exact(index) {
            return Ok(0);
        }
        self.ensure(1)?;
        let value = self.buf.get_u8();
        if value == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        self.next_header()?;
        Ok(value)
    }

    /// A `u16` field.
    pub fn u16(&mut self, index: u8) -> Result<u16, Error> {
        let Some(flag) = self.matches_dual(index) else {
            return Ok(0);
        };
        let value = if flag {
            self.ensure(1)?;
            let value = u16::from(self.buf.get_u8());
            if value == 0 {
                return Err(Error::InvalidEncoding("explicit default"));
            }
            value
        } else {
            self.ensure(2)?;
            let value = self.buf.get_u16();
            if value < 256 {
                return Err(Error::InvalidEncoding("wide form below threshold"));
            }
            value
        };
        self.next_header()?;
        Ok(value)
    }

    /// A `u32` field.
    pub fn u32(&mut self, index: u8) -> Result<u32, Error> {
        let Some(flag) = self.matches_dual(index) else {
            return Ok(0);
        };
        let value = if flag {
            self.ensure(4)?;
            let value = self.buf.get_u32();
            if value < WIDE_U32 {
                return Err(Error::InvalidEncoding("wide form below threshold"));
            }
            value
        } else {
            let value = varint::read::<u32>(&mut self.buf)?;
            if value == 0 {
                return Err(Error::InvalidEncoding("explicit default"));
            }
            if value >= WIDE_U32 {
                return Err(Error::InvalidEncoding("varint form above threshold"));
            }
            value
        };
        self.next_header()?;
        Ok(value)
    }

    /// A `u64` field.
    pub fn u64(&mut self, index: u8) -> Result<u64, Error> {
        let Some(flag) = self.matches_dual(index) else {
            return Ok(0);
        };
        let value = if flag {
            self.ensure(8)?;
            let value = self.buf.get_u64();
            if value < WIDE_U64 {
                return Err(Error::InvalidEncoding("wide form below threshold"));
            }
            value
        } else {
            let value = varint::read::<u64>(&mut self.buf)?;
            if value == 0 {
                return Err(Error::InvalidEncoding("explicit default"));
            }
            if value >= WIDE_U64 {
                return Err(Error::InvalidEncoding("varint form above threshold"));
            }
            value
        };
        self.next_header()?;
        Ok(value)
    }

    /// An `i32` field: the header flag carries the sign.
    pub fn i32(&mut self, index: u8) -> Result<i32, Error> {
        let Some(negative) = self.matches_dual(index) else {
            return Ok(0);
        };
        let magnitude = varint::read::<u32>(&mut self.buf)?;
        if magnitude == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        let value = if negative {
            if magnitude > i32::MIN.unsigned_abs() {
                return Err(Error::InvalidEncoding("magnitude overflows width"));
            }
            (magnitude as i32).wrapping_neg()
        } else {
            i32::try_from(magnitude)
                .map_err(|_| Error::InvalidEncoding("magnitude overflows width"))?
        };
        self.next_header()?;
        Ok(value)
    }

    /// An `i64` field.
    pub fn i64(&mut self, index: u8) -> Result<i64, Error> {
        let Some(negative) = self.matches_dual(index) else {
            return Ok(0);
        };
        let magnitude = varint::read::<u64>(&mut self.buf)?;
        if magnitude == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        let value = if negative {
            if magnitude > i64::MIN.unsigned_abs() {
                return Err(Error::InvalidEncoding("magnitude overflows width"));
            }
            (magnitude as i64).wrapping_neg()
        } else {
            i64::try_from(magnitude)
                .map_err(|_| Error::InvalidEncoding("magnitude overflows width"))?
        };
        self.next_header()?;
        Ok(value)
    }

    /// An `f32` field.
    pub fn f32(&mut self, index: u8) -> Result<f32, Error> {
        if !self.matches_exact(index) {
            return Ok(0.0);
        }
        self.ensure(4)?;
        let bits = self.buf.get_u32();
        if bits == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        self.next_header()?;
        Ok(f32::from_bits(bits))
    }

    /// An `f64` field.
    pub fn f64(&mut self, index: u8) -> Result<f64, Error> {
        if !self.matches_exact(index) {
            return Ok(0.0);
        }
        self.ensure(8)?;
        let bits = self.buf.get_u64();
        if bits == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        self.next_header()?;
        Ok(f64::from_bits(bits))
    }

    /// A timestamp field.
    pub fn timestamp(&mut self, index: u8) -> Result<Timestamp, Error> {
        let Some(flag) = self.matches_dual(index) else {
            return Ok(Timestamp::EPOCH);
        };
        let secs = if flag {
            self.ensure(12)?;
            let secs = self.buf.get_i64();
            if (0..=u32::MAX as i64).contains(&secs) {
                return Err(Error::InvalidEncoding("wide form below threshold"));
            }
            secs
        } else {
            self.ensure(8)?;
            i64::from(self.buf.get_u32())
        };
        let nanos = self.buf.get_u32();
        if nanos >= NANOS_PER_SEC {
            return Err(Error::InvalidEncoding("nanoseconds out of range"));
        }
        let value = Timestamp::from_parts(secs, nanos);
        if value == Timestamp::EPOCH {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        self.next_header()?;
        Ok(value)
    }

    /// A byte-string field.
    pub fn bytes(&mut self, index: u8) -> Result<Bytes, Error> {
        if !self.matches_exact(index) {
            return Ok(Bytes::new());
        }
        let len = self.field_len()?;
        if len == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        let value = self.copy(len)?;
        self.next_header()?;
        Ok(value)
    }

    /// A text field.
    pub fn text(&mut self, index: u8) -> Result<String, Error> {
        if !self.matches_exact(index) {
            return Ok(String::new());
        }
        let len = self.field_len()?;
        if len == 0 {
            return Err(Error::InvalidEncoding("explicit default"));
        }
        let value = self.copy_text(len)?;
        self.next_header()?;
        Ok(value)
    }

    /// A boolean list field: one byte per element, zero or one.
    pub fn bool_list(&mut self, index: u8) -> Result<Vec<bool>, Error> {
        if !self.matches_exact(index) {
            return Ok(Vec::new());
        }
        let len = self.list_len()?;
        self.ensure(len)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(match self.buf.get_u8() {
                0 => false,
                1 => true,
                _ => return Err(Error::InvalidEncoding("boolean byte out of range")),
            });
        }
        self.next_header()?;
        Ok(values)
    }

    impl_scalar_list!(u16, u16, get_u16, 2);
    impl_scalar_list!(u32, u32, get_u32, 4);
    impl_scalar_list!(u64, u64, get_u64, 8);
    impl_scalar_list!(i32, i32, get_i32, 4);
    impl_scalar_list!(i64, i64, get_i64, 8);
    impl_scalar_list!(f32, f32, get_f32, 4);
    impl_scalar_list!(f64, f64, get_f64, 8);

    /// A timestamp list field: twelve bytes per element.
    pub fn timestamp_list(&mut self, index: u8) -> Result<Vec<Timestamp>, Error> {
        if !self.matches_exact(index) {
            return Ok(Vec::new());
        }
        let len = self.list_len()?;
        let payload = len
            .checked_mul(12)
            .ok_or(Error::FieldTooLarge(len, self.limits.max_list_len))?;
        self.ensure(payload)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            let secs = self.buf.get_i64();
            let nanos = self.buf.get_u32();
            if nanos >= NANOS_PER_SEC {
                return Err(Error::InvalidEncoding("nanoseconds out of range"));
            }
            values.push(Timestamp::from_parts(secs, nanos));
        }
        self.next_header()?;
        Ok(values)
    }

    /// A byte-string list field.
    pub fn bytes_list(&mut self, index: u8) -> Result<Vec<Bytes>, Error> {
        if !self.matches_exact(index) {
            return Ok(Vec::new());
        }
        let len = self.list_len()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            let size = self.field_len()?;
            values.push(self.copy(size)?);
        }
        self.next_header()?;
        Ok(values)
    }

    /// A text list field.
    pub fn text_list(&mut self, index: u8) -> Result<Vec<String>, Error> {
        if !self.matches_exact(index) {
            return Ok(Vec::new());
        }
        let len = self.list_len()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            let size = self.field_len()?;
            values.push(self.copy_text(size)?);
        }
        self.next_header()?;
        Ok(values)
    }

    /// A nested record field.
    pub fn message<M: Message>(&mut self, index: u8) -> Result<Option<M>, Error> {
        if !self.matches_exact(index) {
            return Ok(None);
        }
        let child = self.nested()?;
        self.next_header()?;
        Ok(Some(child))
    }

    /// A record list field.
    pub fn message_list<M: Message>(&mut self, index: u8) -> Result<Vec<M>, Error> {
        if !self.matches_exact(index) {
            return Ok(Vec::new());
        }
        let len = self.list_len()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(self.nested()?);
        }
        self.next_header()?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder<'a>(bytes: &'a [u8], limits: &'a Limits) -> Decoder<'a, &'a [u8]> {
        Decoder::new(bytes, limits).unwrap()
    }

    #[test]
    fn test_unmatched_header_yields_defaults() {
        let limits = Limits::default();
        let mut dec = decoder(&[0x05, 0x01, 0x7F], &limits);
        assert!(!dec.bool(0).unwrap());
        assert_eq!(dec.u32(3).unwrap(), 0);
        assert_eq!(dec.u8(5).unwrap(), 1);
        dec.finish().unwrap();
    }

    #[test]
    fn test_u16_rejects_wide_form_below_threshold() {
        let limits = Limits::default();
        let mut dec = decoder(&[0x02, 0x00, 0xFF, 0x7F], &limits);
        assert!(matches!(dec.u16(2), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_u32_rejects_misplaced_forms() {
        let limits = Limits::default();

        // Varint carrying a value that belongs in the wide form.
        let mut dec = decoder(&[0x03, 0x80, 0x80, 0x80, 0x01, 0x7F], &limits);
        assert!(matches!(dec.u32(3), Err(Error::InvalidEncoding(_))));

        // Wide form carrying a value that belongs in a varint.
        let mut dec = decoder(&[0x83, 0x00, 0x1F, 0xFF, 0xFF, 0x7F], &limits);
        assert!(matches!(dec.u32(3), Err(Error::InvalidEncoding(_))));

        // Explicit zero.
        let mut dec = decoder(&[0x03, 0x00, 0x7F], &limits);
        assert!(matches!(dec.u32(3), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_u64_rejects_misplaced_forms() {
        let limits = Limits::default();

        // Varint carrying 2^49, which belongs in the wide form.
        let mut dec = decoder(
            &[0x04, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01, 0x7F],
            &limits,
        );
        assert!(matches!(dec.u64(4), Err(Error::InvalidEncoding(_))));

        // Wide form carrying a value that belongs in a varint.
        let mut dec = decoder(
            &[0x84, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x7F],
            &limits,
        );
        assert!(matches!(dec.u64(4), Err(Error::InvalidEncoding(_))));

        // Explicit zero.
        let mut dec = decoder(&[0x04, 0x00, 0x7F], &limits);
        assert!(matches!(dec.u64(4), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_signed_magnitude_bounds() {
        let limits = Limits::default();

        // -2^31 is the widest i32 magnitude.
        let mut dec = decoder(&[0x85, 0x80, 0x80, 0x80, 0x80, 0x08, 0x7F], &limits);
        assert_eq!(dec.i32(5).unwrap(), i32::MIN);

        // +2^31 is not.
        let mut dec = decoder(&[0x05, 0x80, 0x80, 0x80, 0x80, 0x08, 0x7F], &limits);
        assert!(matches!(dec.i32(5), Err(Error::InvalidEncoding(_))));

        // Negative zero magnitude is not a value.
        let mut dec = decoder(&[0x85, 0x00, 0x7F], &limits);
        assert!(matches!(dec.i32(5), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_timestamp_validation() {
        let limits = Limits::default();

        // Wide form holding seconds that fit the compact form.
        let mut dec = decoder(
            &[0x8B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x7F],
            &limits,
        );
        assert!(matches!(dec.timestamp(11), Err(Error::InvalidEncoding(_))));

        // A nanosecond count of one billion.
        let mut dec = decoder(
            &[0x0B, 0x00, 0x00, 0x00, 0x05, 0x3B, 0x9A, 0xCA, 0x00, 0x7F],
            &limits,
        );
        assert!(matches!(dec.timestamp(11), Err(Error::InvalidEncoding(_))));

        // The epoch written out explicitly.
        let mut dec = decoder(
            &[0x0B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7F],
            &limits,
        );
        assert!(matches!(dec.timestamp(11), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_timestamp_list_rejects_bad_nanos() {
        let limits = Limits::default();
        // One element whose nanosecond part is exactly one billion.
        let mut dec = decoder(
            &[
                0x18, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3B, 0x9A, 0xCA,
                0x00, 0x7F,
            ],
            &limits,
        );
        assert!(matches!(
            dec.timestamp_list(24),
            Err(Error::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_text_validation() {
        let limits = Limits::default();

        let mut dec = decoder(&[0x0E, 0x02, 0xC3, 0x28, 0x7F], &limits);
        assert!(matches!(dec.text(14), Err(Error::InvalidEncoding(_))));

        let mut dec = decoder(&[0x0E, 0x00, 0x7F], &limits);
        assert!(matches!(dec.text(14), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_field_cap_applies_before_payload() {
        let limits = Limits {
            max_field_len: 4,
            ..Limits::default()
        };
        // Five payload bytes are present, but the cap is four.
        let mut dec = decoder(&[0x0E, 0x05, b'a', b'b', b'c', b'd', b'e', 0x7F], &limits);
        assert!(matches!(dec.text(14), Err(Error::FieldTooLarge(5, 4))));
    }

    #[test]
    fn test_list_validation() {
        let limits = Limits {
            max_list_len: 3,
            ..Limits::default()
        };

        let mut dec = decoder(&[0x08, 0x04, 0x7F], &limits);
        assert!(matches!(dec.f32_list(8), Err(Error::FieldTooLarge(4, 3))));

        let mut dec = decoder(&[0x08, 0x00, 0x7F], &limits);
        assert!(matches!(dec.f32_list(8), Err(Error::InvalidEncoding(_))));

        let mut dec = decoder(&[0x12, 0x01, 0x02, 0x7F], &limits);
        assert!(matches!(dec.bool_list(18), Err(Error::InvalidEncoding(_))));
    }

    #[test]
    fn test_scalar_list_requires_whole_payload() {
        let limits = Limits::default();
        // Count of two but only one four-byte element present.
        let mut dec = decoder(&[0x08, 0x02, 0x3F, 0xC0, 0x00, 0x00], &limits);
        assert!(matches!(dec.f32_list(8), Err(Error::TruncatedInput)));
    }

    #[test]
    fn test_huge_list_count_fails_before_allocation() {
        // With the cap lifted, a maximal count must still fail cleanly on
        // the payload check, before any element storage is reserved.
        let limits = Limits {
            max_list_len: usize::MAX,
            ..Limits::default()
        };
        let mut dec = decoder(&[0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 0x7F], &limits);
        assert!(matches!(dec.f32_list(8), Err(Error::TruncatedInput)));
    }
}
