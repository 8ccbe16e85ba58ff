//! Field encoding.

use crate::{
    message::Message,
    timestamp::Timestamp,
    varint,
    wire::{END_MARKER, FLAG, MAX_FIELD_INDEX, WIDE_U32, WIDE_U64},
};
use bytes::{BufMut, Bytes};
use paste::paste;

/// Writes one record's non-default fields in ascending index order.
///
/// Field writers are infallible: [`Message::marshal_to`](crate::Message)
/// validates the serial size before any byte is written, and the buffer is
/// the caller's to size. The only panics are on author error, a field index
/// above [`MAX_FIELD_INDEX`] (checked in debug builds) or a payload longer
/// than the format's length space, which `marshal_len` already rejects.
pub struct Encoder<B: BufMut> {
    buf: B,
}

macro_rules! impl_scalar_list {
    ($name:ident, $elem:ty, $put:ident) => {
        paste! {
            #[doc = "A `" $name "` list field: element count, then fixed-width elements."]
            pub fn [<$name _list>](&mut self, index: u8, values: &[$elem]) {
                if values.is_empty() {
                    return;
                }
                self.header(index, false);
                self.length(values.len());
                for value in values {
                    self.buf.$put(*value);
                }
            }
        }
    };
}

impl<B: BufMut> Encoder<B> {
    pub(crate) fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Writes the end-of-record marker.
    pub(crate) fn finish(mut self) {
        self.buf.put_u8(END_MARKER);
    }

    fn header(&mut self, index: u8, flag: bool) {
        debug_assert!(index <= MAX_FIELD_INDEX, "field index out of range");
        self.buf.put_u8(if flag { index | FLAG } else { index });
    }

    fn length(&mut self, len: usize) {
        let len = u32::try_from(len).expect("length exceeds format maximum");
        varint::write(len, &mut self.buf);
    }

    /// A boolean field: header only, presence meaning true.
    pub fn bool(&mut self, index: u8, value: bool) {
        if value {
            self.header(index, false);
        }
    }

    /// A `u8` field.
    pub fn u8(&mut self, index: u8, value: u8) {
        if value != 0 {
            self.header(index, false);
            self.buf.put_u8(value);
        }
    }

    /// A `u16` field: flagged single byte below 256, two bytes otherwise.
    pub fn u16(&mut self, index: u8, value: u16) {
        match value {
            0 => {}
            1..=255 => {
                self.header(index, true);
                self.buf.put_u8(value as u8);
            }
            _ => {
                self.header(index, false);
                self.buf.put_u16(value);
            }
        }
    }

    /// A `u32` field: varint below 2^21, flagged four bytes otherwise.
    pub fn u32(&mut self, index: u8, value: u32) {
        if value == 0 {
            return;
        }
        if value < WIDE_U32 {
            self.header(index, false);
            varint::write(value, &mut self.buf);
        } else {
            self.header(index, true);
            self.buf.put_u32(value);
        }
    }

    /// A `u64` field: varint below 2^49, flagged eight bytes otherwise.
    pub fn u64(&mut self, index: u8, value: u64) {
        if value == 0 {
            return;
        }
        if value < WIDE_U64 {
            self.header(index, false);
            varint::write(value, &mut self.buf);
        } else {
            self.header(index, true);
            self.buf.put_u64(value);
        }
    }

    /// An `i32` field: the flag carries the sign, the payload the magnitude.
    pub fn i32(&mut self, index: u8, value: i32) {
        if value == 0 {
            return;
        }
        self.header(index, value < 0);
        varint::write(value.unsigned_abs(), &mut self.buf);
    }

    /// An `i64` field.
    pub fn i64(&mut self, index: u8, value: i64) {
        if value == 0 {
            return;
        }
        self.header(index, value < 0);
        varint::write(value.unsigned_abs(), &mut self.buf);
    }

    /// An `f32` field: IEEE-754 bits, big-endian. Only +0.0 is a default.
    pub fn f32(&mut self, index: u8, value: f32) {
        if value.to_bits() != 0 {
            self.header(index, false);
            self.buf.put_f32(value);
        }
    }

    /// An `f64` field.
    pub fn f64(&mut self, index: u8, value: f64) {
        if value.to_bits() != 0 {
            self.header(index, false);
            self.buf.put_f64(value);
        }
    }

    /// A timestamp field: compact eight bytes while the seconds fit an
    /// unsigned 32-bit range, flagged twelve bytes otherwise.
    pub fn timestamp(&mut self, index: u8, value: Timestamp) {
        if value == Timestamp::EPOCH {
            return;
        }
        if value.compact_wire() {
            self.header(index, false);
            self.buf.put_u32(value.secs() as u32);
        } else {
            self.header(index, true);
            self.buf.put_i64(value.secs());
        }
        self.buf.put_u32(value.subsec_nanos());
    }

    /// A byte-string field: length, then the payload.
    pub fn bytes(&mut self, index: u8, value: &[u8]) {
        if value.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(value.len());
        self.buf.put_slice(value);
    }

    /// A text field: UTF-8 bytes.
    pub fn text(&mut self, index: u8, value: &str) {
        self.bytes(index, value.as_bytes());
    }

    /// A boolean list field: element count, then one byte per element.
    pub fn bool_list(&mut self, index: u8, values: &[bool]) {
        if values.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(values.len());
        for value in values {
            self.buf.put_u8(*value as u8);
        }
    }

    impl_scalar_list!(u16, u16, put_u16);
    impl_scalar_list!(u32, u32, put_u32);
    impl_scalar_list!(u64, u64, put_u64);
    impl_scalar_list!(i32, i32, put_i32);
    impl_scalar_list!(i64, i64, put_i64);
    impl_scalar_list!(f32, f32, put_f32);
    impl_scalar_list!(f64, f64, put_f64);

    /// A timestamp list field: element count, then twelve bytes per element.
    pub fn timestamp_list(&mut self, index: u8, values: &[Timestamp]) {
        if values.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(values.len());
        for value in values {
            self.buf.put_i64(value.secs());
            self.buf.put_u32(value.subsec_nanos());
        }
    }

    /// A byte-string list field: element count, then length-prefixed
    /// elements, which may be empty.
    pub fn bytes_list(&mut self, index: u8, values: &[Bytes]) {
        if values.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(values.len());
        for value in values {
            self.length(value.len());
            self.buf.put_slice(value);
        }
    }

    /// A text list field: element count, then length-prefixed UTF-8.
    pub fn text_list(&mut self, index: u8, values: &[String]) {
        if values.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(values.len());
        for value in values {
            self.length(value.len());
            self.buf.put_slice(value.as_bytes());
        }
    }

    /// A nested record field: the child's complete encoding.
    pub fn message<M: Message>(&mut self, index: u8, value: Option<&M>) {
        if let Some(child) = value {
            self.header(index, false);
            child.write_fields(self);
            self.buf.put_u8(END_MARKER);
        }
    }

    /// A record list field: element count, then complete encodings.
    pub fn message_list<M: Message>(&mut self, index: u8, values: &[M]) {
        if values.is_empty() {
            return;
        }
        self.header(index, false);
        self.length(values.len());
        for child in values {
            child.write_fields(self);
            self.buf.put_u8(END_MARKER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encoded(f: impl FnOnce(&mut Encoder<&mut BytesMut>)) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let mut enc = Encoder::new(&mut buf);
        f(&mut enc);
        buf.to_vec()
    }

    #[test]
    fn test_defaults_write_nothing() {
        let bytes = encoded(|e| {
            e.bool(0, false);
            e.u16(1, 0);
            e.i64(2, 0);
            e.f64(3, 0.0);
            e.timestamp(4, Timestamp::EPOCH);
            e.text(5, "");
            e.u32_list(6, &[]);
        });
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_bool_is_header_only() {
        assert_eq!(encoded(|e| e.bool(0, true)), [0x00]);
    }

    #[test]
    fn test_u16_forms() {
        assert_eq!(encoded(|e| e.u16(2, 255)), [0x82, 0xFF]);
        assert_eq!(encoded(|e| e.u16(2, 256)), [0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_u32_forms() {
        assert_eq!(encoded(|e| e.u32(3, 300)), [0x03, 0xAC, 0x02]);
        assert_eq!(
            encoded(|e| e.u32(3, 1 << 21)),
            [0x83, 0x00, 0x20, 0x00, 0x00]
        );
    }

    #[test]
    fn test_u64_forms() {
        assert_eq!(encoded(|e| e.u64(4, 1)), [0x04, 0x01]);
        assert_eq!(
            encoded(|e| e.u64(4, 1 << 49)),
            [0x84, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_signed_magnitude() {
        assert_eq!(encoded(|e| e.i32(5, -1)), [0x85, 0x01]);
        assert_eq!(encoded(|e| e.i32(5, 1)), [0x05, 0x01]);
        assert_eq!(
            encoded(|e| e.i32(5, i32::MIN)),
            [0x85, 0x80, 0x80, 0x80, 0x80, 0x08]
        );
        assert_eq!(encoded(|e| e.i64(6, -300)), [0x86, 0xAC, 0x02]);
    }

    #[test]
    fn test_float_bits() {
        assert_eq!(
            encoded(|e| e.f32(7, 1.5)),
            [0x07, 0x3F, 0xC0, 0x00, 0x00]
        );
        // -0.0 is not the default; its sign bit survives.
        assert_eq!(
            encoded(|e| e.f32(7, -0.0)),
            [0x07, 0x80, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(
            encoded(|e| e.timestamp(11, Timestamp::new(256, 7))),
            [0x0B, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x07]
        );
        assert_eq!(
            encoded(|e| e.timestamp(11, Timestamp::new(-1, 7))),
            [0x8B, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x07]
        );
    }

    #[test]
    fn test_length_prefixed_fields() {
        assert_eq!(encoded(|e| e.text(14, "hi")), [0x0E, 0x02, b'h', b'i']);
        assert_eq!(
            encoded(|e| e.bytes(12, &[0xDE, 0xAD])),
            [0x0C, 0x02, 0xDE, 0xAD]
        );
        assert_eq!(
            encoded(|e| e.text_list(15, &[String::new(), "a".into()])),
            [0x0F, 0x02, 0x00, 0x01, b'a']
        );
    }

    #[test]
    fn test_scalar_lists() {
        assert_eq!(
            encoded(|e| e.bool_list(18, &[true, false])),
            [0x12, 0x02, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|e| e.u16_list(19, &[1, 256])),
            [0x13, 0x02, 0x00, 0x01, 0x01, 0x00]
        );
        assert_eq!(
            encoded(|e| e.f32_list(8, &[1.5, 2.5])),
            [0x08, 0x02, 0x3F, 0xC0, 0x00, 0x00, 0x40, 0x20, 0x00, 0x00]
        );
    }
}
