//! Exact serial sizing with incremental overflow checks.

use crate::{error::Error, message::Message, timestamp::Timestamp, varint, wire};
use bytes::Bytes;
use paste::paste;

/// Running byte size of one record's serial form.
///
/// Mirrors [`Encoder`](crate::Encoder) method for method: a record's
/// `size_fields` walk makes the same calls with the same values as its
/// `write_fields` walk, and this accumulator adds exactly the bytes the
/// encoder will put. Every addition is checked against
/// [`MAX_SERIAL_LEN`](crate::MAX_SERIAL_LEN), so oversized inputs surface as
/// [`Error::SizeOverflow`] at the first field that crosses the cap.
#[derive(Debug)]
pub struct SerialSize {
    total: usize,
}

macro_rules! impl_scalar_list {
    ($name:ident, $elem:ty, $width:expr) => {
        paste! {
            #[doc = "A `" $name "` list field."]
            pub fn [<$name _list>](&mut self, values: &[$elem]) -> Result<(), Error> {
                if values.is_empty() {
                    return Ok(());
                }
                self.add(1 + varint::size(values.len() as u64))?;
                self.add(values.len().checked_mul($width).ok_or(Error::SizeOverflow)?)
            }
        }
    };
}

impl SerialSize {
    pub(crate) const fn new() -> Self {
        Self { total: 0 }
    }

    /// Adds `n` bytes, failing once the running total passes the format cap.
    fn add(&mut self, n: usize) -> Result<(), Error> {
        let total = self.total.checked_add(n).ok_or(Error::SizeOverflow)?;
        if total > crate::message::MAX_SERIAL_LEN {
            return Err(Error::SizeOverflow);
        }
        self.total = total;
        Ok(())
    }

    /// Accounts for the end-of-record marker and returns the total.
    pub(crate) fn finish(mut self) -> Result<usize, Error> {
        self.add(1)?;
        Ok(self.total)
    }

    /// A boolean field: one header byte when true.
    pub fn bool(&mut self, value: bool) -> Result<(), Error> {
        if value {
            self.add(1)?;
        }
        Ok(())
    }

    /// A `u8` field.
    pub fn u8(&mut self, value: u8) -> Result<(), Error> {
        if value != 0 {
            self.add(2)?;
        }
        Ok(())
    }

    /// A `u16` field.
    pub fn u16(&mut self, value: u16) -> Result<(), Error> {
        match value {
            0 => Ok(()),
            1..=255 => self.add(2),
            _ => self.add(3),
        }
    }

    /// A `u32` field.
    pub fn u32(&mut self, value: u32) -> Result<(), Error> {
        if value == 0 {
            Ok(())
        } else if value < wire::WIDE_U32 {
            self.add(1 + varint::size(value))
        } else {
            self.add(5)
        }
    }

    /// A `u64` field.
    pub fn u64(&mut self, value: u64) -> Result<(), Error> {
        if value == 0 {
            Ok(())
        } else if value < wire::WIDE_U64 {
            self.add(1 + varint::size(value))
        } else {
            self.add(9)
        }
    }

    /// An `i32` field.
    pub fn i32(&mut self, value: i32) -> Result<(), Error> {
        if value != 0 {
            self.add(1 + varint::size(value.unsigned_abs()))?;
        }
        Ok(())
    }

    /// An `i64` field.
    pub fn i64(&mut self, value: i64) -> Result<(), Error> {
        if value != 0 {
            self.add(1 + varint::size(value.unsigned_abs()))?;
        }
        Ok(())
    }

    /// An `f32` field.
    pub fn f32(&mut self, value: f32) -> Result<(), Error> {
        if value.to_bits() != 0 {
            self.add(5)?;
        }
        Ok(())
    }

    /// An `f64` field.
    pub fn f64(&mut self, value: f64) -> Result<(), Error> {
        if value.to_bits() != 0 {
            self.add(9)?;
        }
        Ok(())
    }

    /// A timestamp field.
    pub fn timestamp(&mut self, value: Timestamp) -> Result<(), Error> {
        if value == Timestamp::EPOCH {
            Ok(())
        } else if value.compact_wire() {
            self.add(9)
        } else {
            self.add(13)
        }
    }

    /// A byte-string field.
    pub fn bytes(&mut self, value: &[u8]) -> Result<(), Error> {
        if value.is_empty() {
            return Ok(());
        }
        self.add(1 + varint::size(value.len() as u64))?;
        self.add(value.len())
    }

    /// A text field.
    pub fn text(&mut self, value: &str) -> Result<(), Error> {
        self.bytes(value.as_bytes())
    }

    impl_scalar_list!(bool, bool, 1);
    impl_scalar_list!(u16, u16, 2);
    impl_scalar_list!(u32, u32, 4);
    impl_scalar_list!(u64, u64, 8);
    impl_scalar_list!(i32, i32, 4);
    impl_scalar_list!(i64, i64, 8);
    impl_scalar_list!(f32, f32, 4);
    impl_scalar_list!(f64, f64, 8);
    impl_scalar_list!(timestamp, Timestamp, 12);

    /// A byte-string list field.
    pub fn bytes_list(&mut self, values: &[Bytes]) -> Result<(), Error> {
        if values.is_empty() {
            return Ok(());
        }
        self.add(1 + varint::size(values.len() as u64))?;
        for value in values {
            self.add(varint::size(value.len() as u64))?;
            self.add(value.len())?;
        }
        Ok(())
    }

    /// A text list field.
    pub fn text_list(&mut self, values: &[String]) -> Result<(), Error> {
        if values.is_empty() {
            return Ok(());
        }
        self.add(1 + varint::size(values.len() as u64))?;
        for value in values {
            self.add(varint::size(value.len() as u64))?;
            self.add(value.len())?;
        }
        Ok(())
    }

    /// A nested record field.
    pub fn message<M: Message>(&mut self, value: Option<&M>) -> Result<(), Error> {
        if let Some(child) = value {
            self.add(1)?;
            child.size_fields(self)?;
            self.add(1)?;
        }
        Ok(())
    }

    /// A record list field.
    pub fn message_list<M: Message>(&mut self, values: &[M]) -> Result<(), Error> {
        if values.is_empty() {
            return Ok(());
        }
        self.add(1 + varint::size(values.len() as u64))?;
        for child in values {
            child.size_fields(self)?;
            self.add(1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(f: impl FnOnce(&mut SerialSize) -> Result<(), Error>) -> usize {
        let mut size = SerialSize::new();
        f(&mut size).unwrap();
        size.finish().unwrap()
    }

    #[test]
    fn test_empty_record_is_marker_only() {
        assert_eq!(total(|_| Ok(())), 1);
    }

    #[test]
    fn test_defaults_cost_nothing() {
        let n = total(|s| {
            s.bool(false)?;
            s.u64(0)?;
            s.f64(0.0)?;
            s.timestamp(Timestamp::EPOCH)?;
            s.text("")?;
            s.u32_list(&[])
        });
        assert_eq!(n, 1);
    }

    #[test]
    fn test_u16_forms() {
        assert_eq!(total(|s| s.u16(255)), 3);
        assert_eq!(total(|s| s.u16(256)), 4);
    }

    #[test]
    fn test_u32_forms() {
        assert_eq!(total(|s| s.u32(1)), 3);
        assert_eq!(total(|s| s.u32((1 << 21) - 1)), 5);
        assert_eq!(total(|s| s.u32(1 << 21)), 6);
    }

    #[test]
    fn test_u64_forms() {
        assert_eq!(total(|s| s.u64((1 << 49) - 1)), 9);
        assert_eq!(total(|s| s.u64(1 << 49)), 10);
    }

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(total(|s| s.timestamp(Timestamp::new(1, 0))), 10);
        assert_eq!(total(|s| s.timestamp(Timestamp::new(-1, 0))), 14);
        assert_eq!(
            total(|s| s.timestamp(Timestamp::new(u32::MAX as i64 + 1, 0))),
            14
        );
    }

    #[test]
    fn test_negative_zero_float_is_present() {
        assert_eq!(total(|s| s.f32(-0.0)), 6);
        assert_eq!(total(|s| s.f64(-0.0)), 10);
    }

    #[test]
    fn test_variable_fields() {
        assert_eq!(total(|s| s.text("hi")), 5);
        assert_eq!(total(|s| s.bytes(&[0; 200])), 204);
        assert_eq!(total(|s| s.f32_list(&[1.5, 2.5])), 11);
        assert_eq!(
            total(|s| s.text_list(&[String::new(), "abc".into()])),
            8
        );
    }
}
