//! The trait implemented by every record type.

use crate::{decode::Decoder, encode::Encoder, error::Error, limits::Limits, size::SerialSize};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// The largest encoding a single record may produce.
///
/// Lengths on the wire are 32-bit varints, so nothing larger could be
/// carried as a nested field anyway.
pub const MAX_SERIAL_LEN: usize = u32::MAX as usize;

/// A record that can be marshaled to and unmarshaled from its serial form.
///
/// Implementations provide the three field walks and get the marshal
/// surface for free. Each walk must visit the same fields with the same
/// values in ascending index order: the size walk and the write walk
/// disagreeing is a bug in the implementation, and [`Message::marshal`]
/// asserts against it.
pub trait Message: Sized {
    /// Accumulates the encoded size of every non-default field.
    fn size_fields(&self, size: &mut SerialSize) -> Result<(), Error>;

    /// Writes every non-default field.
    fn write_fields(&self, enc: &mut Encoder<impl BufMut>);

    /// Reads every field, producing defaults for the absent ones.
    fn read_fields(dec: &mut Decoder<'_, impl Buf>) -> Result<Self, Error>;

    /// Computes the exact number of bytes [`Message::marshal`] will produce.
    fn marshal_len(&self) -> Result<usize, Error> {
        let mut size = SerialSize::new();
        self.size_fields(&mut size)?;
        size.finish()
    }

    /// Encodes the record into a freshly allocated buffer.
    fn marshal(&self) -> Result<Bytes, Error> {
        let len = self.marshal_len()?;
        let mut buf = BytesMut::with_capacity(len);
        let mut enc = Encoder::new(&mut buf);
        self.write_fields(&mut enc);
        enc.finish();
        assert_eq!(buf.len(), len, "write_fields disagrees with size_fields");
        Ok(buf.freeze())
    }

    /// Encodes the record into the given buffer, returning the number of
    /// bytes written.
    ///
    /// The size walk runs first, so nothing is written when the record is
    /// oversized.
    fn marshal_to(&self, buf: &mut impl BufMut) -> Result<usize, Error> {
        let len = self.marshal_len()?;
        let mut enc = Encoder::new(buf);
        self.write_fields(&mut enc);
        enc.finish();
        Ok(len)
    }

    /// Decodes one record from the front of the buffer.
    ///
    /// Bytes past the record's end marker are left in the buffer, so
    /// back-to-back records can be read from one stream.
    ///
    /// The decoded record never borrows from the buffer: payloads are
    /// copied out, or hold a reference-counted handle to the underlying
    /// storage when the input is [`Bytes`]-backed. Either way the caller
    /// may drop or reuse the buffer as soon as this returns.
    fn unmarshal(buf: &mut impl Buf, limits: &Limits) -> Result<Self, Error> {
        let mut dec = Decoder::new(buf, limits)?;
        let value = Self::read_fields(&mut dec)?;
        dec.finish()?;
        Ok(value)
    }

    /// Decodes one record and requires it to consume the whole buffer.
    fn unmarshal_exact(mut buf: impl Buf, limits: &Limits) -> Result<Self, Error> {
        let value = Self::unmarshal(&mut buf, limits)?;
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::Trailing(remaining));
        }
        Ok(value)
    }
}
