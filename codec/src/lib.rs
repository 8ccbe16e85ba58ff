//! Serialize fixed-schema records into a compact, canonical wire form.
//!
//! # Overview
//!
//! A record is a struct whose fields carry small, fixed indexes. Encoding
//! walks the fields in ascending index order and emits one header byte per
//! present field; fields holding their default value (zero, empty, the
//! epoch) are omitted entirely, so sparse records stay small. A single
//! marker byte closes each record, which lets records nest and lets
//! back-to-back records share one stream.
//!
//! The schema itself never travels. Both sides compile the same record
//! types, and evolution is append-only: new fields take fresh indexes, and
//! a decoder that encounters an index it does not know rejects the input
//! rather than skipping it.
//!
//! # Wire Format
//!
//! Each field is a header byte (the field index in the low seven bits)
//! followed by a family-specific payload:
//!
//! - Booleans are header-only; presence means true.
//! - Unsigned integers use a varint or, above a per-width threshold, a
//!   fixed big-endian form selected by the header's high bit.
//! - Signed integers carry their sign in the header's high bit and their
//!   magnitude as a varint.
//! - Floats are raw IEEE 754 bits, big-endian.
//! - Timestamps take a compact eight-byte form when the seconds fit an
//!   unsigned 32-bit value and a twelve-byte form otherwise.
//! - Byte strings and text are length-prefixed; lists are count-prefixed.
//! - Nested records embed their complete encoding, end marker included.
//!
//! Exactly one encoding exists per value: the encoder always picks the
//! shortest legal form, and the decoder rejects every other spelling
//! (overlong varints, explicit defaults, a wide form holding a small
//! value). Accepted input always re-encodes byte for byte.
//!
//! Decoding untrusted input is bounded by [`Limits`]: a per-field byte cap,
//! a per-list element cap, and a nesting depth cap, all checked before
//! allocation.
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use tagwire_codec::{Decoder, Encoder, Error, Limits, Message, SerialSize};
//!
//! // Define a record with field indexes 0, 1, and 2
//! struct Point {
//!     label: String,
//!     x: i32,
//!     y: i32,
//! }
//!
//! // Implement the three field walks
//! impl Message for Point {
//!     fn size_fields(&self, size: &mut SerialSize) -> Result<(), Error> {
//!         size.text(&self.label)?;
//!         size.i32(self.x)?;
//!         size.i32(self.y)
//!     }
//!
//!     fn write_fields(&self, enc: &mut Encoder<impl BufMut>) {
//!         enc.text(0, &self.label);
//!         enc.i32(1, self.x);
//!         enc.i32(2, self.y);
//!     }
//!
//!     fn read_fields(dec: &mut Decoder<'_, impl Buf>) -> Result<Self, Error> {
//!         Ok(Self {
//!             label: dec.text(0)?,
//!             x: dec.i32(1)?,
//!             y: dec.i32(2)?,
//!         })
//!     }
//! }
//!
//! // Marshal a record and unmarshal it back
//! let point = Point {
//!     label: "origin offset".into(),
//!     x: -3,
//!     y: 4,
//! };
//! let wire = point.marshal().unwrap();
//! let back = Point::unmarshal_exact(wire, &Limits::default()).unwrap();
//! assert_eq!((back.x, back.y), (-3, 4));
//! assert_eq!(back.label, "origin offset");
//! ```

pub mod decode;
pub mod encode;
pub mod error;
pub mod limits;
pub mod message;
pub mod size;
pub mod timestamp;
pub mod varint;
mod wire;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::Error;
pub use limits::Limits;
pub use message::{Message, MAX_SERIAL_LEN};
pub use size::SerialSize;
pub use timestamp::Timestamp;
pub use wire::MAX_FIELD_INDEX;
