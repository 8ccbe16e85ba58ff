#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use bytes::{Buf, BufMut, Bytes};
use libfuzzer_sys::fuzz_target;
use tagwire_codec::{Decoder, Encoder, Error, Limits, Message, SerialSize, Timestamp};

/// Timestamps with the nanosecond part already reduced to a legal value.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WrappedTimestamp(Timestamp);

impl<'a> Arbitrary<'a> for WrappedTimestamp {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let secs = i64::arbitrary(u)?;
        let nanos = u32::arbitrary(u)? % 1_000_000_000;
        Ok(Self(Timestamp::new(secs, nanos)))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct WrappedTimestamps(Vec<Timestamp>);

impl<'a> Arbitrary<'a> for WrappedTimestamps {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let wrapped = Vec::<WrappedTimestamp>::arbitrary(u)?;
        Ok(Self(wrapped.into_iter().map(|t| t.0).collect()))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct WrappedBytes(Bytes);

impl<'a> Arbitrary<'a> for WrappedBytes {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(Bytes::from(Vec::<u8>::arbitrary(u)?)))
    }
}

#[derive(Clone, Debug, PartialEq)]
struct WrappedBytesList(Vec<Bytes>);

impl<'a> Arbitrary<'a> for WrappedBytesList {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let wrapped = Vec::<WrappedBytes>::arbitrary(u)?;
        Ok(Self(wrapped.into_iter().map(|b| b.0).collect()))
    }
}

/// A flat child record, nested inside [`Record`].
#[derive(Arbitrary, Clone, Debug, Default, PartialEq)]
struct Leaf {
    count: u32,
    note: String,
}

impl Message for Leaf {
    fn size_fields(&self, size: &mut SerialSize) -> Result<(), Error> {
        size.u32(self.count)?;
        size.text(&self.note)
    }

    fn write_fields(&self, enc: &mut Encoder<impl BufMut>) {
        enc.u32(0, self.count);
        enc.text(1, &self.note);
    }

    fn read_fields(dec: &mut Decoder<'_, impl Buf>) -> Result<Self, Error> {
        Ok(Self {
            count: dec.u32(0)?,
            note: dec.text(1)?,
        })
    }
}

/// One field of every family.
#[derive(Arbitrary, Debug)]
struct Record {
    flag: bool,
    tiny: u8,
    port: u16,
    count: u32,
    total: u64,
    delta: i32,
    offset: i64,
    ratio: f32,
    share: f64,
    at: WrappedTimestamp,
    blob: WrappedBytes,
    note: String,
    flags: Vec<bool>,
    ports: Vec<u16>,
    counts: Vec<u32>,
    totals: Vec<u64>,
    deltas: Vec<i32>,
    offsets: Vec<i64>,
    ratios: Vec<f32>,
    shares: Vec<f64>,
    ats: WrappedTimestamps,
    blobs: WrappedBytesList,
    notes: Vec<String>,
    child: Option<Leaf>,
    children: Vec<Leaf>,
}

// Floats compare by bit pattern so NaN inputs still count as equal.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ratio.to_bits() == other.ratio.to_bits()
            && self.share.to_bits() == other.share.to_bits()
            && self.ratios.len() == other.ratios.len()
            && self
                .ratios
                .iter()
                .zip(&other.ratios)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.shares.len() == other.shares.len()
            && self
                .shares
                .iter()
                .zip(&other.shares)
                .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.flag == other.flag
            && self.tiny == other.tiny
            && self.port == other.port
            && self.count == other.count
            && self.total == other.total
            && self.delta == other.delta
            && self.offset == other.offset
            && self.at == other.at
            && self.blob == other.blob
            && self.note == other.note
            && self.flags == other.flags
            && self.ports == other.ports
            && self.counts == other.counts
            && self.totals == other.totals
            && self.deltas == other.deltas
            && self.offsets == other.offsets
            && self.ats == other.ats
            && self.blobs == other.blobs
            && self.notes == other.notes
            && self.child == other.child
            && self.children == other.children
    }
}

impl Message for Record {
    fn size_fields(&self, size: &mut SerialSize) -> Result<(), Error> {
        size.bool(self.flag)?;
        size.u8(self.tiny)?;
        size.u16(self.port)?;
        size.u32(self.count)?;
        size.u64(self.total)?;
        size.i32(self.delta)?;
        size.i64(self.offset)?;
        size.f32(self.ratio)?;
        size.f64(self.share)?;
        size.timestamp(self.at.0)?;
        size.bytes(&self.blob.0)?;
        size.text(&self.note)?;
        size.bool_list(&self.flags)?;
        size.u16_list(&self.ports)?;
        size.u32_list(&self.counts)?;
        size.u64_list(&self.totals)?;
        size.i32_list(&self.deltas)?;
        size.i64_list(&self.offsets)?;
        size.f32_list(&self.ratios)?;
        size.f64_list(&self.shares)?;
        size.timestamp_list(&self.ats.0)?;
        size.bytes_list(&self.blobs.0)?;
        size.text_list(&self.notes)?;
        size.message(self.child.as_ref())?;
        size.message_list(&self.children)
    }

    fn write_fields(&self, enc: &mut Encoder<impl BufMut>) {
        enc.bool(0, self.flag);
        enc.u8(1, self.tiny);
        enc.u16(2, self.port);
        enc.u32(3, self.count);
        enc.u64(4, self.total);
        enc.i32(5, self.delta);
        enc.i64(6, self.offset);
        enc.f32(7, self.ratio);
        enc.f64(8, self.share);
        enc.timestamp(9, self.at.0);
        enc.bytes(10, &self.blob.0);
        enc.text(11, &self.note);
        enc.bool_list(12, &self.flags);
        enc.u16_list(13, &self.ports);
        enc.u32_list(14, &self.counts);
        enc.u64_list(15, &self.totals);
        enc.i32_list(16, &self.deltas);
        enc.i64_list(17, &self.offsets);
        enc.f32_list(18, &self.ratios);
        enc.f64_list(19, &self.shares);
        enc.timestamp_list(20, &self.ats.0);
        enc.bytes_list(21, &self.blobs.0);
        enc.text_list(22, &self.notes);
        enc.message(23, self.child.as_ref());
        enc.message_list(24, &self.children);
    }

    fn read_fields(dec: &mut Decoder<'_, impl Buf>) -> Result<Self, Error> {
        Ok(Self {
            flag: dec.bool(0)?,
            tiny: dec.u8(1)?,
            port: dec.u16(2)?,
            count: dec.u32(3)?,
            total: dec.u64(4)?,
            delta: dec.i32(5)?,
            offset: dec.i64(6)?,
            ratio: dec.f32(7)?,
            share: dec.f64(8)?,
            at: WrappedTimestamp(dec.timestamp(9)?),
            blob: WrappedBytes(dec.bytes(10)?),
            note: dec.text(11)?,
            flags: dec.bool_list(12)?,
            ports: dec.u16_list(13)?,
            counts: dec.u32_list(14)?,
            totals: dec.u64_list(15)?,
            deltas: dec.i32_list(16)?,
            offsets: dec.i64_list(17)?,
            ratios: dec.f32_list(18)?,
            shares: dec.f64_list(19)?,
            ats: WrappedTimestamps(dec.timestamp_list(20)?),
            blobs: WrappedBytesList(dec.bytes_list(21)?),
            notes: dec.text_list(22)?,
            child: dec.message(23)?,
            children: dec.message_list(24)?,
        })
    }
}

/// Permissive caps for the encode path: anything marshaled must unmarshal.
fn open_limits() -> Limits {
    Limits {
        max_field_len: usize::MAX,
        max_list_len: usize::MAX,
        max_depth: 64,
    }
}

fn roundtrip_record(record: Record) {
    let wire = record.marshal().expect("marshal failed");
    assert_eq!(
        wire.len(),
        record.marshal_len().expect("marshal_len failed"),
        "size walk disagrees with write walk"
    );

    let decoded = Record::unmarshal_exact(wire.clone(), &open_limits())
        .expect("failed to decode a successfully encoded record");
    assert_eq!(decoded, record);

    let rewire = decoded.marshal().expect("re-marshal failed");
    assert_eq!(rewire, wire, "re-encoding drifted");
}

fn roundtrip_wire(data: &[u8]) {
    let mut buf = data;
    let Ok(record) = Record::unmarshal(&mut buf, &Limits::default()) else {
        return;
    };

    // Whatever the decoder accepted must re-encode to exactly the bytes
    // it consumed.
    let consumed = data.len() - buf.remaining();
    let wire = record.marshal().expect("decoded record must re-marshal");
    assert_eq!(wire, &data[..consumed], "accepted bytes are not canonical");
}

#[derive(Arbitrary, Debug)]
enum FuzzInput<'a> {
    Encode(Record),
    Decode(&'a [u8]),
}

fn fuzz(input: FuzzInput) {
    match input {
        FuzzInput::Encode(record) => roundtrip_record(record),
        FuzzInput::Decode(data) => roundtrip_wire(data),
    }
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
