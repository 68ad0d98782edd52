//! Binary wire layout shared by the value compiler and the reader.
//!
//! All multi-byte scalars are little-endian. Fixed-size types are their concatenated
//! encodings with no framing; every variable-size container is prefixed by a [`SizeTag`]
//! holding the byte length (not the element count) of the payload that follows.

use crate::range::RawRange;
use crate::types::{NumericKind, Type};
use byteorder::{ByteOrder, LittleEndian};

/// Length prefix of a variable-size payload.
pub type SizeTag = u16;

/// Encoded width of a [`SizeTag`].
pub const SIZE_TAG_WIDTH: usize = std::mem::size_of::<SizeTag>();

/// Largest payload a size tag can describe.
pub const MAX_PAYLOAD: usize = SizeTag::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("Payload of {0} bytes is longer than the {max} bytes a size tag can hold.", max = MAX_PAYLOAD)]
    PayloadTooLong(usize),
}

/// `len` as a size tag, if it fits.
pub fn size_tag(len: usize) -> Result<SizeTag, WireError> {
    SizeTag::try_from(len).map_err(|_| WireError::PayloadTooLong(len))
}

/// Append-only little-endian encoder.
#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        WireWriter {
            buf: Vec::with_capacity(n),
        }
    }

    pub fn add_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn add_char(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn add_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn add_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn add_i16(&mut self, v: i16) {
        let mut b = [0u8; 2];
        LittleEndian::write_i16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_i64(&mut self, v: i64) {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_u64(&mut self, v: u64) {
        let mut b = [0u8; 8];
        LittleEndian::write_u64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_f64(&mut self, v: f64) {
        let mut b = [0u8; 8];
        LittleEndian::write_f64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn add_size(&mut self, v: SizeTag) {
        self.add_u16(v);
    }

    /// Raw bytes, no prefix.
    pub fn add_data(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Size tag followed by `data`.
    pub fn add_blob(&mut self, data: &[u8]) -> Result<(), WireError> {
        self.add_size(size_tag(data.len())?);
        self.add_data(data);
        Ok(())
    }

    pub fn add_string(&mut self, s: &str) -> Result<(), WireError> {
        self.add_blob(s.as_bytes())
    }

    /// Integer of `kind`'s width. `v` must already be within the kind's limits;
    /// higher bytes are dropped otherwise.
    pub fn add_int(&mut self, kind: NumericKind, v: i128) {
        let bytes = v.to_le_bytes();
        self.buf.extend_from_slice(&bytes[..kind.size()]);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Canonical default encoding of `ty`.
///
/// Numbers are zero, or the range minimum when zero is out of range. Fixed containers
/// repeat their element default; variable containers carry their minimum element count.
/// Records and methods concatenate the defaults of their members.
pub fn pack_default(ty: &Type) -> Vec<u8> {
    let mut w = WireWriter::with_capacity(ty.fixed_size());
    write_default(ty, &mut w);
    w.into_bytes()
}

fn write_default(ty: &Type, w: &mut WireWriter) {
    match ty {
        Type::Numeric(n) => match (n.kind(), n.raw_range()) {
            (NumericKind::Float32, r) => w.add_f32(float_default(r) as f32),
            (NumericKind::Float64, r) => w.add_f64(float_default(r)),
            (kind, Some(RawRange::Integer { min, max })) if !(min..=max).contains(&0) => {
                w.add_int(kind, min)
            }
            (kind, _) => w.add_int(kind, 0),
        },
        Type::Array(a) => {
            let element = pack_default(a.element());
            if ty.has_fixed_size() {
                for _ in 0..a.array_size() {
                    w.add_data(&element);
                }
            } else {
                let count = a.count_range().min;
                let len = usize::try_from(count)
                    .ok()
                    .and_then(|c| c.checked_mul(element.len()))
                    .unwrap_or(usize::MAX)
                    .min(MAX_PAYLOAD);
                let whole = if element.is_empty() { 0 } else { len / element.len() };
                w.add_size((whole * element.len()) as SizeTag);
                for _ in 0..whole {
                    w.add_data(&element);
                }
            }
        }
        Type::Struct(_) | Type::Class(_) => {
            if let Some(s) = ty.as_struct() {
                for f in s.layout() {
                    w.add_data(&f.default_value());
                }
            }
        }
        Type::Method(m) => {
            for p in m.parameters() {
                w.add_data(&p.default_value());
            }
        }
    }
}

fn float_default(range: Option<RawRange>) -> f64 {
    match range {
        Some(RawRange::Float { min, max }) if !(min <= 0.0 && 0.0 <= max) => min,
        _ => 0.0,
    }
}
