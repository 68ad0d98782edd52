//! Wire Reader: bounds-checked sequential cursor over packed bytes.
//!
//! Every read checks `offset + size <= len` first and fails with [`ReadError`] otherwise;
//! the cursor never moves on a failed read. The reader does no schema validation. A
//! tagged payload of zero bytes decodes as an empty container whatever its declared
//! element range.

use crate::diagnostics::ErrorKind;
use crate::types::{NumericKind, NumericType, Type};
use crate::value::Value;
use crate::wire::{SizeTag, SIZE_TAG_WIDTH};
use byteorder::{ByteOrder, LittleEndian};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("Read of {requested} bytes at offset {offset} goes past the end of a {len}-byte buffer.")]
    PastEnd {
        offset: usize,
        requested: usize,
        len: usize,
    },
    #[error("Cannot seek to offset {target} in a {len}-byte buffer.")]
    SeekPastEnd { target: usize, len: usize },
    #[error("Array element at offset {offset} decodes from zero bytes with {remaining} payload bytes left.")]
    EmptyElement { offset: usize, remaining: usize },
    #[error("{remaining} bytes left over after the last element of a counted array at offset {offset}.")]
    TrailingPayload { offset: usize, remaining: usize },
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::PastEnd { .. } | ReadError::SeekPastEnd { .. } => ErrorKind::ReadPastEnd,
            ReadError::EmptyElement { .. } | ReadError::TrailingPayload { .. } => {
                ErrorKind::LengthMismatch
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        WireReader { data, offset: 0 }
    }

    fn check_read_length(&self, n: usize) -> Result<(), ReadError> {
        match self.offset.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(ReadError::PastEnd {
                offset: self.offset,
                requested: n,
                len: self.data.len(),
            }),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        self.check_read_length(n)?;
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn read_bool(&mut self) -> Result<bool, ReadError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_char(&mut self) -> Result<u8, ReadError> {
        self.read_u8()
    }

    pub fn read_i8(&mut self) -> Result<i8, ReadError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ReadError> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReadError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, ReadError> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    pub fn read_size(&mut self) -> Result<SizeTag, ReadError> {
        Ok(LittleEndian::read_u16(self.take(SIZE_TAG_WIDTH)?))
    }

    /// Size-tagged string. Strings are byte strings; no encoding is checked.
    pub fn read_string(&mut self) -> Result<Vec<u8>, ReadError> {
        Ok(self.read_datagram()?.data.to_vec())
    }

    /// String of exactly `n` bytes, no tag.
    pub fn read_string_len(&mut self, n: usize) -> Result<Vec<u8>, ReadError> {
        Ok(self.take(n)?.to_vec())
    }

    /// Size-tagged blob.
    pub fn read_blob(&mut self) -> Result<Vec<u8>, ReadError> {
        Ok(self.read_datagram()?.data.to_vec())
    }

    pub fn read_blob_len(&mut self, n: usize) -> Result<Vec<u8>, ReadError> {
        Ok(self.take(n)?.to_vec())
    }

    /// Next `n` bytes, borrowed from the buffer.
    pub fn read_data(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        self.take(n)
    }

    /// A reader over the next size-tagged payload; this cursor moves past it.
    pub fn read_datagram(&mut self) -> Result<WireReader<'a>, ReadError> {
        let start = self.offset;
        let n = self.read_size()? as usize;
        match self.take(n) {
            Ok(payload) => Ok(WireReader::new(payload)),
            Err(e) => {
                self.offset = start;
                Err(e)
            }
        }
    }

    /// Everything left; the cursor ends at the end of the buffer.
    pub fn read_remainder(&mut self) -> &'a [u8] {
        let rest = &self.data[self.offset..];
        self.offset = self.data.len();
        rest
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.take(n).map(|_| ())
    }

    /// Skip one encoded value of `ty`.
    pub fn skip_type(&mut self, ty: &Type) -> Result<(), ReadError> {
        if ty.has_fixed_size() {
            return self.skip(ty.fixed_size());
        }
        let start = self.offset;
        let result = match ty {
            Type::Numeric(_) => self.skip(ty.fixed_size()),
            Type::Array(_) => self.read_datagram().map(|_| ()),
            Type::Struct(_) | Type::Class(_) => ty
                .as_struct()
                .into_iter()
                .flat_map(|s| s.layout())
                .try_for_each(|f| self.skip_type(f.ty())),
            Type::Method(m) => m.parameters().iter().try_for_each(|p| self.skip_type(p.ty())),
        };
        if result.is_err() {
            self.offset = start;
        }
        result
    }

    /// Raw encoding of one value of `ty`.
    pub fn read_packed(&mut self, ty: &Type) -> Result<&'a [u8], ReadError> {
        let start = self.offset;
        self.skip_type(ty)?;
        Ok(&self.data[start..self.offset])
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn tell(&self) -> usize {
        self.offset
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), ReadError> {
        if offset > self.data.len() {
            return Err(ReadError::SeekPastEnd {
                target: offset,
                len: self.data.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }

    /// Decode one value of `ty`, walking fields, elements and parameters in the same
    /// order the compiler packs them. On error the cursor is left where it started.
    pub fn read_value(&mut self, ty: &Type) -> Result<Value, ReadError> {
        let start = self.offset;
        let result = self.read_value_inner(ty);
        if result.is_err() {
            self.offset = start;
        }
        result
    }

    fn read_value_inner(&mut self, ty: &Type) -> Result<Value, ReadError> {
        match ty {
            Type::Numeric(n) => self.read_numeric(n),
            Type::Array(a) => {
                let fixed = ty.has_fixed_size();
                if a.is_string() {
                    let s = if fixed {
                        self.read_string_len(ty.fixed_size())?
                    } else {
                        self.read_string()?
                    };
                    return Ok(Value::String(s));
                }
                if a.is_blob() {
                    let b = if fixed {
                        self.read_blob_len(ty.fixed_size())?
                    } else {
                        self.read_blob()?
                    };
                    return Ok(Value::Blob(b));
                }
                let mut items = Vec::new();
                if fixed {
                    for _ in 0..a.array_size() {
                        items.push(self.read_value_inner(a.element())?);
                    }
                } else {
                    let base = self.offset + SIZE_TAG_WIDTH;
                    let mut payload = self.read_datagram()?;
                    if a.array_size() > 0 {
                        // Counted array of variable-size elements: the tag bounds the
                        // payload, the count bounds the loop.
                        for _ in 0..a.array_size() {
                            items.push(payload.read_value_inner(a.element())?);
                        }
                        if payload.remaining() > 0 {
                            return Err(ReadError::TrailingPayload {
                                offset: base + payload.tell(),
                                remaining: payload.remaining(),
                            });
                        }
                    } else {
                        while payload.remaining() > 0 {
                            let before = payload.tell();
                            items.push(payload.read_value_inner(a.element())?);
                            if payload.tell() == before {
                                return Err(ReadError::EmptyElement {
                                    offset: base + before,
                                    remaining: payload.remaining(),
                                });
                            }
                        }
                    }
                }
                Ok(Value::Array(items))
            }
            Type::Struct(_) | Type::Class(_) => {
                let mut fields = Vec::new();
                if let Some(s) = ty.as_struct() {
                    for f in s.layout() {
                        fields.push((f.name().to_string(), self.read_value_inner(f.ty())?));
                    }
                }
                Ok(Value::Struct(fields))
            }
            Type::Method(m) => {
                let mut args = Vec::with_capacity(m.num_parameters());
                for p in m.parameters() {
                    args.push(self.read_value_inner(p.ty())?);
                }
                Ok(Value::Method(args))
            }
        }
    }

    fn read_numeric(&mut self, n: &NumericType) -> Result<Value, ReadError> {
        let v = match n.kind() {
            NumericKind::Int8 => Value::Int8(self.read_i8()?),
            NumericKind::Int16 => Value::Int16(self.read_i16()?),
            NumericKind::Int32 => Value::Int32(self.read_i32()?),
            NumericKind::Int64 => Value::Int64(self.read_i64()?),
            NumericKind::Uint8 => Value::Uint8(self.read_u8()?),
            NumericKind::Uint16 => Value::Uint16(self.read_u16()?),
            NumericKind::Uint32 => Value::Uint32(self.read_u32()?),
            NumericKind::Uint64 => Value::Uint64(self.read_u64()?),
            NumericKind::Float32 => Value::Float32(self.read_f32()?),
            NumericKind::Float64 => Value::Float64(self.read_f64()?),
            NumericKind::Char => Value::Char(self.read_char()?),
        };
        if n.divisor() == 1 {
            return Ok(v);
        }
        let scaled = match &v {
            Value::Float32(x) => Value::Float64(f64::from(*x) / f64::from(n.divisor())),
            Value::Float64(x) => Value::Float64(*x / f64::from(n.divisor())),
            other => Value::Scaled {
                raw: other
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| other.as_u64().map(i128::from))
                    .unwrap_or_default(),
                divisor: n.divisor(),
            },
        };
        Ok(scaled)
    }
}
