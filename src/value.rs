//! Decoded values.
//!
//! `Display` writes a value in the DC literal syntax, so its output can be parsed back
//! with [`parse_value`](crate::parser::parse_value) against the same type.

use crate::range::Number;
use std::fmt;

/// A single decoded value (scalar or composite).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    /// Also used for float types with a divisor.
    Float64(f64),
    /// Integer type with a divisor: the stored integer, read as `raw / divisor`.
    Scaled { raw: i128, divisor: u32 },
    Char(u8),
    /// DC strings are byte strings.
    String(Vec<u8>),
    Blob(Vec<u8>),
    Array(Vec<Value>),
    /// Field name and value, in encoding order.
    Struct(Vec<(String, Value)>),
    Method(Vec<Value>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint8(x) => Some(*x as u64),
            Value::Uint16(x) => Some(*x as u64),
            Value::Uint32(x) => Some(*x as u64),
            Value::Uint64(x) => Some(*x),
            Value::Char(x) => Some(*x as u64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(x) => Some(*x as i64),
            Value::Int16(x) => Some(*x as i64),
            Value::Int32(x) => Some(*x as i64),
            Value::Int64(x) => Some(*x),
            Value::Uint8(x) => Some(*x as i64),
            Value::Uint16(x) => Some(*x as i64),
            Value::Uint32(x) => Some(*x as i64),
            Value::Uint64(x) => i64::try_from(*x).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(x) => Some(*x as f64),
            Value::Float64(x) => Some(*x),
            Value::Scaled { raw, divisor } => Some(*raw as f64 / f64::from(*divisor)),
            _ => None,
        }
    }

    /// The string payload, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) | Value::String(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) | Value::Method(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Struct(f) => Some(f),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_struct()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\t' => f.write_str("\\t")?,
            0x20..=0x7E => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{:02x}", b)?,
        }
    }
    f.write_str("\"")
}

fn write_list(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", v)?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(x) => write!(f, "{}", x),
            Value::Int16(x) => write!(f, "{}", x),
            Value::Int32(x) => write!(f, "{}", x),
            Value::Int64(x) => write!(f, "{}", x),
            Value::Uint8(x) => write!(f, "{}", x),
            Value::Uint16(x) => write!(f, "{}", x),
            Value::Uint32(x) => write!(f, "{}", x),
            Value::Uint64(x) => write!(f, "{}", x),
            Value::Float32(x) => write!(f, "{:?}", x),
            Value::Float64(x) => write!(f, "{:?}", x),
            Value::Scaled { raw, divisor } => write!(f, "{}", Number::Scaled { raw: *raw, divisor: *divisor }),
            Value::Char(c) => write_quoted(f, &[*c]),
            Value::String(s) => write_quoted(f, s),
            Value::Blob(b) => write!(f, "<{}>", hex::encode(b)),
            Value::Array(items) => write_list(f, "[", items, "]"),
            Value::Struct(fields) => {
                f.write_str("{")?;
                for (i, (_, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("}")
            }
            Value::Method(args) => write_list(f, "(", args, ")"),
        }
    }
}
