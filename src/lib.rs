//! # dcfile: distributed-class schema language and wire codec
//!
//! Declares distributed-class schemas (numeric, array, struct, class and method types)
//! with a PEST grammar, compiles literal values against them into a compact binary wire
//! format, and decodes that format back with a bounds-checked reader.
//!
//! ## Type model
//!
//! - Numerics: `int8`..`int64`, `uint8`..`uint64`, `float32`, `float64`, `char`, each with
//!   an optional range `(min-max)`, modulus `%n` and divisor `/n`
//! - Arrays: `T[n]` (fixed), `T[lo-hi]`, `T[]`; `char` arrays are strings and `uint8`
//!   arrays are blobs (`string`, `blob(8)`, `string(0-32)`)
//! - `struct` records, `dclass` classes with parents, method fields and molecular fields
//!
//! ## Wire format
//!
//! Little-endian scalars. Fixed-size values are concatenated with no framing; every
//! variable-size container is prefixed with a `u16` size tag holding the payload's
//! byte length.
//!
//! ## Example DC file
//!
//! ```text
//! keyword broadcast;
//! keyword ram;
//!
//! typedef uint16(0-360)/10 heading;
//!
//! struct Point {
//!   int16 x;
//!   int16 y;
//! };
//!
//! dclass Avatar {
//!   setName(string name) broadcast ram;
//!   setPos(Point p, heading h) broadcast ram;
//!   setPath(Point path[]) ram;
//!   setPosName : setPos, setName;
//! };
//! ```
//!
//! ## Usage
//!
//! ```text
//! let mut module = dcfile::parse_dcfile(src)?;
//! let ty = dcfile::parse_type(&mut module, "Point[2]")?;
//! let bytes = dcfile::parse_value(&ty, "[{1, 2}, {3, 4}]")?;
//! let value = dcfile::WireReader::new(&bytes).read_value(&ty)?;
//! ```
//!
//! See `tests/integration.rs` for full examples.

pub mod compiler;
pub mod diagnostics;
pub mod module;
pub mod parser;
pub mod range;
pub mod reader;
pub mod types;
pub mod value;
pub mod wire;

pub use compiler::{encode_value, CompileError, Composite, Literal, ValueCompiler};
pub use diagnostics::{Diagnostic, Diagnostics, ErrorKind, Span};
pub use module::{Binding, Import, Module, RecordBuilder, SchemaError};
pub use parser::{parse_dcfile, parse_dcfile_into, parse_type, parse_value, read_dcfile, LoadError};
pub use range::{ArrayRange, Number, NumericRange};
pub use reader::{ReadError, WireReader};
pub use types::{
    ArrayType, Class, Field, Method, NumericKind, NumericType, Parameter, Struct, Subtype, Type,
    TypeRef,
};
pub use value::Value;
pub use wire::{SizeTag, WireWriter};
