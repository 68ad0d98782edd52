//! Value Compiler: packs literal values against a schema type.
//!
//! The compiler is driven by flat events rather than by recursion, so it can sit behind
//! any front end. It keeps an explicit LIFO stack of frames and a single depth counter:
//!
//! - [`ValueCompiler::open_composite`] takes the next expected type, opens a frame for it
//!   and pushes each child's expected type in reverse, child `i` tagged with `depth + i`.
//! - [`ValueCompiler::pop_and_pack_scalar`] takes the next expected type and packs a
//!   literal. When the type was pushed explicitly the depth must equal its tag.
//! - [`ValueCompiler::finish_child`] advances the depth by one after each element, field
//!   or argument; [`ValueCompiler::expand`] packs `N` copies and advances it by `N`.
//! - [`ValueCompiler::close_composite`] compares `depth - baseline` with what the type
//!   allows, prepends a size tag to variable arrays and hands the bytes to the parent.
//!
//! Each event reports at most one error and still emits best-effort bytes, so one pass
//! over a value surfaces every independent problem.

use crate::diagnostics::ErrorKind;
use crate::range::Number;
use crate::types::{ArrayType, NumericKind, NumericType, RawModulus, Type, TypeRef};
use crate::value::Value;
use crate::wire::{self, WireWriter, MAX_PAYLOAD};
use tracing::trace;

/// Scalar literal as produced by a front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Uint(u64),
    Real(f64),
    /// Quoted string, escapes already resolved.
    String(Vec<u8>),
    /// `<...>` hex string, already decoded.
    Hex(Vec<u8>),
    /// Exact `raw / divisor`, from a decoded value of a divided integer type.
    Scaled { raw: i128, divisor: u32 },
}

impl Literal {
    fn number(&self) -> Option<Number> {
        match *self {
            Literal::Int(i) => Some(Number::Int(i)),
            Literal::Uint(u) => Some(Number::Uint(u)),
            Literal::Real(f) => Some(Number::Float(f)),
            Literal::Scaled { raw, divisor } => Some(Number::Scaled { raw, divisor }),
            Literal::String(_) | Literal::Hex(_) => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Literal::Int(_) => "signed integer",
            Literal::Uint(_) => "unsigned integer",
            Literal::Real(_) | Literal::Scaled { .. } => "floating-point",
            Literal::String(_) => "string",
            Literal::Hex(_) => "hex",
        }
    }
}

/// Composite literal shapes: `[..]`, `{..}` and `(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    Array,
    Struct,
    Method,
}

impl Composite {
    fn describe(&self) -> &'static str {
        match self {
            Composite::Array => "array",
            Composite::Struct => "struct",
            Composite::Method => "method",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    OutOfRange(String),
    #[error("{0}")]
    DepthImbalance(String),
    #[error("{0}")]
    LiteralKind(String),
    #[error("{0}")]
    LengthMismatch(String),
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::OutOfRange(_) => ErrorKind::RangeViolation,
            CompileError::DepthImbalance(_) => ErrorKind::DepthImbalance,
            CompileError::LiteralKind(_) => ErrorKind::LiteralKind,
            CompileError::LengthMismatch(_) => ErrorKind::LengthMismatch,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::OutOfRange(m)
            | CompileError::DepthImbalance(m)
            | CompileError::LiteralKind(m)
            | CompileError::LengthMismatch(m) => m,
        }
    }
}

#[derive(Debug)]
enum Frame {
    /// A value of `ty` is expected once the depth reaches `depth`.
    Expected { ty: TypeRef, depth: usize },
    /// A composite collecting its children's bytes. `ty` is `None` for a placeholder
    /// opened after a shape mismatch; its content is dropped.
    Open {
        ty: Option<TypeRef>,
        kind: Composite,
        baseline: usize,
        buf: WireWriter,
        overflowed: bool,
    },
}

/// One value compilation. Not shared between threads; the types it reads are.
#[derive(Debug)]
pub struct ValueCompiler {
    stack: Vec<Frame>,
    depth: usize,
    out: WireWriter,
    errors: usize,
}

impl ValueCompiler {
    pub fn new(ty: &TypeRef) -> Self {
        let mut c = ValueCompiler {
            stack: Vec::new(),
            depth: 0,
            out: WireWriter::with_capacity(ty.fixed_size()),
            errors: 0,
        };
        c.push_expected_type(ty.clone());
        c
    }

    /// Expect one more value of `ty` at the current depth.
    pub fn push_expected_type(&mut self, ty: TypeRef) {
        trace!(depth = self.depth, ty = %ty.display_name(), "push expected");
        self.stack.push(Frame::Expected {
            ty,
            depth: self.depth,
        });
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of errors reported by events so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Pack one scalar literal into the next expected slot.
    pub fn pop_and_pack_scalar(&mut self, lit: &Literal) -> Result<(), CompileError> {
        let (ty, slot_err) = self.take_slot();
        let pack_err = match ty {
            Some(ty) => {
                trace!(depth = self.depth, ty = %ty.display_name(), literal = lit.describe(), "pack scalar");
                pack_literal(&ty, lit, self.sink()).err()
            }
            None => None,
        };
        self.report(slot_err.or(pack_err))
    }

    /// Begin a composite literal of shape `kind` for the next expected slot.
    pub fn open_composite(&mut self, kind: Composite) -> Result<(), CompileError> {
        let (ty, slot_err) = self.take_slot();
        let baseline = self.depth;
        let mut err = slot_err;

        let ty = ty.filter(|ty| {
            let fits = match kind {
                Composite::Array => ty.as_array().is_some(),
                Composite::Struct => ty.as_struct().is_some(),
                Composite::Method => ty.as_method().is_some(),
            };
            if !fits && err.is_none() {
                let what = match kind {
                    Composite::Array => "array-composition for non-array",
                    Composite::Struct => "struct-composition for non-struct",
                    Composite::Method => "method-value for non-method",
                };
                err = Some(CompileError::LiteralKind(format!(
                    "Cannot use {} type '{}'.",
                    what,
                    ty.display_name()
                )));
            }
            fits
        });

        trace!(depth = baseline, kind = kind.describe(), placeholder = ty.is_none(), "open composite");
        let capacity = ty.as_ref().map_or(0, |t| t.fixed_size());
        self.stack.push(Frame::Open {
            ty: ty.clone(),
            kind,
            baseline,
            buf: WireWriter::with_capacity(capacity),
            overflowed: false,
        });

        let children: Vec<TypeRef> = match ty.as_deref() {
            Some(Type::Method(m)) => m.parameters().iter().map(|p| p.ty().clone()).collect(),
            Some(t) => t
                .as_struct()
                .map(|s| s.layout().map(|f| f.ty().clone()).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        };
        for (i, child) in children.into_iter().enumerate().rev() {
            self.stack.push(Frame::Expected {
                ty: child,
                depth: baseline + i,
            });
        }
        self.report(err)
    }

    /// One element, field or argument is complete.
    pub fn finish_child(&mut self) {
        self.depth += 1;
    }

    /// Pack `count` copies of an array element and advance the depth by `count`.
    /// Replaces the `finish_child` call for that element.
    pub fn expand(&mut self, lit: &Literal, count: u32) -> Result<(), CompileError> {
        let depth = self.depth;
        let array = match self.stack.last() {
            Some(Frame::Open {
                ty: Some(ty),
                kind: Composite::Array,
                baseline,
                ..
            }) => Some((ty.clone(), depth - baseline)),
            Some(Frame::Open { ty: None, .. }) => None,
            _ => {
                self.depth += count as usize;
                return self.report(Some(CompileError::LiteralKind(
                    "Array expansion can only be used inside an array value.".to_string(),
                )));
            }
        };
        self.depth += count as usize;
        let Some((ty, produced)) = array else {
            return Ok(());
        };
        let Some(a) = ty.as_array() else {
            return Ok(());
        };

        let mut element = WireWriter::new();
        let err = pack_literal(a.element(), lit, &mut element).err();
        let copies = expansion_limit(&ty, a, element.len(), produced as u64).min(u64::from(count));
        trace!(depth, count, copies, "expand");
        let sink = self.sink();
        for _ in 0..copies {
            sink.add_data(element.as_bytes());
        }
        self.report(err)
    }

    /// Close the innermost composite and pass its bytes to the enclosing one.
    pub fn close_composite(&mut self) -> Result<(), CompileError> {
        let mut err = None;

        let mut missing = Vec::new();
        while let Some(Frame::Expected { .. }) = self.stack.last() {
            if let Some(Frame::Expected { ty, .. }) = self.stack.pop() {
                missing.push(ty);
            }
        }

        let Some(Frame::Open {
            ty,
            kind,
            baseline,
            mut buf,
            overflowed,
        }) = self.stack.pop()
        else {
            return self.report(Some(CompileError::DepthImbalance(
                "Closing a composite value that was never opened.".to_string(),
            )));
        };

        let count = self.depth.saturating_sub(baseline);
        self.depth = baseline;
        trace!(depth = baseline, count, kind = kind.describe(), "close composite");

        let Some(ty) = ty else {
            return Ok(());
        };

        if !missing.is_empty() {
            err = Some(CompileError::DepthImbalance(format!(
                "Too few nested values while parsing value for {}.",
                ty.display_name()
            )));
            for t in &missing {
                buf.add_data(&wire::pack_default(t));
            }
        }

        let bytes = match ty.as_ref() {
            Type::Array(a) => {
                if err.is_none() {
                    err = check_element_count(a, count as u64);
                }
                if ty.has_fixed_size() {
                    buf.into_bytes()
                } else {
                    let mut tagged = WireWriter::with_capacity(buf.len() + wire::SIZE_TAG_WIDTH);
                    if let Err(e) = tagged.add_blob(buf.as_bytes()) {
                        err = err.or(Some(CompileError::LengthMismatch(e.to_string())));
                    }
                    tagged.into_bytes()
                }
            }
            _ => {
                let expected = match ty.as_ref() {
                    Type::Method(m) => m.num_parameters(),
                    other => other.as_struct().map_or(0, |s| s.layout_len()),
                };
                if err.is_none() && !overflowed && count != expected {
                    let dir = if count > expected { "many" } else { "few" };
                    err = Some(CompileError::DepthImbalance(format!(
                        "Too {} nested values while parsing value for {}.",
                        dir,
                        ty.display_name()
                    )));
                }
                buf.into_bytes()
            }
        };
        self.sink().add_data(&bytes);
        self.report(err)
    }

    /// Packed bytes of the value. Fails if a composite is still open or the root value
    /// was never supplied; errors from earlier events are not repeated here.
    pub fn finish(self) -> Result<Vec<u8>, CompileError> {
        match self.stack.last() {
            None => Ok(self.out.into_bytes()),
            Some(Frame::Expected { ty, .. }) => Err(CompileError::DepthImbalance(format!(
                "Too few nested values: missing a {} value.",
                ty.display_name()
            ))),
            Some(Frame::Open { kind, .. }) => Err(CompileError::DepthImbalance(format!(
                "Unterminated {} value.",
                kind.describe()
            ))),
        }
    }

    fn report(&mut self, err: Option<CompileError>) -> Result<(), CompileError> {
        match err {
            Some(e) => {
                self.errors += 1;
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Type of the next value and a depth error, if any. `None` means the value is
    /// not stored anywhere.
    fn take_slot(&mut self) -> (Option<TypeRef>, Option<CompileError>) {
        let depth = self.depth;
        match self.stack.last_mut() {
            None => (
                None,
                Some(CompileError::DepthImbalance(
                    "Too many values: nothing more is expected.".to_string(),
                )),
            ),
            Some(Frame::Open { ty: None, .. }) => (None, None),
            Some(Frame::Open {
                ty: Some(ty),
                kind: Composite::Array,
                ..
            }) => (ty.as_array().map(|a| a.element().clone()), None),
            Some(Frame::Open {
                ty: Some(ty),
                overflowed,
                ..
            }) => {
                let first = !*overflowed;
                *overflowed = true;
                let err = first.then(|| {
                    CompileError::DepthImbalance(format!(
                        "Too many nested values while parsing value for {}.",
                        ty.display_name()
                    ))
                });
                (None, err)
            }
            Some(Frame::Expected { .. }) => match self.stack.pop() {
                Some(Frame::Expected { ty, depth: want }) => {
                    let err = if depth != want {
                        let dir = if depth < want { "few" } else { "many" };
                        Some(CompileError::DepthImbalance(format!(
                            "Too {} nested values before this {} value.",
                            dir,
                            ty.display_name()
                        )))
                    } else {
                        None
                    };
                    (Some(ty), err)
                }
                _ => (None, None),
            },
        }
    }

    /// Buffer of the innermost open composite, or the final output.
    fn sink(&mut self) -> &mut WireWriter {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Open { buf, .. } = frame {
                return buf;
            }
        }
        &mut self.out
    }
}

/// How many more copies of an element an array can still usefully hold.
fn expansion_limit(ty: &Type, a: &ArrayType, element_len: usize, produced: u64) -> u64 {
    let max = if ty.has_fixed_size() {
        a.array_size()
    } else {
        let by_tag = (MAX_PAYLOAD / element_len.max(1)) as u64 + 1;
        a.count_range().max.min(by_tag)
    };
    max.saturating_add(1).saturating_sub(produced)
}

fn check_element_count(a: &ArrayType, count: u64) -> Option<CompileError> {
    let range = a.count_range();
    if count == 0 {
        if a.array_size() > 0 {
            return Some(CompileError::DepthImbalance(format!(
                "Fixed-sized array of size {} can't have 0 elements.",
                a.array_size()
            )));
        }
        if range.min > 0 {
            return Some(CompileError::DepthImbalance(format!(
                "Too few elements in array value, minimum {}.",
                range.min
            )));
        }
        return None;
    }
    if count < range.min {
        Some(CompileError::DepthImbalance(format!(
            "Too few elements in array value, minimum {}.",
            range.min
        )))
    } else if count > range.max {
        Some(CompileError::DepthImbalance(format!(
            "Too many elements in array value, maximum {}.",
            range.max
        )))
    } else {
        None
    }
}

/// Pack `lit` as a value of `ty`. On error, best-effort bytes are still written.
pub fn pack_literal(ty: &Type, lit: &Literal, out: &mut WireWriter) -> Result<(), CompileError> {
    match (ty, lit) {
        (Type::Numeric(n), _) => match lit.number() {
            Some(num) => pack_number(n, num, out),
            None if n.kind() == NumericKind::Char => pack_char(lit, out),
            None => {
                out.add_data(&wire::pack_default(ty));
                Err(kind_mismatch(ty, lit))
            }
        },
        (Type::Array(a), Literal::String(bytes)) if a.is_string() => pack_bytes(ty, a, bytes, "string", out),
        (Type::Array(a), Literal::Hex(bytes)) if a.is_blob() => pack_bytes(ty, a, bytes, "blob", out),
        (Type::Array(a), Literal::String(bytes) | Literal::Hex(bytes))
            if a.is_string() || a.is_blob() =>
        {
            let what = if a.is_blob() { "blob" } else { "string" };
            // One error per event: the kind error wins over a length error.
            let _ = pack_bytes(ty, a, bytes, what, out);
            Err(kind_mismatch(ty, lit))
        }
        _ => {
            out.add_data(&wire::pack_default(ty));
            Err(kind_mismatch(ty, lit))
        }
    }
}

fn kind_mismatch(ty: &Type, lit: &Literal) -> CompileError {
    let msg = match lit {
        Literal::String(_) => format!("Cannot use string value for non-string type '{}'.", ty.display_name()),
        Literal::Hex(_) => format!("Cannot use hex value for non-blob type '{}'.", ty.display_name()),
        other => format!(
            "Cannot use {} value for non-numeric datatype '{}'.",
            other.describe(),
            ty.display_name()
        ),
    };
    CompileError::LiteralKind(msg)
}

fn pack_char(lit: &Literal, out: &mut WireWriter) -> Result<(), CompileError> {
    match lit {
        Literal::String(b) | Literal::Hex(b) if b.len() == 1 => {
            out.add_char(b[0]);
            Ok(())
        }
        _ => {
            out.add_char(0);
            Err(CompileError::LengthMismatch("Single character required.".to_string()))
        }
    }
}

fn pack_bytes(
    ty: &Type,
    a: &ArrayType,
    bytes: &[u8],
    what: &str,
    out: &mut WireWriter,
) -> Result<(), CompileError> {
    if ty.has_fixed_size() {
        let size = ty.fixed_size();
        let mut fixed = bytes.to_vec();
        fixed.resize(size, 0);
        out.add_data(&fixed);
        if bytes.len() != size {
            return Err(CompileError::LengthMismatch(format!(
                "Value for fixed-length {} has incorrect length.",
                what
            )));
        }
        return Ok(());
    }

    let range = a.count_range();
    let len = bytes.len() as u64;
    let result = if !range.contains(len) {
        Err(CompileError::LengthMismatch(format!(
            "Value of length {} for {} is outside its length range ({}).",
            len, what, range
        )))
    } else {
        Ok(())
    };
    match out.add_blob(bytes) {
        Ok(()) => result,
        Err(e) => {
            out.add_size(wire::SizeTag::MAX);
            out.add_data(&bytes[..MAX_PAYLOAD]);
            result.and(Err(CompileError::LengthMismatch(e.to_string())))
        }
    }
}

fn pack_number(n: &NumericType, num: Number, out: &mut WireWriter) -> Result<(), CompileError> {
    let kind = n.kind();
    let name = kind.name();

    if kind.is_float() {
        let mut v = num.scaled_float(n.divisor());
        if let Some(RawModulus::Float(m)) = n.raw_modulus() {
            v = v.rem_euclid(m);
        }
        let mut err = None;
        if kind == NumericKind::Float32 {
            let f = v as f32;
            if f.is_infinite() && v.is_finite() {
                err = Some(CompileError::OutOfRange(
                    "Value is out of range for type 'float32'.".to_string(),
                ));
            }
            out.add_f32(f);
        } else {
            out.add_f64(v);
        }
        if err.is_none() {
            if n.raw_range().is_some_and(|r| !r.contains_float(v)) {
                err = Some(range_error(n, num));
            }
        }
        return err.map_or(Ok(()), Err);
    }

    if matches!(num, Number::Float(_) | Number::Scaled { .. }) && n.divisor() == 1 {
        out.add_data(&wire::pack_default(&Type::Numeric(n.clone())));
        return Err(CompileError::OutOfRange(
            "Cannot use floating-point value for integer datatype.".to_string(),
        ));
    }

    let Some(mut raw) = num.scaled_integer(n.divisor()) else {
        out.add_int(kind, 0);
        return Err(CompileError::OutOfRange(format!(
            "Number out of range for type '{}'.",
            name
        )));
    };
    if let Some(RawModulus::Integer(m)) = n.raw_modulus() {
        raw = raw.rem_euclid(m);
    }
    out.add_int(kind, raw);

    let (lo, hi) = kind.int_bounds().unwrap_or((i128::MIN, i128::MAX));
    if !kind.is_signed() && raw < 0 {
        return Err(CompileError::OutOfRange(
            "Can't use negative value for unsigned integer datatype.".to_string(),
        ));
    }
    if raw < lo || raw > hi {
        let msg = match num {
            Number::Uint(_) if kind.is_signed() => {
                "Unsigned integer out of range for signed integer datatype.".to_string()
            }
            _ if kind.is_signed() => format!("Signed integer out of range for type '{}'.", name),
            _ => format!("Unsigned integer out of range for type '{}'.", name),
        };
        return Err(CompileError::OutOfRange(msg));
    }
    match n.raw_range() {
        Some(r) if !r.contains_integer(raw) => Err(range_error(n, num)),
        _ => Ok(()),
    }
}

fn range_error(n: &NumericType, num: Number) -> CompileError {
    let range = n
        .range()
        .map(|r| r.to_string())
        .unwrap_or_default();
    CompileError::OutOfRange(format!(
        "Value {} is out of range ({}) for type '{}'.",
        num,
        range,
        n.kind().name()
    ))
}

/// Pack a decoded value tree against `ty` through the same compiler events a text
/// front end uses. Stops at the first error.
pub fn encode_value(ty: &TypeRef, value: &Value) -> Result<Vec<u8>, CompileError> {
    let mut c = ValueCompiler::new(ty);
    emit(&mut c, value)?;
    c.finish()
}

fn emit(c: &mut ValueCompiler, value: &Value) -> Result<(), CompileError> {
    let (kind, children): (Composite, Vec<&Value>) = match value {
        Value::Array(items) => (Composite::Array, items.iter().collect()),
        Value::Struct(fields) => (Composite::Struct, fields.iter().map(|(_, v)| v).collect()),
        Value::Method(args) => (Composite::Method, args.iter().collect()),
        scalar => return c.pop_and_pack_scalar(&scalar_literal(scalar)),
    };
    c.open_composite(kind)?;
    for child in children {
        emit(c, child)?;
        c.finish_child();
    }
    c.close_composite()
}

fn scalar_literal(value: &Value) -> Literal {
    match value {
        Value::Int8(v) => Literal::Int(i64::from(*v)),
        Value::Int16(v) => Literal::Int(i64::from(*v)),
        Value::Int32(v) => Literal::Int(i64::from(*v)),
        Value::Int64(v) => Literal::Int(*v),
        Value::Uint8(v) => Literal::Uint(u64::from(*v)),
        Value::Uint16(v) => Literal::Uint(u64::from(*v)),
        Value::Uint32(v) => Literal::Uint(u64::from(*v)),
        Value::Uint64(v) => Literal::Uint(*v),
        Value::Float32(v) => Literal::Real(f64::from(*v)),
        Value::Float64(v) => Literal::Real(*v),
        Value::Scaled { raw, divisor } => Literal::Scaled { raw: *raw, divisor: *divisor },
        Value::Char(c) => Literal::String(vec![*c]),
        Value::String(s) => Literal::String(s.clone()),
        Value::Blob(b) => Literal::Hex(b.clone()),
        Value::Array(_) | Value::Struct(_) | Value::Method(_) => Literal::Uint(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::range::{ArrayRange, NumericRange};
    use crate::types::Field;
    use std::sync::Arc;

    fn numeric(kind: NumericKind) -> TypeRef {
        Type::numeric(kind)
    }

    fn array(element: TypeRef, range: Option<ArrayRange>) -> TypeRef {
        Arc::new(Type::Array(ArrayType::new(element, range)))
    }

    fn scalar(ty: &TypeRef, lit: Literal) -> Result<Vec<u8>, CompileError> {
        let mut c = ValueCompiler::new(ty);
        c.pop_and_pack_scalar(&lit)?;
        c.finish()
    }

    #[test]
    fn uint8_bounds() {
        let ty = numeric(NumericKind::Uint8);
        assert_eq!(scalar(&ty, Literal::Uint(255)).unwrap(), vec![0xFF]);
        let err = scalar(&ty, Literal::Uint(256)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
        assert_eq!(err.message(), "Unsigned integer out of range for type 'uint8'.");
        assert_eq!(
            scalar(&ty, Literal::Int(-1)).unwrap_err().message(),
            "Can't use negative value for unsigned integer datatype."
        );
    }

    #[test]
    fn unsigned_literal_for_signed_type() {
        let ty = numeric(NumericKind::Int8);
        assert_eq!(scalar(&ty, Literal::Uint(127)).unwrap(), vec![0x7F]);
        assert_eq!(
            scalar(&ty, Literal::Uint(128)).unwrap_err().message(),
            "Unsigned integer out of range for signed integer datatype."
        );
        assert_eq!(
            scalar(&ty, Literal::Int(-129)).unwrap_err().message(),
            "Signed integer out of range for type 'int8'."
        );
    }

    #[test]
    fn integer_literal_widens_into_float() {
        let ty = numeric(NumericKind::Float64);
        assert_eq!(scalar(&ty, Literal::Int(-2)).unwrap(), (-2.0f64).to_le_bytes().to_vec());
    }

    #[test]
    fn float32_overflow_rejected() {
        let ty = numeric(NumericKind::Float32);
        let err = scalar(&ty, Literal::Real(1e300)).unwrap_err();
        assert_eq!(err.message(), "Value is out of range for type 'float32'.");
    }

    #[test]
    fn divisor_scales_and_rounds() {
        let mut n = NumericType::new(NumericKind::Uint16);
        n.set_divisor(100).unwrap();
        let ty: TypeRef = Arc::new(Type::Numeric(n));
        assert_eq!(scalar(&ty, Literal::Real(2.54)).unwrap(), vec![254, 0]);
    }

    #[test]
    fn float_rejected_for_plain_integer() {
        let ty = numeric(NumericKind::Int32);
        let err = scalar(&ty, Literal::Real(1.5)).unwrap_err();
        assert_eq!(err.message(), "Cannot use floating-point value for integer datatype.");
    }

    #[test]
    fn modulus_wraps_before_range_check() {
        let mut n = NumericType::new(NumericKind::Uint16);
        n.set_modulus(360.0).unwrap();
        let ty: TypeRef = Arc::new(Type::Numeric(n));
        assert_eq!(scalar(&ty, Literal::Uint(370)).unwrap(), vec![10, 0]);
        assert_eq!(scalar(&ty, Literal::Int(-10)).unwrap(), vec![0x5E, 0x01]);
    }

    #[test]
    fn declared_range_rejects_value() {
        let mut n = NumericType::new(NumericKind::Int16);
        n.set_range(NumericRange::new(Number::Int(-5), Number::Int(5)))
            .unwrap();
        let ty: TypeRef = Arc::new(Type::Numeric(n));
        assert_eq!(scalar(&ty, Literal::Int(-5)).unwrap(), vec![0xFB, 0xFF]);
        let err = scalar(&ty, Literal::Int(6)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
        assert_eq!(err.message(), "Value 6 is out of range (-5-5) for type 'int16'.");
    }

    #[test]
    fn fixed_array_counts() {
        let ty = array(numeric(NumericKind::Uint16), Some(ArrayRange::exact(3)));
        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Array).unwrap();
        for v in [1, 2, 3] {
            c.pop_and_pack_scalar(&Literal::Uint(v)).unwrap();
            c.finish_child();
        }
        c.close_composite().unwrap();
        assert_eq!(c.finish().unwrap(), vec![1, 0, 2, 0, 3, 0]);

        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Array).unwrap();
        for v in [1, 2] {
            c.pop_and_pack_scalar(&Literal::Uint(v)).unwrap();
            c.finish_child();
        }
        let err = c.close_composite().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthImbalance);
        assert_eq!(err.message(), "Too few elements in array value, minimum 3.");
    }

    #[test]
    fn empty_fixed_array_message() {
        let ty = array(numeric(NumericKind::Int8), Some(ArrayRange::exact(2)));
        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Array).unwrap();
        assert_eq!(
            c.close_composite().unwrap_err().message(),
            "Fixed-sized array of size 2 can't have 0 elements."
        );
    }

    #[test]
    fn variable_array_tag_is_byte_length() {
        let ty = array(numeric(NumericKind::Uint16), None);
        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Array).unwrap();
        c.pop_and_pack_scalar(&Literal::Uint(7)).unwrap();
        c.finish_child();
        c.close_composite().unwrap();
        assert_eq!(c.finish().unwrap(), vec![2, 0, 7, 0]);
    }

    #[test]
    fn expansion_advances_depth_by_count() {
        let ty = array(numeric(NumericKind::Int32), Some(ArrayRange::exact(3)));
        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Array).unwrap();
        c.expand(&Literal::Uint(5), 3).unwrap();
        assert_eq!(c.depth(), 3);
        c.close_composite().unwrap();
        assert_eq!(c.finish().unwrap(), [5, 0, 0, 0].repeat(3));
    }

    #[test]
    fn struct_children_follow_declaration_order() {
        let mut m = Module::new();
        let mut b = m.begin_record("S");
        m.add_field(&mut b, Field::new("a", numeric(NumericKind::Uint8)))
            .unwrap();
        m.add_field(&mut b, Field::new("b", numeric(NumericKind::Float32)))
            .unwrap();
        let ty = m.seal_record(b).unwrap();

        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Struct).unwrap();
        c.pop_and_pack_scalar(&Literal::Uint(1)).unwrap();
        c.finish_child();
        c.pop_and_pack_scalar(&Literal::Real(2.5)).unwrap();
        c.finish_child();
        c.close_composite().unwrap();
        let mut expected = vec![1];
        expected.extend_from_slice(&2.5f32.to_le_bytes());
        assert_eq!(c.finish().unwrap(), expected);
    }

    #[test]
    fn extra_struct_value_reported_once() {
        let mut m = Module::new();
        let mut b = m.begin_record("One");
        m.add_field(&mut b, Field::new("a", numeric(NumericKind::Uint8)))
            .unwrap();
        let ty = m.seal_record(b).unwrap();

        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Struct).unwrap();
        c.pop_and_pack_scalar(&Literal::Uint(1)).unwrap();
        c.finish_child();
        let err = c.pop_and_pack_scalar(&Literal::Uint(2)).unwrap_err();
        assert_eq!(err.message(), "Too many nested values while parsing value for struct One.");
        c.finish_child();
        assert!(c.close_composite().is_ok());
        assert_eq!(c.error_count(), 1);
        assert_eq!(c.finish().unwrap(), vec![1]);
    }

    #[test]
    fn missing_struct_value_is_padded() {
        let mut m = Module::new();
        let mut b = m.begin_record("Two");
        m.add_field(&mut b, Field::new("a", numeric(NumericKind::Uint8)))
            .unwrap();
        m.add_field(&mut b, Field::new("b", numeric(NumericKind::Uint8)))
            .unwrap();
        let ty = m.seal_record(b).unwrap();

        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Struct).unwrap();
        c.pop_and_pack_scalar(&Literal::Uint(9)).unwrap();
        c.finish_child();
        let err = c.close_composite().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthImbalance);
        assert_eq!(c.finish().unwrap(), vec![9, 0]);
    }

    #[test]
    fn skipped_finish_child_is_a_depth_error() {
        let mut m = Module::new();
        let mut b = m.begin_record("P");
        m.add_field(&mut b, Field::new("x", numeric(NumericKind::Uint8)))
            .unwrap();
        m.add_field(&mut b, Field::new("y", numeric(NumericKind::Uint8)))
            .unwrap();
        let ty = m.seal_record(b).unwrap();

        let mut c = ValueCompiler::new(&ty);
        c.open_composite(Composite::Struct).unwrap();
        c.pop_and_pack_scalar(&Literal::Uint(1)).unwrap();
        let err = c.pop_and_pack_scalar(&Literal::Uint(2)).unwrap_err();
        assert_eq!(err.message(), "Too few nested values before this uint8 value.");
    }

    #[test]
    fn shape_mismatch_opens_placeholder() {
        let ty = numeric(NumericKind::Uint8);
        let mut c = ValueCompiler::new(&ty);
        let err = c.open_composite(Composite::Struct).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LiteralKind);
        assert_eq!(err.message(), "Cannot use struct-composition for non-struct type 'uint8'.");
        c.pop_and_pack_scalar(&Literal::Uint(1)).unwrap();
        c.finish_child();
        c.close_composite().unwrap();
        assert_eq!(c.error_count(), 1);
    }

    #[test]
    fn string_literals() {
        let m = Module::new();
        let s = m.string_type();
        assert_eq!(scalar(&s, Literal::String(b"hi".to_vec())).unwrap(), vec![2, 0, b'h', b'i']);

        let fixed = array(numeric(NumericKind::Char), Some(ArrayRange::exact(4)));
        let err = scalar(&fixed, Literal::String(b"abc".to_vec())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LengthMismatch);
        assert_eq!(err.message(), "Value for fixed-length string has incorrect length.");

        let blob = m.blob_type();
        let err = scalar(&blob, Literal::String(b"x".to_vec())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LiteralKind);
        assert_eq!(scalar(&blob, Literal::Hex(vec![0xAB])).unwrap(), vec![1, 0, 0xAB]);
    }

    #[test]
    fn best_effort_bytes_on_kind_error() {
        let ty = numeric(NumericKind::Uint32);
        let mut c = ValueCompiler::new(&ty);
        assert!(c.pop_and_pack_scalar(&Literal::String(b"no".to_vec())).is_err());
        assert_eq!(c.finish().unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn zero_elements_rejected_only_below_minimum() {
        let open = array(numeric(NumericKind::Uint8), None);
        let mut c = ValueCompiler::new(&open);
        c.open_composite(Composite::Array).unwrap();
        c.close_composite().unwrap();
        assert_eq!(c.finish().unwrap(), vec![0, 0]);

        let ranged = array(numeric(NumericKind::Uint8), Some(ArrayRange::new(1, 4)));
        let mut c = ValueCompiler::new(&ranged);
        c.open_composite(Composite::Array).unwrap();
        assert_eq!(
            c.close_composite().unwrap_err().message(),
            "Too few elements in array value, minimum 1."
        );
    }

    #[test]
    fn encode_value_drives_events() {
        let ty = array(numeric(NumericKind::Int16), Some(ArrayRange::exact(2)));
        let v = Value::Array(vec![Value::Int16(-1), Value::Int16(2)]);
        assert_eq!(encode_value(&ty, &v).unwrap(), vec![0xFF, 0xFF, 2, 0]);
    }
}
